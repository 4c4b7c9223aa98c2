//! End-to-end import + verification flow against a fake catalog.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use audiobook_importer::config::{FileConfig, ImporterConfig};
use audiobook_importer::importer::{
    FileTransferEngine, ImportEngine, TransferMode, TransferRequest, VerifyRequest,
    WalkdirTreeProvider,
};
use audiobook_importer::{CatalogCandidate, CatalogClient, CatalogError, VerificationStatus};

/// Fake catalog whose scanner has already indexed one book.
struct FakeCatalog {
    candidates: Vec<CatalogCandidate>,
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search_by_title_author(
        &self,
        _title: &str,
        _author: Option<&str>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        Ok(self.candidates.clone())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<CatalogCandidate, CatalogError> {
        self.candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(CatalogError::Http(404))
    }
}

fn build_engine(library_root: PathBuf, client: Option<Arc<dyn CatalogClient>>) -> ImportEngine {
    let file: FileConfig = toml::from_str(
        r#"
        flatten_multi_disc = true

        [verification]
        sidecar_poll_attempts = 1
        sidecar_poll_interval_secs = 0
        "#,
    )
    .unwrap();
    let config = ImporterConfig::resolve(library_root, Some(file)).unwrap();
    ImportEngine::with_components(
        config,
        Arc::new(WalkdirTreeProvider),
        FileTransferEngine::default(),
        client,
    )
}

fn populate_download(dir: &TempDir) {
    for path in [
        "Dune (Unabridged)/Disc 1/Track 01.mp3",
        "Dune (Unabridged)/Disc 1/Track 02.mp3",
        "Dune (Unabridged)/Disc 2/Track 01.mp3",
        "Dune (Unabridged)/cover.jpg",
    ] {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, format!("content of {}", path)).unwrap();
    }
}

#[tokio::test]
async fn test_import_then_verify_flow() {
    let downloads = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    populate_download(&downloads);

    let candidate = CatalogCandidate {
        id: "li_dune".to_string(),
        title: "Dune".to_string(),
        author: Some("Frank Herbert".to_string()),
        asin: Some("B0009SE2F6".to_string()),
        isbn: None,
        library_path: None,
    };
    let engine = build_engine(
        library.path().to_path_buf(),
        Some(Arc::new(FakeCatalog {
            candidates: vec![candidate],
        })),
    );

    let destination = library.path().join("Frank Herbert/Dune");
    let request = TransferRequest {
        source_root: downloads.path().join("Dune (Unabridged)"),
        destination_root: destination.clone(),
        mode: Some(TransferMode::Link),
        flatten: None,
        reported_tree: None,
    };

    let result = engine.plan_and_transfer(&request).unwrap();
    assert!(result.is_complete());
    assert_eq!(result.files.len(), 4);

    // Flattened, contiguous, playback order preserved.
    for part in ["Part 001.mp3", "Part 002.mp3", "Part 003.mp3", "cover.jpg"] {
        assert!(destination.join(part).exists(), "{} missing", part);
    }
    assert_eq!(
        fs::read_to_string(destination.join("Part 003.mp3")).unwrap(),
        "content of Dune (Unabridged)/Disc 2/Track 01.mp3"
    );

    // The external scanner leaves its sidecar; verification picks it up.
    fs::write(
        destination.join("metadata.json"),
        r#"{"asin": "B0009SE2F6"}"#,
    )
    .unwrap();

    let outcome = engine
        .verify(
            &VerifyRequest {
                title: "Dune".to_string(),
                author: Some("Frank Herbert".to_string()),
                destination_path: destination.clone(),
            },
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.status, VerificationStatus::Verified);
    assert_eq!(outcome.matched_id.as_deref(), Some("li_dune"));
    assert!(outcome.enriched.is_some());
}

#[tokio::test]
async fn test_verify_not_configured_without_catalog() {
    let library = TempDir::new().unwrap();
    let engine = build_engine(library.path().to_path_buf(), None);

    let outcome = engine
        .verify(
            &VerifyRequest {
                title: "Dune".to_string(),
                author: None,
                destination_path: library.path().to_path_buf(),
            },
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.status, VerificationStatus::NotConfigured);
}

#[tokio::test]
async fn test_verify_not_found_for_unknown_work() {
    let library = TempDir::new().unwrap();
    let engine = build_engine(
        library.path().to_path_buf(),
        Some(Arc::new(FakeCatalog { candidates: vec![] })),
    );

    let outcome = engine
        .verify(
            &VerifyRequest {
                title: "Some Obscure Title".to_string(),
                author: Some("Nobody".to_string()),
                destination_path: library.path().to_path_buf(),
            },
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.status, VerificationStatus::NotFound);
}
