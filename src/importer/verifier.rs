//! Verification orchestration.
//!
//! Drives the end-to-end verification sequence after a transfer: wait for
//! the external catalog's scanner to leave a sidecar metadata artifact,
//! query the catalog with retry/backoff, classify the best match, and
//! optionally enrich a verified match with the full catalog record.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{
    CatalogClient, CatalogError, CatalogMatcher, MatchQuery, MatchScore, VerificationOutcome,
    VerificationStatus,
};
use crate::config::VerificationSettings;

use super::sidecar::SidecarReader;

/// A work to verify: what was imported and where it landed.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub title: String,
    pub author: Option<String>,
    pub destination_path: PathBuf,
}

/// Drives sidecar polling, catalog matching, and outcome classification for
/// one import. Each call is an independent unit of concurrency; the
/// orchestrator holds no per-import state.
pub struct VerificationOrchestrator {
    client: Option<Arc<dyn CatalogClient>>,
    matcher: CatalogMatcher,
    sidecar_reader: SidecarReader,
    settings: VerificationSettings,
}

impl VerificationOrchestrator {
    /// Create a new VerificationOrchestrator.
    ///
    /// `client` is `None` when the catalog base URL or token is absent;
    /// every verification then reports `not_configured`.
    pub fn new(
        client: Option<Arc<dyn CatalogClient>>,
        matcher: CatalogMatcher,
        settings: VerificationSettings,
    ) -> Self {
        Self {
            client,
            matcher,
            sidecar_reader: SidecarReader,
            settings,
        }
    }

    /// Run the verification sequence to a terminal outcome.
    ///
    /// All waits are cancellable through `cancel`; on cancellation the
    /// orchestrator returns a `cancelled` outcome promptly instead of
    /// silently continuing.
    pub async fn verify(
        &self,
        work: &VerifyRequest,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        let Some(client) = self.client.as_ref() else {
            return VerificationOutcome::new(
                VerificationStatus::NotConfigured,
                "Catalog base URL or token not configured",
            );
        };

        info!(
            "Verifying {:?} at {:?}",
            work.title, work.destination_path
        );

        let sidecar = match self.wait_for_sidecar(&work.destination_path, cancel).await {
            Ok(sidecar) => sidecar,
            Err(outcome) => return outcome,
        };

        let mut query = MatchQuery {
            title: work.title.clone(),
            author: work.author.clone(),
            destination_path: Some(work.destination_path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        if let Some(sidecar) = sidecar {
            query.asin = sidecar.asin;
            query.isbn = sidecar.isbn;
        }

        let best = match self.match_with_retries(client.as_ref(), &query, cancel).await {
            Ok(best) => best,
            Err(outcome) => return outcome,
        };

        match best {
            None => VerificationOutcome::new(
                VerificationStatus::NotFound,
                format!("No catalog entry matched {:?}", work.title),
            ),
            Some(best) => {
                let status = CatalogMatcher::classify(Some(best.score));
                let note = format!(
                    "Best candidate {:?} scored {} ({})",
                    best.candidate.title,
                    best.score,
                    best.reasons.join(", ")
                );
                let mut outcome = VerificationOutcome::new(status, note);
                outcome.matched_id = Some(best.candidate.id.clone());

                if status == VerificationStatus::Verified {
                    outcome.enriched = self.enrich(client.as_ref(), &best.candidate.id).await;
                }
                outcome
            }
        }
    }

    /// Poll the destination for the sidecar artifact left by the external
    /// scanner. Gives up after the configured attempts and lets matching
    /// proceed on title/author alone.
    async fn wait_for_sidecar(
        &self,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<super::sidecar::SidecarMetadata>, VerificationOutcome> {
        let attempts = self.settings.sidecar_poll_attempts.max(1);
        let interval = Duration::from_secs(self.settings.sidecar_poll_interval_secs);

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(cancelled_outcome());
            }
            if let Some(metadata) = self.sidecar_reader.read(destination) {
                debug!(
                    "Sidecar found on attempt {}/{}: {:?}",
                    attempt, attempts, metadata
                );
                return Ok(Some(metadata));
            }
            if attempt < attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(cancelled_outcome()),
                    _ = sleep(interval) => {}
                }
            }
        }

        debug!(
            "No sidecar after {} attempts, matching on title/author only",
            attempts
        );
        Ok(None)
    }

    /// Call the catalog with exponential backoff on connectivity errors.
    ///
    /// Non-retryable errors (auth failures, malformed responses) go straight
    /// to `unreachable` without consuming the retry budget.
    async fn match_with_retries(
        &self,
        client: &dyn CatalogClient,
        query: &MatchQuery,
        cancel: &CancellationToken,
    ) -> Result<Option<MatchScore>, VerificationOutcome> {
        let max_attempts = self.settings.match_max_attempts.max(1);
        let mut last_error: Option<CatalogError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled_outcome());
            }

            match client
                .search_by_title_author(&query.title, query.author.as_deref())
                .await
            {
                Ok(candidates) => {
                    debug!(
                        "Catalog search returned {} candidates on attempt {}",
                        candidates.len(),
                        attempt
                    );
                    return Ok(self.matcher.score(query, &candidates));
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = self.backoff(attempt - 1);
                    warn!(
                        "Catalog search attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, max_attempts, e, backoff
                    );
                    last_error = Some(e);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(cancelled_outcome()),
                        _ = sleep(backoff) => {}
                    }
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                    break;
                }
                Err(e) => {
                    return Err(VerificationOutcome::new(
                        VerificationStatus::Unreachable,
                        format!("Catalog request failed: {}", e),
                    ));
                }
            }
        }

        let note = match last_error {
            Some(e) => format!(
                "Catalog unreachable after {} attempts: {}",
                max_attempts, e
            ),
            None => format!("Catalog unreachable after {} attempts", max_attempts),
        };
        Err(VerificationOutcome::new(
            VerificationStatus::Unreachable,
            note,
        ))
    }

    /// Best-effort full-record fetch for a verified match. Failure is logged
    /// and discarded by contract; it never alters the verified outcome.
    async fn enrich(
        &self,
        client: &dyn CatalogClient,
        id: &str,
    ) -> Option<crate::catalog::CatalogCandidate> {
        match client.fetch_by_id(id).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Enrichment fetch for {} failed (ignored): {}", id, e);
                None
            }
        }
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        let secs = self.settings.match_initial_backoff_secs as f64
            * self.settings.match_backoff_multiplier.powi(retry_count as i32);
        Duration::from_secs_f64(secs)
    }
}

fn cancelled_outcome() -> VerificationOutcome {
    VerificationOutcome::new(VerificationStatus::Cancelled, "Verification cancelled")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogCandidate;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn candidate(id: &str, title: &str, author: Option<&str>) -> CatalogCandidate {
        CatalogCandidate {
            id: id.to_string(),
            title: title.to_string(),
            author: author.map(|a| a.to_string()),
            asin: None,
            isbn: None,
            library_path: None,
        }
    }

    /// Fails the first `failures` searches with a connection error, then
    /// returns the configured candidates.
    struct FlakyClient {
        failures: u32,
        search_calls: AtomicU32,
        fetch_calls: AtomicU32,
        candidates: Vec<CatalogCandidate>,
        fetch_fails: bool,
        seen_queries: Mutex<Vec<String>>,
    }

    impl FlakyClient {
        fn new(failures: u32, candidates: Vec<CatalogCandidate>) -> Self {
            Self {
                failures,
                search_calls: AtomicU32::new(0),
                fetch_calls: AtomicU32::new(0),
                candidates,
                fetch_fails: false,
                seen_queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogClient for FlakyClient {
        async fn search_by_title_author(
            &self,
            title: &str,
            _author: Option<&str>,
        ) -> Result<Vec<CatalogCandidate>, CatalogError> {
            let call = self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_queries.lock().unwrap().push(title.to_string());
            if call < self.failures {
                Err(CatalogError::Connection("refused".to_string()))
            } else {
                Ok(self.candidates.clone())
            }
        }

        async fn fetch_by_id(&self, id: &str) -> Result<CatalogCandidate, CatalogError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fetch_fails {
                return Err(CatalogError::Http(500));
            }
            self.candidates
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or(CatalogError::Http(404))
        }
    }

    /// Always fails with a non-retryable error.
    struct UnauthorizedClient;

    #[async_trait]
    impl CatalogClient for UnauthorizedClient {
        async fn search_by_title_author(
            &self,
            _title: &str,
            _author: Option<&str>,
        ) -> Result<Vec<CatalogCandidate>, CatalogError> {
            Err(CatalogError::Http(401))
        }

        async fn fetch_by_id(&self, _id: &str) -> Result<CatalogCandidate, CatalogError> {
            Err(CatalogError::Http(401))
        }
    }

    fn orchestrator(client: Arc<dyn CatalogClient>) -> VerificationOrchestrator {
        VerificationOrchestrator::new(
            Some(client),
            CatalogMatcher::default(),
            VerificationSettings {
                sidecar_poll_attempts: 2,
                sidecar_poll_interval_secs: 1,
                ..Default::default()
            },
        )
    }

    fn request(dir: &TempDir) -> VerifyRequest {
        VerifyRequest {
            title: "Dune".to_string(),
            author: Some("Frank Herbert".to_string()),
            destination_path: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_not_configured_without_client() {
        let orchestrator = VerificationOrchestrator::new(
            None,
            CatalogMatcher::default(),
            VerificationSettings::default(),
        );
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator
            .verify(&request(&dir), &CancellationToken::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::NotConfigured);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verified_on_exact_match() {
        let client = Arc::new(FlakyClient::new(
            0,
            vec![candidate("li_1", "Dune", Some("Frank Herbert"))],
        ));
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(client.clone())
            .verify(&request(&dir), &CancellationToken::new())
            .await;

        assert_eq!(outcome.status, VerificationStatus::Verified);
        assert_eq!(outcome.matched_id.as_deref(), Some("li_1"));
        assert_eq!(client.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*client.seen_queries.lock().unwrap(), vec!["Dune"]);
        // Enrichment fetch happened.
        assert_eq!(client.fetch_calls.load(Ordering::SeqCst), 1);
        assert!(outcome.enriched.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let client = Arc::new(FlakyClient::new(
            2,
            vec![candidate("li_1", "Dune", Some("Frank Herbert"))],
        ));
        let dir = TempDir::new().unwrap();
        let start = tokio::time::Instant::now();
        let outcome = orchestrator(client.clone())
            .verify(&request(&dir), &CancellationToken::new())
            .await;

        assert_eq!(outcome.status, VerificationStatus::Verified);
        assert_eq!(client.search_calls.load(Ordering::SeqCst), 3);
        // 1 sidecar poll interval + 1s + 2s of backoff under paused time.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_after_exhausted_retries() {
        let client = Arc::new(FlakyClient::new(10, vec![]));
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(client.clone())
            .verify(&request(&dir), &CancellationToken::new())
            .await;

        assert_eq!(outcome.status, VerificationStatus::Unreachable);
        // Exactly 3 attempts, never more.
        assert_eq!(client.search_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_immediate_unreachable() {
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(Arc::new(UnauthorizedClient))
            .verify(&request(&dir), &CancellationToken::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::Unreachable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_classification() {
        // Title partial only: 50 points.
        let client = Arc::new(FlakyClient::new(
            0,
            vec![candidate("li_2", "Dune Messiah: Book Two", Some("Other"))],
        ));
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(client)
            .verify(&request(&dir), &CancellationToken::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::Mismatch);
        assert_eq!(outcome.matched_id.as_deref(), Some("li_2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_when_nothing_matches() {
        let client = Arc::new(FlakyClient::new(
            0,
            vec![candidate("li_3", "Hyperion", Some("Dan Simmons"))],
        ));
        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(client)
            .verify(&request(&dir), &CancellationToken::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::NotFound);
        assert!(outcome.matched_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sidecar_enriches_query_with_asin() {
        let mut c = candidate("li_4", "Completely Different Title", None);
        c.asin = Some("B0009SE2F6".to_string());
        let client = Arc::new(FlakyClient::new(0, vec![c]));

        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metadata.json"),
            r#"{"asin": "B0009SE2F6"}"#,
        )
        .unwrap();

        let outcome = orchestrator(client)
            .verify(&request(&dir), &CancellationToken::new())
            .await;
        // ASIN alone clears the verified threshold despite the title.
        assert_eq!(outcome.status, VerificationStatus::Verified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrichment_failure_keeps_verified() {
        let mut client = FlakyClient::new(0, vec![candidate("li_1", "Dune", Some("Frank Herbert"))]);
        client.fetch_fails = true;
        let client = Arc::new(client);

        let dir = TempDir::new().unwrap();
        let outcome = orchestrator(client.clone())
            .verify(&request(&dir), &CancellationToken::new())
            .await;

        assert_eq!(outcome.status, VerificationStatus::Verified);
        assert!(outcome.enriched.is_none());
        assert_eq!(client.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_promptly() {
        let client = Arc::new(FlakyClient::new(10, vec![]));
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = orchestrator(client.clone())
            .verify(&request(&dir), &cancel)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Cancelled);
        assert_eq!(client.search_calls.load(Ordering::SeqCst), 0);
    }
}
