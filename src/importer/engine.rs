//! Import engine facade.
//!
//! Composes path translation, structural analysis, flatten planning, and
//! transfer execution into `plan_and_transfer`, and exposes `verify` for the
//! calling layer (including manual re-verification).

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::{CatalogClient, CatalogMatcher, HttpCatalogClient, VerificationOutcome};
use crate::config::ImporterConfig;

use super::disc_structure::analyze;
use super::flatten_planner::{self, TransferPlan};
use super::fs_scan::{FileTreeProvider, WalkdirTreeProvider};
use super::models::{TransferRequest, TransferResult};
use super::path_translator::PathTranslator;
use super::transfer_engine::FileTransferEngine;
use super::verifier::{VerificationOrchestrator, VerifyRequest};

/// Entry point for the calling layer. Holds only immutable configuration
/// and injected collaborators; every import/verification call creates its
/// data fresh and discards it on return.
pub struct ImportEngine {
    config: ImporterConfig,
    translator: PathTranslator,
    tree_provider: Arc<dyn FileTreeProvider>,
    transfer_engine: FileTransferEngine,
    verifier: VerificationOrchestrator,
}

impl ImportEngine {
    /// Build an engine with real collaborators from configuration.
    pub fn new(config: ImporterConfig) -> Result<Self> {
        let client: Option<Arc<dyn CatalogClient>> = match (
            config.catalog.base_url.clone(),
            config.catalog.token.clone(),
        ) {
            (Some(base_url), Some(token)) => Some(Arc::new(HttpCatalogClient::new(
                base_url,
                token,
                config.catalog.timeout_secs,
            )?)),
            _ => None,
        };
        Ok(Self::with_components(
            config,
            Arc::new(WalkdirTreeProvider),
            FileTransferEngine::default(),
            client,
        ))
    }

    /// Build an engine with injected collaborators (tests, embedding layer).
    pub fn with_components(
        config: ImporterConfig,
        tree_provider: Arc<dyn FileTreeProvider>,
        transfer_engine: FileTransferEngine,
        client: Option<Arc<dyn CatalogClient>>,
    ) -> Self {
        let translator = PathTranslator::new(
            config.path_mappings.clone(),
            config.library_root.clone(),
        );
        let matcher = CatalogMatcher::new(Some(
            config.library_root.to_string_lossy().into_owned(),
        ));
        let verifier =
            VerificationOrchestrator::new(client, matcher, config.verification.clone());
        Self {
            config,
            translator,
            tree_provider,
            transfer_engine,
            verifier,
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Plan and execute one transfer.
    ///
    /// Translates the reported source/destination paths, determines the
    /// file tree (reported listing first, filesystem scan as fallback),
    /// analyzes disc structure, computes the plan, and executes it. Fails
    /// fast when the translated source root does not exist; per-file
    /// failures are reported in the result instead.
    pub fn plan_and_transfer(&self, request: &TransferRequest) -> Result<TransferResult> {
        let source_root = self.translator.translate_path(&request.source_root);
        let destination_root = self.translator.translate_path(&request.destination_root);

        if !source_root.exists() {
            bail!(
                "Source root does not exist: {:?} (reported as {:?})",
                source_root,
                request.source_root
            );
        }

        let tree = match &request.reported_tree {
            Some(tree) if !tree.is_empty() => tree.clone(),
            _ => self
                .tree_provider
                .list_tree(&source_root)
                .with_context(|| format!("Failed to list source tree {:?}", source_root))?,
        };

        let analysis = analyze(&tree);
        let flatten = request.flatten.unwrap_or(self.config.flatten_multi_disc);
        let existing = existing_names(&destination_root);
        let plan: TransferPlan = flatten_planner::plan(&tree, &analysis, flatten, &existing);

        let mode = request.mode.unwrap_or(self.config.default_transfer_mode);
        info!(
            "Importing {:?} -> {:?}: {} files, {} discs, flatten={}, mode={}",
            source_root,
            destination_root,
            plan.entries.len(),
            analysis.disc_count,
            plan.is_flattened,
            mode.as_str()
        );

        std::fs::create_dir_all(&destination_root)
            .with_context(|| format!("Failed to create destination {:?}", destination_root))?;

        let result =
            self.transfer_engine
                .execute(&plan, &source_root, &destination_root, mode);
        info!("Transfer finished: {}", result.summary());
        Ok(result)
    }

    /// Verify that the external catalog indexed a work. Callable
    /// independently for manual re-verification.
    pub async fn verify(
        &self,
        work: &VerifyRequest,
        cancel: &CancellationToken,
    ) -> VerificationOutcome {
        self.verifier.verify(work, cancel).await
    }
}

/// Names already present at the destination root, for collision avoidance.
fn existing_names(destination_root: &Path) -> HashSet<String> {
    let mut names = HashSet::new();
    if let Ok(entries) = std::fs::read_dir(destination_root) {
        for entry in entries.flatten() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names
}
