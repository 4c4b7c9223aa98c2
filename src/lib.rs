//! Audiobook import & verification engine.
//!
//! Moves a downloaded multi-file audiobook from a download location into a
//! curated library location, then confirms that an external read-only catalog
//! service has correctly indexed it. The web/route layer, persistent history
//! storage, and download-queue clients live outside this crate; they consume
//! the [`ImportEngine`] facade and the traits in [`catalog`] and [`importer`].

pub mod catalog;
pub mod config;
pub mod importer;

pub use catalog::{
    CatalogCandidate, CatalogClient, CatalogError, CatalogMatcher, MatchQuery, MatchScore,
    VerificationOutcome, VerificationStatus,
};
pub use config::ImporterConfig;
pub use importer::{
    FileEntry, FileKind, ImportEngine, TransferMode, TransferOutcome, TransferPlan,
    TransferRequest, TransferResult, VerificationOrchestrator,
};
