//! Import & verification engine.
//!
//! Moves downloaded works into the library (path translation, disc/track
//! analysis, flatten planning, transfer execution) and verifies them against
//! the external catalog.

mod disc_structure;
mod engine;
mod flatten_planner;
mod fs_scan;
mod models;
mod path_translator;
mod sidecar;
mod transfer_engine;
mod verifier;

pub use disc_structure::{analyze, parse_numeral, DiscAnalysis, DiscTrackKey};
pub use engine::ImportEngine;
pub use flatten_planner::{plan, PlanEntry, TransferPlan};
pub use fs_scan::{FileTreeProvider, WalkdirTreeProvider};
pub use models::{
    FileEntry, FileKind, FileTransferResult, TransferMode, TransferOutcome, TransferRequest,
    TransferResult, AUDIO_EXTENSIONS,
};
pub use path_translator::PathTranslator;
pub use sidecar::{SidecarMetadata, SidecarReader};
pub use transfer_engine::{FileOps, FileTransferEngine, StdFileOps};
pub use verifier::{VerificationOrchestrator, VerifyRequest};
