//! Transfer plan execution.
//!
//! Executes a plan entry by entry: hardlink with copy fallback, plain copy,
//! or move with copy-then-delete fallback. A single file's failure is
//! recorded and does not abort the remaining entries; the caller decides
//! whether partial success is acceptable.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::flatten_planner::TransferPlan;
use super::models::{TransferMode, TransferOutcome, TransferResult};

/// Filesystem primitives used by the engine. Behind a trait so tests can
/// force specific failures (e.g. cross-device link errors).
pub trait FileOps: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn hard_link(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::hard_link(source, destination)
    }

    /// Byte-for-byte copy preserving the source's modification time.
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::copy(source, destination)?;
        let modified = fs::metadata(source)?.modified()?;
        let file = fs::File::options().write(true).open(destination)?;
        file.set_modified(modified)?;
        Ok(())
    }

    fn rename(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::rename(source, destination)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Default implementation over `std::fs`.
#[derive(Debug, Default)]
pub struct StdFileOps;

impl FileOps for StdFileOps {}

/// Executes transfer plans against real or injected filesystem primitives.
pub struct FileTransferEngine {
    ops: Arc<dyn FileOps>,
}

impl Default for FileTransferEngine {
    fn default() -> Self {
        Self::new(Arc::new(StdFileOps))
    }
}

impl FileTransferEngine {
    pub fn new(ops: Arc<dyn FileOps>) -> Self {
        Self { ops }
    }

    /// Execute a plan, processing entries in plan order.
    ///
    /// Destination parent directories are created as needed. Failures are
    /// recorded per entry; the engine performs no retries of its own.
    pub fn execute(
        &self,
        plan: &TransferPlan,
        source_root: &Path,
        destination_root: &Path,
        mode: TransferMode,
    ) -> TransferResult {
        let mut result = TransferResult::default();

        for entry in &plan.entries {
            let source = source_root.join(&entry.source);
            let destination = destination_root.join(&entry.destination);

            let outcome = self.transfer_one(&source, &destination, mode);
            if let TransferOutcome::Failed(reason) = &outcome {
                warn!(
                    "Transfer failed for {:?} -> {:?}: {}",
                    source, destination, reason
                );
            } else {
                debug!("Transferred {:?} -> {:?} ({:?})", source, destination, outcome);
            }
            result.record(source, destination, outcome);
        }

        result
    }

    fn transfer_one(
        &self,
        source: &Path,
        destination: &Path,
        mode: TransferMode,
    ) -> TransferOutcome {
        if let Some(parent) = destination.parent() {
            if let Err(e) = self.ops.create_dir_all(parent) {
                return TransferOutcome::Failed(format!("create parent dir: {}", e));
            }
        }

        match mode {
            TransferMode::Link => match self.ops.hard_link(source, destination) {
                Ok(()) => TransferOutcome::Linked,
                Err(link_err) => {
                    // Cross-device, unsupported filesystem, permissions: all
                    // degrade to a plain copy.
                    debug!(
                        "Hardlink failed for {:?} ({}), falling back to copy",
                        source, link_err
                    );
                    match self.ops.copy(source, destination) {
                        Ok(()) => TransferOutcome::Copied,
                        Err(copy_err) => TransferOutcome::Failed(format!(
                            "link failed ({}), copy fallback failed ({})",
                            link_err, copy_err
                        )),
                    }
                }
            },
            TransferMode::Copy => match self.ops.copy(source, destination) {
                Ok(()) => TransferOutcome::Copied,
                Err(e) => TransferOutcome::Failed(format!("copy: {}", e)),
            },
            TransferMode::Move => match self.ops.rename(source, destination) {
                Ok(()) => TransferOutcome::Moved,
                Err(rename_err) => {
                    debug!(
                        "Rename failed for {:?} ({}), falling back to copy+delete",
                        source, rename_err
                    );
                    match self.ops.copy(source, destination) {
                        Ok(()) => match self.ops.remove_file(source) {
                            Ok(()) => TransferOutcome::Moved,
                            Err(e) => TransferOutcome::Failed(format!(
                                "copied but source delete failed: {}",
                                e
                            )),
                        },
                        Err(copy_err) => TransferOutcome::Failed(format!(
                            "rename failed ({}), copy fallback failed ({})",
                            rename_err, copy_err
                        )),
                    }
                }
            },
        }
    }
}
