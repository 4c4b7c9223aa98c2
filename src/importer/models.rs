//! Data models for the import engine.
//!
//! Defines transfer requests, discovered files, per-file outcomes, and the
//! aggregate transfer result.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Audio file extensions recognized by the structural analyzer.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "m4b", "flac", "ogg", "opus", "wav", "aac"];

/// How files are moved from the download location into the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Hardlink, falling back to copy when the filesystem refuses.
    Link,
    /// Byte-for-byte copy.
    Copy,
    /// Rename, falling back to copy-then-delete across devices.
    Move,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Link => "link",
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "link" => Some(TransferMode::Link),
            "copy" => Some(TransferMode::Copy),
            "move" => Some(TransferMode::Move),
            _ => None,
        }
    }
}

/// Kind of a discovered file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Audio,
    Other,
}

impl FileKind {
    /// Infer the kind from a relative path's extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext {
            Some(e) if AUDIO_EXTENSIONS.contains(&e.as_str()) => FileKind::Audio,
            _ => FileKind::Other,
        }
    }
}

/// One file discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the source root.
    pub relative_path: PathBuf,
    /// File size in bytes, when known.
    pub size: u64,
    pub kind: FileKind,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<PathBuf>, size: u64) -> Self {
        let relative_path = relative_path.into();
        let kind = FileKind::from_path(&relative_path);
        Self {
            relative_path,
            size,
            kind,
        }
    }

    pub fn is_audio(&self) -> bool {
        self.kind == FileKind::Audio
    }
}

/// Immutable input for one import invocation. Not persisted.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Source root as reported by the download manager, pre-translation.
    pub source_root: PathBuf,
    /// Destination root inside the library.
    pub destination_root: PathBuf,
    /// Transfer mode; `None` inherits the configured default.
    pub mode: Option<TransferMode>,
    /// Flatten flag; `None` inherits the configured default.
    pub flatten: Option<bool>,
    /// File tree as reported by the download manager, when available.
    /// Takes precedence over a direct filesystem scan.
    pub reported_tree: Option<Vec<FileEntry>>,
}

/// Outcome for a single plan entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    Linked,
    Copied,
    Moved,
    Failed(String),
}

impl TransferOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TransferOutcome::Failed(_))
    }
}

/// Per-file result within an executed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: TransferOutcome,
}

/// Aggregate result of executing a transfer plan.
///
/// Returned to the caller; persistence of history rows is the caller's
/// responsibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferResult {
    pub files: Vec<FileTransferResult>,
    pub linked: usize,
    pub copied: usize,
    pub moved: usize,
    pub failed: usize,
}

impl TransferResult {
    pub fn record(&mut self, source: PathBuf, destination: PathBuf, outcome: TransferOutcome) {
        match &outcome {
            TransferOutcome::Linked => self.linked += 1,
            TransferOutcome::Copied => self.copied += 1,
            TransferOutcome::Moved => self.moved += 1,
            TransferOutcome::Failed(_) => self.failed += 1,
        }
        self.files.push(FileTransferResult {
            source,
            destination,
            outcome,
        });
    }

    /// Returns true if every plan entry succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Human-readable aggregate line for the UI layer.
    pub fn summary(&self) -> String {
        format!(
            "{} linked, {} copied, {} moved, {} failed",
            self.linked, self.copied, self.moved, self.failed
        )
    }
}
