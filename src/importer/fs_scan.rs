//! Filesystem listing provider.
//!
//! Used when the download manager's reported listing is unavailable or
//! incomplete.

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use super::models::FileEntry;

/// Lists the files under a source root.
pub trait FileTreeProvider: Send + Sync {
    /// Return every regular file under `root`, paths relative to `root`.
    fn list_tree(&self, root: &Path) -> Result<Vec<FileEntry>>;
}

/// Recursive directory walk over the real filesystem.
#[derive(Debug, Default)]
pub struct WalkdirTreeProvider;

impl FileTreeProvider for WalkdirTreeProvider {
    fn list_tree(&self, root: &Path) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .with_context(|| format!("Walked path escaped root {:?}", root))?;
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(FileEntry::new(relative, size));
        }
        Ok(entries)
    }
}
