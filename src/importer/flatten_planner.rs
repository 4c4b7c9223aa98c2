//! Transfer plan computation.
//!
//! Turns an analyzed file tree into an ordered list of source -> destination
//! mappings, either preserving the original layout or flattening a
//! multi-part structure into sequentially numbered files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::disc_structure::DiscAnalysis;
use super::models::FileEntry;

/// One source -> destination mapping within a plan. Paths are relative to
/// the source and destination roots respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Ordered transfer plan for one import.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub entries: Vec<PlanEntry>,
    pub is_flattened: bool,
}

impl TransferPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute a transfer plan.
///
/// With `flatten` off the plan is an identity mapping over every entry.
/// With it on, audio entries are sorted by their disc/track key and renamed
/// `Part 001.{ext}`, `Part 002.{ext}`, ...; non-audio entries land in the
/// destination root under their base filename. `existing_names` holds names
/// already taken at the destination root, so a re-run or a pre-populated
/// destination yields ` (2)`-style suffixed names instead of overwrites.
///
/// Only names and paths are inspected, never file contents.
pub fn plan(
    tree: &[FileEntry],
    analysis: &DiscAnalysis,
    flatten: bool,
    existing_names: &HashSet<String>,
) -> TransferPlan {
    if !flatten {
        let entries = tree
            .iter()
            .map(|e| PlanEntry {
                source: e.relative_path.clone(),
                destination: e.relative_path.clone(),
            })
            .collect();
        return TransferPlan {
            entries,
            is_flattened: false,
        };
    }

    let mut taken: HashSet<String> = existing_names.clone();
    let mut entries = Vec::with_capacity(tree.len());

    let mut ordered: Vec<_> = analysis.entries.iter().collect();
    ordered.sort_by(|(_, a), (_, b)| a.cmp(b));

    for (rank, (entry, _)) in ordered.iter().enumerate() {
        let ext = entry
            .relative_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let name = if ext.is_empty() {
            format!("Part {:03}", rank + 1)
        } else {
            format!("Part {:03}.{}", rank + 1, ext)
        };
        taken.insert(name.clone());
        entries.push(PlanEntry {
            source: entry.relative_path.clone(),
            destination: PathBuf::from(name),
        });
    }

    // Non-audio companions (cover art, cue sheets, descriptors) keep their
    // base filename, collision-suffixed when needed.
    for entry in tree.iter().filter(|e| !e.is_audio()) {
        let base = entry
            .relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let name = unique_name(&base, &taken);
        taken.insert(name.clone());
        entries.push(PlanEntry {
            source: entry.relative_path.clone(),
            destination: PathBuf::from(name),
        });
    }

    TransferPlan {
        entries,
        is_flattened: true,
    }
}

/// Find a free variant of `name`, appending ` (2)`, ` (3)`, ... before the
/// extension until one is not taken.
fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = path.extension().and_then(|e| e.to_str());

    let mut counter = 2u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
