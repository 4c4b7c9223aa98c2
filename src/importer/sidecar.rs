//! Sidecar metadata artifact reader.
//!
//! The external catalog's scanner writes a metadata file next to imported
//! media once it has discovered them. Reading it lets verification enrich
//! its query with hard identifiers instead of relying on title/author alone.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Well-known sidecar filenames, tried in order.
const SIDECAR_FILENAMES: &[&str] = &["metadata.json", ".metadata.json"];

/// Identifier fields extracted from the sidecar artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SidecarMetadata {
    pub asin: Option<String>,
    pub isbn: Option<String>,
}

impl SidecarMetadata {
    pub fn has_identifiers(&self) -> bool {
        self.asin.is_some() || self.isbn.is_some()
    }
}

/// Reads the sidecar artifact left by the external catalog's scanner.
#[derive(Debug, Default)]
pub struct SidecarReader;

impl SidecarReader {
    /// Read identifier fields from the sidecar in `destination_dir`.
    ///
    /// A missing or malformed sidecar yields `None`; it is an expected state
    /// while the external scanner has not caught up yet, never an error.
    pub fn read(&self, destination_dir: &Path) -> Option<SidecarMetadata> {
        for filename in SIDECAR_FILENAMES {
            let path = destination_dir.join(filename);
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(_) => continue,
            };
            match serde_json::from_str::<SidecarDocument>(&content) {
                Ok(doc) => {
                    debug!("Read sidecar metadata from {:?}", path);
                    return Some(doc.into_metadata());
                }
                Err(e) => {
                    debug!("Ignoring malformed sidecar {:?}: {}", path, e);
                }
            }
        }
        None
    }
}

/// Raw sidecar document. Identifiers may live at the top level or under a
/// nested `metadata` object depending on the scanner version.
#[derive(Debug, Deserialize)]
struct SidecarDocument {
    #[serde(default)]
    asin: Option<String>,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    metadata: Option<SidecarMetadata>,
}

impl SidecarDocument {
    fn into_metadata(self) -> SidecarMetadata {
        let nested = self.metadata.unwrap_or_default();
        SidecarMetadata {
            asin: self.asin.or(nested.asin).filter(|s| !s.is_empty()),
            isbn: self.isbn.or(nested.isbn).filter(|s| !s.is_empty()),
        }
    }
}
