//! Path translation between the download manager's filesystem view and ours.
//!
//! The download manager reports paths valid inside its own container or
//! machine; this module rewrites them into paths valid in this process's
//! namespace using configured prefix pairs with heuristic fallbacks.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::PathMapping;

/// Conventional mount-root substitutions tried when no configured pair
/// matches. Covers setups that historically mounted the same storage under a
/// different root.
const HISTORICAL_PREFIXES: &[(&str, &str)] = &[
    ("/data", "/mnt/user/data"),
    ("/downloads", "/mnt/user/downloads"),
];

/// Rewrites paths reported by the download manager into local paths.
///
/// Pure and infallible: an unresolvable path is returned unchanged and
/// surfaces later as a missing-source error from whoever tries to use it.
#[derive(Debug, Clone)]
pub struct PathTranslator {
    mappings: Vec<PathMapping>,
    library_root: PathBuf,
}

impl PathTranslator {
    pub fn new(mappings: Vec<PathMapping>, library_root: PathBuf) -> Self {
        Self {
            mappings,
            library_root,
        }
    }

    /// Translate a reported path into a local path.
    ///
    /// Configured pairs are tried in order, first match wins. A pair matches
    /// when the path equals its external prefix or starts with the prefix
    /// followed by a separator. Falls back to library-root passthrough, then
    /// historical mount-root substitutions, then identity.
    pub fn translate(&self, reported_path: &str) -> String {
        for mapping in &self.mappings {
            if let Some(translated) =
                substitute_prefix(reported_path, &mapping.external_prefix, &mapping.local_prefix)
            {
                debug!(
                    "Translated {} -> {} via mapping {}",
                    reported_path, translated, mapping.external_prefix
                );
                return translated;
            }
        }

        // Already in our namespace.
        let library_root = self.library_root.to_string_lossy();
        if path_has_prefix(reported_path, &library_root) {
            return reported_path.to_string();
        }

        for (external, local) in HISTORICAL_PREFIXES {
            if let Some(translated) = substitute_prefix(reported_path, external, local) {
                debug!(
                    "Translated {} -> {} via historical prefix {}",
                    reported_path, translated, external
                );
                return translated;
            }
        }

        reported_path.to_string()
    }

    /// Convenience wrapper returning a `PathBuf`.
    pub fn translate_path(&self, reported_path: &Path) -> PathBuf {
        PathBuf::from(self.translate(&reported_path.to_string_lossy()))
    }
}

/// Replace `prefix` with `replacement` if `path` equals the prefix or starts
/// with it followed by a separator.
fn substitute_prefix(path: &str, prefix: &str, replacement: &str) -> Option<String> {
    if path == prefix {
        return Some(replacement.to_string());
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.starts_with('/') || rest.starts_with('\\') {
        return Some(format!("{}{}", replacement, rest));
    }
    None
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    path == prefix || {
        path.strip_prefix(prefix)
            .map(|rest| rest.starts_with('/') || rest.starts_with('\\'))
            .unwrap_or(false)
    }
}
