mod file_config;

pub use file_config::{CatalogConfig, FileConfig, PathMappingConfig, VerificationConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::importer::TransferMode;

/// A single external -> local path prefix substitution rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub external_prefix: String,
    pub local_prefix: String,
}

/// Settings for the external catalog service.
///
/// Both `base_url` and `token` must be present for verification to run;
/// absence of either puts the verifier into the `not_configured` state.
#[derive(Debug, Clone, Default)]
pub struct CatalogSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl CatalogSettings {
    /// Returns true if the catalog client can be constructed at all.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.token.is_some()
    }
}

/// Tuning knobs for the verification sequence.
#[derive(Debug, Clone)]
pub struct VerificationSettings {
    /// How many times to poll for the sidecar metadata artifact.
    pub sidecar_poll_attempts: u32,
    /// Interval between sidecar polls, in seconds.
    pub sidecar_poll_interval_secs: u64,
    /// Total catalog match attempts (first try + retries).
    pub match_max_attempts: u32,
    /// Initial backoff before the first retry, in seconds.
    pub match_initial_backoff_secs: u64,
    /// Multiplier applied to backoff after each retry.
    pub match_backoff_multiplier: f64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            sidecar_poll_attempts: 6,
            sidecar_poll_interval_secs: 5,
            match_max_attempts: 3,
            match_initial_backoff_secs: 1,
            match_backoff_multiplier: 2.0,
        }
    }
}

/// Immutable configuration for the import & verification engine.
///
/// Resolved once at construction time; the engine holds no other long-lived
/// mutable state.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Root of the curated library, destination side.
    pub library_root: PathBuf,
    /// Ordered prefix substitution rules, first match wins.
    pub path_mappings: Vec<PathMapping>,
    /// Transfer mode used when the request does not specify one.
    pub default_transfer_mode: TransferMode,
    /// Whether multi-disc structures are flattened by default.
    pub flatten_multi_disc: bool,
    pub catalog: CatalogSettings,
    pub verification: VerificationSettings,
}

impl ImporterConfig {
    /// Resolve configuration from an optional TOML file config.
    ///
    /// Explicit `path_mappings` entries come first; a legacy
    /// `external_download_prefix` / `local_download_dir` pair, when both are
    /// set, is appended as the lowest-priority rule.
    pub fn resolve(library_root: PathBuf, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let library_root = file.library_root.map(PathBuf::from).unwrap_or(library_root);
        if library_root.as_os_str().is_empty() {
            bail!("library_root must not be empty");
        }

        let mut path_mappings: Vec<PathMapping> = file
            .path_mappings
            .unwrap_or_default()
            .into_iter()
            .map(|m| PathMapping {
                external_prefix: m.external_prefix,
                local_prefix: m.local_prefix,
            })
            .collect();

        if let (Some(external), Some(local)) =
            (file.external_download_prefix, file.local_download_dir)
        {
            path_mappings.push(PathMapping {
                external_prefix: external,
                local_prefix: local,
            });
        }

        for mapping in &path_mappings {
            if mapping.external_prefix.is_empty() {
                bail!("path mapping has an empty external_prefix");
            }
        }

        let default_transfer_mode = match file.default_transfer_mode.as_deref() {
            None => TransferMode::Link,
            Some(s) => TransferMode::from_str(s)
                .ok_or_else(|| anyhow::anyhow!("Unknown transfer mode: {}", s))?,
        };

        let catalog_file = file.catalog.unwrap_or_default();
        let catalog = CatalogSettings {
            base_url: catalog_file.base_url,
            token: catalog_file.token,
            timeout_secs: catalog_file.timeout_secs.unwrap_or(30),
        };

        let verification_file = file.verification.unwrap_or_default();
        let defaults = VerificationSettings::default();
        let verification = VerificationSettings {
            sidecar_poll_attempts: verification_file
                .sidecar_poll_attempts
                .unwrap_or(defaults.sidecar_poll_attempts),
            sidecar_poll_interval_secs: verification_file
                .sidecar_poll_interval_secs
                .unwrap_or(defaults.sidecar_poll_interval_secs),
            match_max_attempts: verification_file
                .match_max_attempts
                .unwrap_or(defaults.match_max_attempts),
            match_initial_backoff_secs: verification_file
                .match_initial_backoff_secs
                .unwrap_or(defaults.match_initial_backoff_secs),
            match_backoff_multiplier: verification_file
                .match_backoff_multiplier
                .unwrap_or(defaults.match_backoff_multiplier),
        };
        if verification.match_backoff_multiplier < 1.0 {
            bail!("match_backoff_multiplier must be >= 1.0");
        }

        Ok(Self {
            library_root,
            path_mappings,
            default_transfer_mode,
            flatten_multi_disc: file.flatten_multi_disc.unwrap_or(false),
            catalog,
            verification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = ImporterConfig::resolve(PathBuf::from("/library"), None).unwrap();

        assert_eq!(config.library_root, PathBuf::from("/library"));
        assert!(config.path_mappings.is_empty());
        assert_eq!(config.default_transfer_mode, TransferMode::Link);
        assert!(!config.flatten_multi_disc);
        assert!(!config.catalog.is_configured());
        assert_eq!(config.verification.sidecar_poll_attempts, 6);
        assert_eq!(config.verification.sidecar_poll_interval_secs, 5);
        assert_eq!(config.verification.match_max_attempts, 3);
    }

    #[test]
    fn test_legacy_pair_appended_after_explicit_mappings() {
        let toml_str = r#"
            external_download_prefix = "/downloads"
            local_download_dir = "/mnt/downloads"

            [[path_mappings]]
            external_prefix = "/data"
            local_prefix = "/mnt/data"
        "#;
        let file: FileConfig = toml::from_str(toml_str).unwrap();
        let config = ImporterConfig::resolve(PathBuf::from("/library"), Some(file)).unwrap();

        assert_eq!(config.path_mappings.len(), 2);
        assert_eq!(config.path_mappings[0].external_prefix, "/data");
        assert_eq!(config.path_mappings[1].external_prefix, "/downloads");
        assert_eq!(config.path_mappings[1].local_prefix, "/mnt/downloads");
    }

    #[test]
    fn test_invalid_transfer_mode_rejected() {
        let file: FileConfig = toml::from_str(r#"default_transfer_mode = "teleport""#).unwrap();
        let result = ImporterConfig::resolve(PathBuf::from("/library"), Some(file));
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_configured_requires_url_and_token() {
        let file: FileConfig = toml::from_str(
            r#"
            [catalog]
            base_url = "http://localhost:13378"
        "#,
        )
        .unwrap();
        let config = ImporterConfig::resolve(PathBuf::from("/library"), Some(file)).unwrap();
        assert!(!config.catalog.is_configured());
    }

    #[test]
    fn test_empty_external_prefix_rejected() {
        let toml_str = r#"
            [[path_mappings]]
            external_prefix = ""
            local_prefix = "/mnt"
        "#;
        let file: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(ImporterConfig::resolve(PathBuf::from("/library"), Some(file)).is_err());
    }
}
