use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings
    pub library_root: Option<String>,
    pub default_transfer_mode: Option<String>,
    pub flatten_multi_disc: Option<bool>,

    // Path translation
    /// Explicit external -> local prefix pairs, highest priority first.
    pub path_mappings: Option<Vec<PathMappingConfig>>,
    /// Legacy single-pair settings, used when no explicit mapping matches.
    pub external_download_prefix: Option<String>,
    pub local_download_dir: Option<String>,

    // External catalog
    pub catalog: Option<CatalogConfig>,

    // Verification tuning
    pub verification: Option<VerificationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathMappingConfig {
    pub external_prefix: String,
    pub local_prefix: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    pub sidecar_poll_attempts: Option<u32>,
    pub sidecar_poll_interval_secs: Option<u64>,
    pub match_max_attempts: Option<u32>,
    pub match_initial_backoff_secs: Option<u64>,
    pub match_backoff_multiplier: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
