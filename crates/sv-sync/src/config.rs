use std::path::{Path, PathBuf};

use serde::Deserialize;
use sv_compiler::ParseOptions;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Holds `subscriptions.json` and the `lists/` body cache.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Host list hand-off file; defaults to `<data_dir>/blocked_domains.txt`.
    #[serde(default)]
    pub export_path: Option<PathBuf>,

    /// Optional copy of the concatenated list text used for the last rebuild.
    #[serde(default)]
    pub merged_path: Option<PathBuf>,

    /// Registered when the store is empty.
    #[serde(default = "default_subscriptions")]
    pub default_subscriptions: Vec<String>,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    #[serde(default = "default_concurrent_fetches")]
    pub concurrent_fetches: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_residual_patterns")]
    pub residual_patterns: bool,

    #[serde(default = "default_min_pattern_len")]
    pub min_pattern_len: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Defaults
fn default_data_dir() -> PathBuf {
    PathBuf::from("sieve-data")
}
fn default_subscriptions() -> Vec<String> {
    vec![
        "https://easylist.to/easylist/easylist.txt".to_string(),
        "https://easylist.to/easylist/easyprivacy.txt".to_string(),
        "https://ublockorigin.github.io/uAssets/filters/filters.txt".to_string(),
        "https://ublockorigin.github.io/uAssets/filters/privacy.txt".to_string(),
    ]
}
fn default_interval_minutes() -> u64 {
    60
}
fn default_max_body_bytes() -> u64 {
    10_000_000
}
fn default_concurrent_fetches() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_residual_patterns() -> bool {
    true
}
fn default_min_pattern_len() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_path: None,
            merged_path: None,
            default_subscriptions: default_subscriptions(),
            interval_minutes: default_interval_minutes(),
            max_body_bytes: default_max_body_bytes(),
            concurrent_fetches: default_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
            residual_patterns: default_residual_patterns(),
            min_pattern_len: default_min_pattern_len(),
            log_level: default_log_level(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.export_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("blocked_domains.txt"))
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            residual_patterns: self.residual_patterns,
            min_pattern_len: self.min_pattern_len,
        }
    }
}
