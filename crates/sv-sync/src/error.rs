//! Error types for the sync side.

use std::io;
use std::path::PathBuf;

/// Why a single subscription fetch produced no usable body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Empty response body")]
    EmptyBody,
    #[error("Response body too large: {size} bytes (limit {limit})")]
    BodyTooLarge { size: u64, limit: u64 },
    #[error("Response body is not valid UTF-8")]
    InvalidEncoding,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to encode subscriptions: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No subscription produced content this run; the active ruleset was kept.
    #[error("No subscription could be refreshed ({attempted} attempted)")]
    EmptyRun { attempted: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A store, compile or export task on the blocking pool panicked or was cancelled.
    #[error("Background sync task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// Whether the external scheduler should try again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmptyRun { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
