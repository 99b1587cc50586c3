//! Durable subscription metadata
//!
//! The whole store is one JSON array in `subscriptions.json`; list bodies
//! live next to it in `lists/`, one slot per subscription URL. Every
//! mutation is read-all, modify, write-all. Callers serialize mutations
//! (the coordinator holds a lock for the whole sync run).

use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::error::StoreError;

const STORE_FILE: &str = "subscriptions.json";
const LISTS_DIR: &str = "lists";

/// One remote filter list and its cache/health metadata.
///
/// Field names on disk are part of the contract with external tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub url: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub fail_count: u32,
    /// Milliseconds since the Unix epoch; 0 if never refreshed.
    #[serde(default)]
    pub last_success: u64,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

fn default_enabled() -> bool {
    true
}

impl Subscription {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            etag: None,
            last_modified: None,
            enabled: true,
            fail_count: 0,
            last_success: 0,
            local_path: None,
        }
    }
}

/// Result of one fetch attempt, as applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Server reported the cached body is current.
    Unmodified,
    /// New body with whatever validators the server returned.
    Updated {
        body: String,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    Failed,
}

/// Outcome without its payload, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Unmodified,
    Updated,
    Failed,
}

impl FetchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Unmodified => OutcomeKind::Unmodified,
            Self::Updated { .. } => OutcomeKind::Updated,
            Self::Failed => OutcomeKind::Failed,
        }
    }
}

impl OutcomeKind {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Unmodified | Self::Updated => true,
            Self::Failed => false,
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Write through a temporary sibling and rename it into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    path: PathBuf,
    lists_dir: PathBuf,
}

impl SubscriptionStore {
    /// Store rooted at `data_dir`. Nothing is created until the first write.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            path: data_dir.join(STORE_FILE),
            lists_dir: data_dir.join(LISTS_DIR),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records. A missing or unreadable store reads as empty.
    pub fn list(&self) -> Vec<Subscription> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read {}: {}; treating store as empty", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(subs) => subs,
            Err(e) => {
                log::warn!("Corrupt store {}: {}; treating as empty", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn write_all(&self, subs: &[Subscription]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(subs)?;
        write_atomic(&self.path, &json).map_err(|e| StoreError::io(&self.path, e))
    }

    pub fn get(&self, url: &str) -> Option<Subscription> {
        self.list().into_iter().find(|s| s.url == url)
    }

    /// Register `url`, or re-enable it if already present.
    pub fn upsert(&self, url: &str) -> Result<Subscription, StoreError> {
        let mut subs = self.list();
        let sub = match subs.iter_mut().find(|s| s.url == url) {
            Some(existing) => {
                existing.enabled = true;
                existing.clone()
            }
            None => {
                let sub = Subscription::new(url);
                subs.push(sub.clone());
                sub
            }
        };
        self.write_all(&subs)?;
        log::info!("Subscription {} enabled", url);
        Ok(sub)
    }

    /// Returns false if `url` is not registered.
    pub fn set_enabled(&self, url: &str, enabled: bool) -> Result<bool, StoreError> {
        let mut subs = self.list();
        let Some(sub) = subs.iter_mut().find(|s| s.url == url) else {
            return Ok(false);
        };
        sub.enabled = enabled;
        self.write_all(&subs)?;
        Ok(true)
    }

    /// Drop the record and its cached body. Returns false if `url` is not registered.
    pub fn remove(&self, url: &str) -> Result<bool, StoreError> {
        let mut subs = self.list();
        let Some(pos) = subs.iter().position(|s| s.url == url) else {
            return Ok(false);
        };
        let removed = subs.remove(pos);
        self.write_all(&subs)?;

        if let Some(path) = removed.local_path {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Failed to delete cached list {}: {}", path.display(), e);
            }
        }
        log::info!("Subscription {} removed", url);
        Ok(true)
    }

    /// Seed `urls` when the store holds no records at all. Returns how many were added.
    pub fn ensure_defaults(&self, urls: &[String]) -> Result<usize, StoreError> {
        if !self.list().is_empty() || urls.is_empty() {
            return Ok(0);
        }
        let subs: Vec<Subscription> = urls.iter().map(Subscription::new).collect();
        self.write_all(&subs)?;
        log::info!("Bootstrapped {} default subscriptions", subs.len());
        Ok(subs.len())
    }

    /// Cache slot for `url`. The same URL always maps to the same file.
    pub fn slot_path(&self, url: &str) -> PathBuf {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(url.as_bytes());
        self.lists_dir.join(format!("{:016x}.txt", hasher.finish()))
    }

    /// Apply one fetch outcome to `url`'s record.
    pub fn set_outcome(&self, url: &str, outcome: FetchOutcome) -> Result<Subscription, StoreError> {
        let mut subs = self.list();
        let sub = subs
            .iter_mut()
            .find(|s| s.url == url)
            .ok_or_else(|| StoreError::UnknownSubscription(url.to_string()))?;

        match outcome {
            FetchOutcome::Unmodified => {
                sub.fail_count = 0;
                sub.last_success = now_millis();
            }
            FetchOutcome::Updated {
                body,
                etag,
                last_modified,
            } => {
                let slot = self.slot_path(url);
                write_atomic(&slot, body.as_bytes()).map_err(|e| StoreError::io(&slot, e))?;
                sub.local_path = Some(slot);
                if etag.is_some() {
                    sub.etag = etag;
                }
                if last_modified.is_some() {
                    sub.last_modified = last_modified;
                }
                sub.fail_count = 0;
                sub.last_success = now_millis();
            }
            FetchOutcome::Failed => {
                sub.fail_count = sub.fail_count.saturating_add(1);
            }
        }

        let updated = sub.clone();
        self.write_all(&subs)?;
        Ok(updated)
    }

    /// Last cached body for `sub`, if one exists and is readable.
    pub fn cached_body(&self, sub: &Subscription) -> Option<String> {
        let path = sub.local_path.as_ref()?;
        match fs::read_to_string(path) {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("Cached list {} for {} unreadable: {}", path.display(), sub.url, e);
                None
            }
        }
    }
}
