//! Sync coordinator
//!
//! One run: conditional fetch of every enabled subscription, per-subscription
//! outcome bookkeeping, then a wholesale rebuild from every cached body and an
//! atomic publish.
//!
//! ```text
//! run() -> lock store -> fetch (bounded concurrency) -> set_outcome per result
//!       -> concat cached bodies -> parse + build -> RuleSetHandle::publish
//!       -> export host list
//! ```
//!
//! Runs are serialized by a mutex held for the whole run. A failed
//! subscription never affects the others, and a run in which nothing
//! succeeded leaves the active ruleset alone. Store I/O, compilation and
//! export run on the blocking pool.

use std::hash::Hasher;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{stream, StreamExt};
use sv_compiler::{compile_ruleset, CompileStats};
use sv_core::{RuleSet, RuleSetHandle};
use tokio::sync::Mutex;
use twox_hash::XxHash64;

use crate::config::SyncConfig;
use crate::error::{FetchError, StoreError, SyncError};
use crate::export::{export_hosts, write_merged};
use crate::fetch::{FetchedList, ListFetcher, Validators};
use crate::store::{FetchOutcome, OutcomeKind, Subscription, SubscriptionStore};

/// Per-subscription line of a [`SyncReport`].
#[derive(Debug, Clone)]
pub struct SubscriptionReport {
    pub url: String,
    pub outcome: OutcomeKind,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub subscriptions: Vec<SubscriptionReport>,
    /// False when nothing changed and the previous ruleset was kept.
    pub rebuilt: bool,
    pub hosts: usize,
    pub patterns: usize,
    pub generation: u64,
    /// Where the host list was written, if the export succeeded.
    pub exported: Option<PathBuf>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.subscriptions.len() - self.succeeded()
    }
}

struct SyncState {
    store: SubscriptionStore,
    /// Digest of the merged text behind this coordinator's last publish.
    published: Option<u64>,
}

/// Cached bodies of the enabled subscriptions, concatenated for one build.
struct MergedInput {
    text: String,
    sources: usize,
    digest: u64,
}

impl MergedInput {
    fn collect(store: &SubscriptionStore) -> Self {
        let mut text = String::new();
        let mut sources = 0usize;
        for sub in store.list().iter().filter(|s| s.enabled) {
            if let Some(body) = store.cached_body(sub) {
                text.push_str(&body);
                text.push('\n');
                sources += 1;
            }
        }

        let mut hasher = XxHash64::with_seed(0);
        hasher.write(text.as_bytes());
        Self {
            text,
            sources,
            digest: hasher.finish(),
        }
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub struct SyncCoordinator {
    state: Mutex<SyncState>,
    fetcher: Arc<dyn ListFetcher>,
    rules: Arc<RuleSetHandle>,
    config: SyncConfig,
}

/// Turn a raw response into the outcome to record.
pub fn classify_response(
    result: Result<FetchedList, FetchError>,
    max_body_bytes: u64,
) -> Result<FetchOutcome, FetchError> {
    let fetched = result?;
    match fetched.status {
        304 => Ok(FetchOutcome::Unmodified),
        200..=299 => {
            if fetched.body.is_empty() {
                return Err(FetchError::EmptyBody);
            }
            let size = fetched.body.len() as u64;
            if size > max_body_bytes {
                return Err(FetchError::BodyTooLarge {
                    size,
                    limit: max_body_bytes,
                });
            }
            let body = String::from_utf8(fetched.body).map_err(|_| FetchError::InvalidEncoding)?;
            Ok(FetchOutcome::Updated {
                body,
                etag: fetched.etag,
                last_modified: fetched.last_modified,
            })
        }
        status => Err(FetchError::Status(status)),
    }
}

/// Run filesystem or CPU-bound work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, SyncError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await?)
}

impl SyncCoordinator {
    pub fn new(config: SyncConfig, fetcher: Arc<dyn ListFetcher>, rules: Arc<RuleSetHandle>) -> Self {
        let store = SubscriptionStore::open(&config.data_dir);
        Self {
            state: Mutex::new(SyncState {
                store,
                published: None,
            }),
            fetcher,
            rules,
            config,
        }
    }

    pub fn rules(&self) -> &Arc<RuleSetHandle> {
        &self.rules
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // Single small-file operations; they run inline under the lock.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().await.store.list()
    }

    pub async fn add_subscription(&self, url: &str) -> Result<Subscription, StoreError> {
        self.state.lock().await.store.upsert(url)
    }

    pub async fn set_enabled(&self, url: &str, enabled: bool) -> Result<bool, StoreError> {
        self.state.lock().await.store.set_enabled(url, enabled)
    }

    pub async fn remove_subscription(&self, url: &str) -> Result<bool, StoreError> {
        self.state.lock().await.store.remove(url)
    }

    /// Publish a ruleset built from the cached bodies alone, without fetching.
    ///
    /// Returns `None` when nothing is cached yet.
    pub async fn warm_start(&self) -> Result<Option<Arc<RuleSet>>, SyncError> {
        let mut state = self.state.lock().await;
        let store = state.store.clone();
        let input = blocking(move || MergedInput::collect(&store)).await?;
        let digest = input.digest;

        let published = self.publish_merged(input).await?;
        if published.is_some() {
            state.published = Some(digest);
        }
        Ok(published.map(|(ruleset, _)| ruleset))
    }

    /// Execute one sync run.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let mut state = self.state.lock().await;

        let store = state.store.clone();
        let defaults = self.config.default_subscriptions.clone();
        let enabled: Vec<Subscription> = blocking(move || -> Result<Vec<Subscription>, StoreError> {
            store.ensure_defaults(&defaults)?;
            Ok(store.list().into_iter().filter(|s| s.enabled).collect())
        })
        .await??;
        log::info!("Starting sync run for {} enabled subscriptions", enabled.len());

        let fetcher = &self.fetcher;
        let max_body_bytes = self.config.max_body_bytes;
        let tasks = enabled.iter().map(|sub| {
            let validators = Validators::from(sub);
            async move {
                let result = fetcher.fetch(&sub.url, &validators).await;
                (sub.url.as_str(), classify_response(result, max_body_bytes))
            }
        });
        let mut results = stream::iter(tasks).buffer_unordered(self.config.concurrent_fetches.max(1));

        // Outcomes are persisted as they arrive, so an interrupted run keeps them.
        let mut reports = Vec::with_capacity(enabled.len());
        while let Some((url, classified)) = results.next().await {
            let store = state.store.clone();
            let url = url.to_string();
            reports.push(blocking(move || Self::apply_outcome(&store, &url, classified)).await?);
        }
        drop(results);

        let succeeded = reports.iter().filter(|r| r.outcome.is_success()).count();
        if succeeded == 0 {
            log::warn!(
                "Sync run produced no usable subscription ({} attempted); keeping generation {}",
                reports.len(),
                self.rules.generation()
            );
            return Err(SyncError::EmptyRun {
                attempted: reports.len(),
            });
        }

        // The enabled set can change between runs (also from another process),
        // so the skip compares the merged input itself with what was published.
        let store = state.store.clone();
        let input = blocking(move || MergedInput::collect(&store)).await?;
        let any_updated = reports.iter().any(|r| r.outcome == OutcomeKind::Updated);
        if !any_updated && state.published == Some(input.digest) {
            let current = self.rules.load();
            log::info!("All subscriptions unmodified; keeping generation {}", current.generation());
            return Ok(SyncReport {
                subscriptions: reports,
                rebuilt: false,
                hosts: current.hosts().len(),
                patterns: current.automaton().pattern_count(),
                generation: current.generation(),
                exported: None,
            });
        }

        let digest = input.digest;
        let report = match self.publish_merged(input).await? {
            Some((ruleset, exported)) => {
                state.published = Some(digest);
                SyncReport {
                    subscriptions: reports,
                    rebuilt: true,
                    hosts: ruleset.hosts().len(),
                    patterns: ruleset.automaton().pattern_count(),
                    generation: ruleset.generation(),
                    exported,
                }
            }
            None => {
                let current = self.rules.load();
                SyncReport {
                    subscriptions: reports,
                    rebuilt: false,
                    hosts: current.hosts().len(),
                    patterns: current.automaton().pattern_count(),
                    generation: current.generation(),
                    exported: None,
                }
            }
        };

        log::info!(
            "Sync run finished: {} ok, {} failed, generation {}",
            report.succeeded(),
            report.failed(),
            report.generation
        );
        Ok(report)
    }

    fn apply_outcome(
        store: &SubscriptionStore,
        url: &str,
        classified: Result<FetchOutcome, FetchError>,
    ) -> SubscriptionReport {
        let (outcome, mut error) = match classified {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                log::warn!("Update failed for {}: {}", url, e);
                (FetchOutcome::Failed, Some(e.to_string()))
            }
        };

        let mut kind = outcome.kind();
        if let Err(e) = store.set_outcome(url, outcome) {
            log::error!("Failed to record outcome for {}: {}", url, e);
            error = Some(e.to_string());
            if kind.is_success() {
                // The new body never reached the cache; count it as a failure.
                kind = OutcomeKind::Failed;
                if let Err(e) = store.set_outcome(url, FetchOutcome::Failed) {
                    log::error!("Failed to record failure for {}: {}", url, e);
                }
            }
        }

        SubscriptionReport {
            url: url.to_string(),
            outcome: kind,
            error,
        }
    }

    /// Compile `input`, publish it and write the hand-off files.
    ///
    /// Returns `None` without publishing when no cached text exists.
    async fn publish_merged(
        &self,
        input: MergedInput,
    ) -> Result<Option<(Arc<RuleSet>, Option<PathBuf>)>, SyncError> {
        if input.is_blank() {
            log::warn!("No cached list bodies available; ruleset left unchanged");
            return Ok(None);
        }

        let options = self.config.parse_options();
        let rules = Arc::clone(&self.rules);
        let export_path = self.config.export_path();
        let merged_path = self.config.merged_path.clone();

        let published = blocking(move || {
            let (ruleset, stats) = compile_ruleset(&input.text, options);
            log_compile(input.sources, &stats);

            let ruleset = rules.publish(ruleset);

            let exported = match export_hosts(ruleset.hosts(), &export_path) {
                Ok(count) => {
                    log::info!("Exported {} domains to {}", count, export_path.display());
                    Some(export_path)
                }
                Err(e) => {
                    log::error!("Failed to export host list to {}: {}", export_path.display(), e);
                    None
                }
            };

            if let Some(path) = &merged_path {
                if let Err(e) = write_merged(&input.text, path) {
                    log::error!("Failed to write merged list to {}: {}", path.display(), e);
                }
            }

            (ruleset, exported)
        })
        .await?;

        Ok(Some(published))
    }
}

fn log_compile(sources: usize, stats: &CompileStats) {
    log::info!(
        "Rebuilt ruleset from {} cached lists: {} hosts, {} patterns, {} states",
        sources,
        stats.hosts,
        stats.patterns_after,
        stats.automaton_states
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(status: u16, body: &str) -> Result<FetchedList, FetchError> {
        Ok(FetchedList {
            status,
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
            body: body.as_bytes().to_vec(),
        })
    }

    #[test]
    fn test_classify_not_modified() {
        assert_eq!(classify_response(ok(304, ""), 100).unwrap(), FetchOutcome::Unmodified);
    }

    #[test]
    fn test_classify_updated_keeps_validators() {
        match classify_response(ok(200, "ads.example\n"), 100).unwrap() {
            FetchOutcome::Updated { body, etag, .. } => {
                assert_eq!(body, "ads.example\n");
                assert_eq!(etag.as_deref(), Some("\"abc\""));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_classify_failures() {
        assert!(matches!(classify_response(ok(200, ""), 100), Err(FetchError::EmptyBody)));
        assert!(matches!(
            classify_response(ok(200, "0123456789"), 9),
            Err(FetchError::BodyTooLarge { size: 10, limit: 9 })
        ));
        assert!(matches!(classify_response(ok(404, "nope"), 100), Err(FetchError::Status(404))));
        assert!(matches!(classify_response(ok(500, ""), 100), Err(FetchError::Status(500))));
        assert!(matches!(
            classify_response(Err(FetchError::Transport("refused".into())), 100),
            Err(FetchError::Transport(_))
        ));

        let invalid = Ok(FetchedList {
            status: 200,
            body: vec![0xff, 0xfe, 0xfd],
            ..FetchedList::default()
        });
        assert!(matches!(classify_response(invalid, 100), Err(FetchError::InvalidEncoding)));
    }

    #[test]
    fn test_body_at_limit_is_accepted() {
        assert!(classify_response(ok(200, "0123456789"), 10).is_ok());
    }
}
