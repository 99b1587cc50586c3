//! Sieve Subscription Sync
//!
//! Keeps remote filter lists fresh and republishes the compiled ruleset.
//!
//! # Modules
//!
//! - `store`: Durable subscription metadata and the list body cache
//! - `fetch`: Conditional HTTP fetch seam (`ListFetcher`) and its reqwest implementation
//! - `coordinator`: One sync run: fetch, record outcomes, rebuild, publish, export
//! - `export`: Host list hand-off file
//! - `config`: TOML configuration with defaults
//! - `error`: Error types

pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod fetch;
pub mod store;

pub use config::SyncConfig;
pub use coordinator::{classify_response, SubscriptionReport, SyncCoordinator, SyncReport};
pub use error::{ConfigError, FetchError, StoreError, SyncError};
pub use fetch::{FetchedList, HttpFetcher, ListFetcher, Validators};
pub use store::{FetchOutcome, OutcomeKind, Subscription, SubscriptionStore};
