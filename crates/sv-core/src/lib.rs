//! Sieve Core Library
//!
//! This crate provides the matching side of the Sieve request filter: the
//! structures a sync run compiles and publishes, and the engine that answers
//! per-request decisions against whatever was published last.
//!
//! # Modules
//!
//! - `automaton`: Aho-Corasick multi-pattern substring matcher
//! - `host`: Host-suffix rule set
//! - `ruleset`: Immutable rulesets and their atomic publication slot
//! - `decision`: Per-request block/allow engine with counters
//! - `types`: Shared type definitions

pub mod automaton;
pub mod decision;
pub mod host;
pub mod ruleset;
pub mod types;

// Re-export commonly used types
pub use automaton::{AutomatonBuilder, PatternAutomaton};
pub use decision::DecisionEngine;
pub use host::{normalize_host, walk_host_suffixes, HostSet};
pub use ruleset::{RuleSet, RuleSetHandle};
pub use types::{DecisionStats, FilterDecision, RequestContext, ResourceType};
