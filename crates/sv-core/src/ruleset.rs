//! Immutable rulesets and their publication slot
//!
//! ```text
//! decide() -> RuleSetHandle::load() -> Arc<RuleSet>      (lock-free read)
//! sync run -> RuleSetHandle::publish() -> ArcSwap::store  (atomic swap)
//! ```
//!
//! A published [`RuleSet`] is never mutated. Readers holding the previous
//! set keep using it until they drop their `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::automaton::PatternAutomaton;
use crate::host::HostSet;

/// Host rules plus compiled residual patterns.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    hosts: HostSet,
    automaton: PatternAutomaton,
    generation: u64,
}

impl RuleSet {
    pub fn new(hosts: HostSet, automaton: PatternAutomaton) -> Self {
        Self {
            hosts,
            automaton,
            generation: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn hosts(&self) -> &HostSet {
        &self.hosts
    }

    pub fn automaton(&self) -> &PatternAutomaton {
        &self.automaton
    }

    /// Publication counter; 0 for a set that was never published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.automaton.is_empty()
    }
}

/// Owner of the active ruleset.
///
/// Shared by the sync side (writer) and any number of deciders (readers).
pub struct RuleSetHandle {
    current: ArcSwap<RuleSet>,
    generation: AtomicU64,
}

impl Default for RuleSetHandle {
    fn default() -> Self {
        Self::new(RuleSet::empty())
    }
}

impl RuleSetHandle {
    pub fn new(initial: RuleSet) -> Self {
        let generation = initial.generation;
        Self {
            current: ArcSwap::from_pointee(initial),
            generation: AtomicU64::new(generation),
        }
    }

    /// Current ruleset. Never blocks, never observes a partial set.
    pub fn load(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Stamp `ruleset` with the next generation and make it the active set.
    pub fn publish(&self, mut ruleset: RuleSet) -> Arc<RuleSet> {
        ruleset.generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let ruleset = Arc::new(ruleset);
        self.current.store(Arc::clone(&ruleset));
        log::info!(
            "Published ruleset generation {} ({} hosts, {} patterns)",
            ruleset.generation,
            ruleset.hosts.len(),
            ruleset.automaton.pattern_count()
        );
        ruleset
    }

    /// Generation of the last published set, 0 if nothing was published.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
