//! Request decisions
//!
//! This is the hot path: every request goes through [`DecisionEngine::decide`].
//! The host set is consulted first, the pattern automaton only on a miss.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::host::normalize_host;
use crate::ruleset::RuleSetHandle;
use crate::types::{DecisionStats, FilterDecision, RequestContext};

/// Which part of the ruleset produced a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Host,
    Pattern,
}

pub struct DecisionEngine {
    rules: Arc<RuleSetHandle>,
    blocked: AtomicU64,
    allowed: AtomicU64,
}

impl DecisionEngine {
    pub fn new(rules: Arc<RuleSetHandle>) -> Self {
        Self {
            rules,
            blocked: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
        }
    }

    pub fn rules(&self) -> &Arc<RuleSetHandle> {
        &self.rules
    }

    /// Decide a request against the active ruleset.
    pub fn decide(&self, ctx: &RequestContext) -> FilterDecision {
        let rules = self.rules.load();
        let domain = normalize_host(&ctx.domain);

        let hit = if rules.hosts().matches(&domain) {
            Some(Hit::Host)
        } else if rules.automaton().matches(&ctx.url) {
            Some(Hit::Pattern)
        } else {
            None
        };

        match hit {
            Some(hit) => {
                log::debug!(
                    "Blocking {} {} ({:?} rule, generation {})",
                    ctx.resource_type,
                    ctx.url,
                    hit,
                    rules.generation()
                );
                self.record(FilterDecision::Block)
            }
            None => {
                log::trace!("Allowing {} {}", ctx.resource_type, ctx.url);
                self.record(FilterDecision::Allow)
            }
        }
    }

    /// Host-only decision for DNS-level callers that never see a URL.
    pub fn decide_host(&self, host: &str) -> FilterDecision {
        let rules = self.rules.load();
        let host = normalize_host(host);
        if rules.hosts().matches(&host) {
            log::debug!("Blocking host {}", host);
            self.record(FilterDecision::Block)
        } else {
            self.record(FilterDecision::Allow)
        }
    }

    fn record(&self, decision: FilterDecision) -> FilterDecision {
        match &decision {
            FilterDecision::Block => {
                self.blocked.fetch_add(1, Ordering::Relaxed);
            }
            FilterDecision::Allow => {
                self.allowed.fetch_add(1, Ordering::Relaxed);
            }
            // Not produced by host or pattern rules.
            FilterDecision::Redirect(_) | FilterDecision::Modify(_) => {}
        }
        decision
    }

    pub fn stats(&self) -> DecisionStats {
        DecisionStats {
            blocked: self.blocked.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
        }
    }
}
