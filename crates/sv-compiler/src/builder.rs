//! RuleSet builder
//!
//! Compiles parser output into an immutable [`RuleSet`]: residual patterns are
//! de-duplicated and fed to a fresh automaton built off to the side, so a
//! published set is always complete.

use std::time::Instant;

use sv_core::{AutomatonBuilder, RuleSet};

use crate::optimizer::optimize_patterns;
use crate::parser::{parse_filter_list_with, ParseOptions, ParsedList};

#[derive(Debug, Clone, Default)]
pub struct CompileStats {
    pub lines: usize,
    pub hosts: usize,
    pub patterns_before: usize,
    pub patterns_after: usize,
    pub automaton_states: usize,
    pub total_ms: f64,
}

/// Build a ruleset from already-parsed rules.
pub fn build_ruleset(parsed: ParsedList) -> (RuleSet, CompileStats) {
    let start = Instant::now();
    let ParsedList {
        hosts,
        mut patterns,
        stats: parse_stats,
    } = parsed;

    let optimize_stats = optimize_patterns(&mut patterns);

    let mut builder = AutomatonBuilder::new();
    for pattern in &patterns {
        builder.add(pattern);
    }
    let automaton = builder.build();

    let stats = CompileStats {
        lines: parse_stats.lines,
        hosts: hosts.len(),
        patterns_before: optimize_stats.before,
        patterns_after: optimize_stats.after,
        automaton_states: automaton.state_count(),
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    (RuleSet::new(hosts, automaton), stats)
}

/// Parse `text` and compile it in one step.
pub fn compile_ruleset(text: &str, options: ParseOptions) -> (RuleSet, CompileStats) {
    let start = Instant::now();
    let parsed = parse_filter_list_with(text, options);
    let (ruleset, mut stats) = build_ruleset(parsed);
    stats.total_ms = start.elapsed().as_secs_f64() * 1000.0;

    log::info!(
        "Compiled {} lines into {} hosts and {} patterns ({} duplicate patterns dropped) in {:.1}ms",
        stats.lines,
        stats.hosts,
        stats.patterns_after,
        stats.patterns_before - stats.patterns_after,
        stats.total_ms
    );

    (ruleset, stats)
}
