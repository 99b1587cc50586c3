use std::collections::HashSet;

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
}

/// Drop repeated residual patterns, keeping first occurrences in order.
pub fn optimize_patterns(patterns: &mut Vec<String>) -> OptimizeStats {
    let before = patterns.len();

    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    patterns.retain(|pattern| seen.insert(pattern.clone()));

    let after = patterns.len();

    OptimizeStats {
        before,
        after,
        deduped: before - after,
    }
}
