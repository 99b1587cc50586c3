//! Host-suffix rule set
//!
//! A host `H` matches a rule `D` iff `H == D` or `H` ends with `"." + D`.
//! Lookups walk the candidate's dot-separated suffixes, so the cost depends
//! on the number of labels in the host, not on the size of the set.

use std::collections::HashSet;

// =============================================================================
// Suffix Walking
// =============================================================================

/// Strip the leftmost label.
pub fn parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and each of its parent domains, most specific first.
///
/// `a.b.example` yields `a.b.example`, `b.example`, `example`.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = parent_domain(result);
        Some(result)
    }
}

pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: if host.is_empty() { None } else { Some(host) },
    }
}

/// Lowercase a request host and drop a single trailing root dot.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host.strip_suffix('.').unwrap_or(host);
    host.to_ascii_lowercase()
}

// =============================================================================
// Host Set
// =============================================================================

/// Set of blocked domains with suffix-match lookups.
///
/// Entries are expected to be sanitized (lowercase, no leading dot); the set
/// itself performs no normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSet {
    hosts: HashSet<Box<str>>,
}

impl HostSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the host was not already present.
    pub fn insert(&mut self, host: &str) -> bool {
        if self.hosts.contains(host) {
            return false;
        }
        self.hosts.insert(host.into())
    }

    /// Exact membership, no suffix semantics.
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Returns the rule that covers `host`, if any.
    pub fn find_suffix<'a>(&self, host: &'a str) -> Option<&'a str> {
        walk_host_suffixes(host).find(|suffix| self.hosts.contains(*suffix))
    }

    pub fn matches(&self, host: &str) -> bool {
        self.find_suffix(host).is_some()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|h| h.as_ref())
    }

    /// Hosts in lexicographic order, for stable exports.
    pub fn sorted(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.iter().collect();
        hosts.sort_unstable();
        hosts
    }

    /// Flat newline-delimited list, one host per line, sorted.
    pub fn to_export_string(&self) -> String {
        let mut out = String::with_capacity(self.hosts.iter().map(|h| h.len() + 1).sum());
        for host in self.sorted() {
            out.push_str(host);
            out.push('\n');
        }
        out
    }

    pub fn extend<'a>(&mut self, hosts: impl IntoIterator<Item = &'a str>) {
        for host in hosts {
            self.insert(host);
        }
    }
}

impl<'a> FromIterator<&'a str> for HostSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = HostSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_domain() {
        assert_eq!(parent_domain("sub.example.com"), Some("example.com"));
        assert_eq!(parent_domain("example.com"), Some("com"));
        assert_eq!(parent_domain("com"), None);
        assert_eq!(parent_domain("com."), None);
        assert_eq!(parent_domain(""), None);
    }

    #[test]
    fn test_walk_host_suffixes() {
        let suffixes: Vec<&str> = walk_host_suffixes("a.b.example").collect();
        assert_eq!(suffixes, vec!["a.b.example", "b.example", "example"]);
        assert_eq!(walk_host_suffixes("").count(), 0);
    }

    #[test]
    fn test_suffix_rule() {
        let set: HostSet = ["ads.example"].into_iter().collect();
        assert!(set.matches("ads.example"));
        assert!(set.matches("x.ads.example"));
        assert!(set.matches("a.b.ads.example"));
        assert!(!set.matches("ads.example.com"));
        assert!(!set.matches("badsexample"));
        assert!(!set.matches("bads.example"));
        assert!(!set.matches("example"));
    }

    #[test]
    fn test_find_suffix_reports_covering_rule() {
        let set: HostSet = ["tracker.net", "cdn.tracker.net"].into_iter().collect();
        assert_eq!(set.find_suffix("a.cdn.tracker.net"), Some("cdn.tracker.net"));
        assert_eq!(set.find_suffix("www.tracker.net"), Some("tracker.net"));
        assert_eq!(set.find_suffix("tracker.org"), None);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = HostSet::new();
        assert!(set.insert("ads.example"));
        assert!(!set.insert("ads.example"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_export_is_sorted_and_line_delimited() {
        let set: HostSet = ["tracker.net", "ads.example", "cdn.example.org"].into_iter().collect();
        assert_eq!(
            set.to_export_string(),
            "ads.example\ncdn.example.org\ntracker.net\n"
        );
        assert_eq!(HostSet::new().to_export_string(), "");
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Ads.Example."), "ads.example");
        assert_eq!(normalize_host(" tracker.NET "), "tracker.net");
    }
}
