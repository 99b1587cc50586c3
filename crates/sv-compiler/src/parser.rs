//! Filter list parser
//!
//! Turns ABP/uBO/hosts-style list text into a host set plus residual URL
//! substring patterns. Only host extraction is attempted: exception rules,
//! cosmetic rules and wildcard semantics are recognized and dropped.

use sv_core::HostSet;

/// Knobs for residual pattern extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep non-host lines as URL substring patterns.
    pub residual_patterns: bool,
    /// Shorter residual patterns are dropped; they would match almost anything.
    pub min_pattern_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            residual_patterns: true,
            min_pattern_len: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseStats {
    pub lines: usize,
    pub hosts: usize,
    pub patterns: usize,
    pub skipped: usize,
}

/// Parser output for one or more list bodies.
#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    pub hosts: HostSet,
    pub patterns: Vec<String>,
    pub stats: ParseStats,
}

/// How a single line was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRule {
    Host(String),
    Pattern(String),
    Skip,
}

pub fn parse_filter_list(text: &str) -> ParsedList {
    parse_filter_list_with(text, ParseOptions::default())
}

pub fn parse_filter_list_with(text: &str, options: ParseOptions) -> ParsedList {
    let mut parsed = ParsedList::default();

    for raw_line in text.lines() {
        parsed.stats.lines += 1;
        match classify_line(raw_line, &options) {
            LineRule::Host(host) => {
                parsed.hosts.insert(&host);
                parsed.stats.hosts += 1;
            }
            LineRule::Pattern(pattern) => {
                parsed.patterns.push(pattern);
                parsed.stats.patterns += 1;
            }
            LineRule::Skip => parsed.stats.skipped += 1,
        }
    }

    log::debug!(
        "Parsed {} lines: {} host rules, {} patterns, {} skipped",
        parsed.stats.lines,
        parsed.stats.hosts,
        parsed.stats.patterns,
        parsed.stats.skipped
    );

    parsed
}

/// Classify one list line. Checks run in priority order; the first that
/// applies decides.
pub fn classify_line(raw_line: &str, options: &ParseOptions) -> LineRule {
    let line = raw_line.trim();
    if line.is_empty() || is_comment_line(line) {
        return LineRule::Skip;
    }

    // Exceptions are not honored; a host they cover stays blocked.
    if line.starts_with("@@") {
        return LineRule::Skip;
    }

    if line.contains("##") || line.contains("#@#") {
        return LineRule::Skip;
    }

    if let Some(rest) = line.strip_prefix("||") {
        return host_rule(parse_host_anchor_rule(rest));
    }

    if !line.contains('/') && !line.contains('*') && line.contains('.') {
        return host_rule(line);
    }

    if let Some(idx) = line.find("://") {
        return host_rule(parse_url_authority(&line[idx + 3..]));
    }

    if options.residual_patterns {
        if let Some(pattern) = parse_residual_pattern(line, options.min_pattern_len) {
            return LineRule::Pattern(pattern.to_string());
        }
    }

    LineRule::Skip
}

fn host_rule(candidate: &str) -> LineRule {
    let host = sanitize_domain(candidate);
    if host.is_empty() {
        LineRule::Skip
    } else {
        LineRule::Host(host)
    }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[') || line.starts_with('#')
}

/// `ads.example^$third-party` -> `ads.example`
fn parse_host_anchor_rule(rest: &str) -> &str {
    match rest.find(|c: char| c == '^' || c == '/') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// `cdn.example.org/x` -> `cdn.example.org`
fn parse_url_authority(rest: &str) -> &str {
    match rest.find(|c: char| c == '/' || c == '^' || c == '$') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

fn split_rule_options(line: &str) -> &str {
    match line.find('$') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_residual_pattern(line: &str, min_len: usize) -> Option<&str> {
    let pattern = split_rule_options(line)
        .trim_start_matches('|')
        .trim_end_matches('|');

    if pattern.len() < min_len || pattern.contains('*') || pattern.contains('^') {
        return None;
    }

    Some(pattern)
}

/// Normalize a candidate domain. Returns an empty string on rejection.
///
/// Wildcards are stripped rather than interpreted, so `*.ads.example`
/// becomes `ads.example` and `ad*.example` becomes `ad.example`.
///
/// Only ASCII hosts are accepted: letters, digits, `.` and `-`. Lists carry
/// internationalized names in punycode (`xn--bcher-kva.example`); a raw
/// Unicode label such as `bücher.example` is rejected.
pub fn sanitize_domain(domain: &str) -> String {
    let lower = domain.trim().to_lowercase();
    // Wildcards go before the leading dot. Stripping the dot first turns
    // `*.ads.example` into `.ads.example`, a host that never matches and that
    // re-parses from the exported list as `ads.example`, so export and
    // re-parse would no longer reproduce the same host set.
    let without_wildcards: String = lower.chars().filter(|&c| c != '*').collect();
    let cleaned = without_wildcards
        .strip_prefix('.')
        .unwrap_or(&without_wildcards);

    let valid = cleaned.contains('.')
        && cleaned
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-');

    if valid {
        cleaned.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts_of(text: &str) -> Vec<String> {
        let parsed = parse_filter_list(text);
        let hosts = parsed.hosts.sorted().into_iter().map(String::from).collect();
        hosts
    }

    #[test]
    fn parses_mixed_list_into_hosts() {
        let text = "! comment\n||ads.example^\ntracker.net\nhttp://cdn.example.org/x\n";
        let parsed = parse_filter_list(text);
        assert_eq!(
            parsed.hosts.sorted(),
            vec!["ads.example", "cdn.example.org", "tracker.net"]
        );
        assert!(parsed.patterns.is_empty());
        assert_eq!(parsed.stats.lines, 4);
        assert_eq!(parsed.stats.hosts, 3);
        assert_eq!(parsed.stats.skipped, 1);
    }

    #[test]
    fn skips_comments_headers_and_blank_lines() {
        let text = "[Adblock Plus 2.0]\n! Title: Test\n# hosts comment\n\n   \n";
        let parsed = parse_filter_list(text);
        assert!(parsed.hosts.is_empty());
        assert!(parsed.patterns.is_empty());
        assert_eq!(parsed.stats.skipped, 5);
    }

    #[test]
    fn ignores_exception_and_cosmetic_rules() {
        let text = "@@||good.example^\nexample.com##.ad-banner\nexample.com#@#.ad\n||ads.example^";
        assert_eq!(hosts_of(text), vec!["ads.example"]);

        // An exception never subtracts from a matching block rule.
        let text = "||ads.example^\n@@||ads.example^$document";
        assert_eq!(hosts_of(text), vec!["ads.example"]);
    }

    #[test]
    fn host_anchor_cuts_at_separator_or_path() {
        assert_eq!(hosts_of("||Ads.Example^$third-party"), vec!["ads.example"]);
        assert_eq!(hosts_of("||ads.example/path/x.js"), vec!["ads.example"]);
        assert_eq!(hosts_of("||.ads.example^"), vec!["ads.example"]);
        assert_eq!(hosts_of("||*.ads.example^"), vec!["ads.example"]);
    }

    #[test]
    fn rejected_host_rules_do_not_become_patterns() {
        let parsed = parse_filter_list("||localhost^\n||bad_host.example^\ntracker.net$third-party");
        assert!(parsed.hosts.is_empty());
        assert!(parsed.patterns.is_empty());
        assert_eq!(parsed.stats.skipped, 3);
    }

    #[test]
    fn extracts_authority_from_urls() {
        assert_eq!(hosts_of("|https://cdn.example.org/ads.js"), vec!["cdn.example.org"]);
        assert_eq!(hosts_of("http://cdn.example.org^"), vec!["cdn.example.org"]);
        assert_eq!(hosts_of("http://cdn.example.org$script"), vec!["cdn.example.org"]);
    }

    #[test]
    fn collects_residual_patterns() {
        let parsed = parse_filter_list("/banner/ads/\n|/adserver/|$image\n&adcount=\nads\n/ads/*.gif\n-ad^");
        assert_eq!(parsed.patterns, vec!["/banner/ads/", "/adserver/", "&adcount="]);
        assert!(parsed.hosts.is_empty());
    }

    #[test]
    fn residual_patterns_can_be_disabled() {
        let options = ParseOptions {
            residual_patterns: false,
            ..ParseOptions::default()
        };
        let parsed = parse_filter_list_with("/banner/ads/\n||ads.example^", options);
        assert!(parsed.patterns.is_empty());
        assert_eq!(parsed.hosts.len(), 1);
    }

    #[test]
    fn sanitize_rules() {
        assert_eq!(sanitize_domain("ADS.Example"), "ads.example");
        assert_eq!(sanitize_domain(".ads.example"), "ads.example");
        assert_eq!(sanitize_domain("a*ds.exam*ple"), "ads.example");
        assert_eq!(sanitize_domain("my-cdn.example"), "my-cdn.example");
        assert_eq!(sanitize_domain("localhost"), "");
        assert_eq!(sanitize_domain("ads.example:8080"), "");
        assert_eq!(sanitize_domain("ads example"), "");
        assert_eq!(sanitize_domain(""), "");
    }

    #[test]
    fn wildcard_subdomain_rule_blocks_the_base_domain() {
        // `*.` is removed before the leading dot, so the rule keeps a usable host.
        assert_eq!(sanitize_domain("*.ads.example"), "ads.example");

        let parsed = parse_filter_list("||*.ads.example^");
        assert!(parsed.hosts.matches("ads.example"));
        assert!(parsed.hosts.matches("cdn.ads.example"));
        assert!(!parsed.hosts.contains(".ads.example"));
    }

    #[test]
    fn unicode_hosts_are_rejected_punycode_is_kept() {
        assert_eq!(sanitize_domain("bücher.example"), "");
        assert_eq!(sanitize_domain("xn--bcher-kva.example"), "xn--bcher-kva.example");
        assert!(hosts_of("||bücher.example^").is_empty());
        assert_eq!(hosts_of("xn--bcher-kva.example"), vec!["xn--bcher-kva.example"]);
    }

    #[test]
    fn duplicate_hosts_are_counted_once_in_set() {
        let parsed = parse_filter_list("ads.example\n||ads.example^\nhttp://ads.example/");
        assert_eq!(parsed.hosts.len(), 1);
        assert_eq!(parsed.stats.hosts, 3);
    }

    #[test]
    fn export_round_trip_reproduces_host_set() {
        let text = "||ads.example^\ntracker.net\nhttps://cdn.example.org/x\n||*.wild.example^\n";
        let parsed = parse_filter_list(text);
        let exported = parsed.hosts.to_export_string();
        let reparsed = parse_filter_list(&exported);
        assert_eq!(reparsed.hosts, parsed.hosts);
        assert!(reparsed.patterns.is_empty());
    }
}
