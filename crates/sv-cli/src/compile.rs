use std::fs;
use std::path::Path;
use std::time::Instant;

use sv_compiler::{build_ruleset, parse_filter_list_with, ParseOptions, ParsedList};
use sv_core::RuleSet;
use sv_sync::export::export_hosts;

#[derive(Debug, Clone)]
pub struct CompileStats {
    pub lines: usize,
    pub hosts: usize,
    pub patterns_before: usize,
    pub patterns_after: usize,
    pub skipped: usize,
    pub total_ms: f64,
}

/// Compile local list files into a ruleset, the same way a sync run does.
pub fn compile_files(
    inputs: &[String],
    options: ParseOptions,
    verbose: bool,
) -> Result<(RuleSet, CompileStats), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let start = Instant::now();
    let mut merged = ParsedList::default();

    for (list_id, path) in inputs.iter().enumerate() {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        let parsed = parse_filter_list_with(&content, options);

        if verbose {
            println!(
                "  [{}] {} - {} lines, {} hosts, {} patterns",
                list_id,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                parsed.stats.lines,
                parsed.hosts.len(),
                parsed.patterns.len()
            );
        }

        merged.hosts.extend(parsed.hosts.iter());
        merged.patterns.extend(parsed.patterns);
        merged.stats.lines += parsed.stats.lines;
        merged.stats.skipped += parsed.stats.skipped;
    }

    let skipped = merged.stats.skipped;
    let (ruleset, build_stats) = build_ruleset(merged);

    let stats = CompileStats {
        lines: build_stats.lines,
        hosts: build_stats.hosts,
        patterns_before: build_stats.patterns_before,
        patterns_after: build_stats.patterns_after,
        skipped,
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    Ok((ruleset, stats))
}

/// Write the host list the same way a sync run exports it. Returns the host count.
pub fn write_host_list(path: &Path, ruleset: &RuleSet) -> Result<usize, String> {
    export_hosts(ruleset.hosts(), path).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_multiple_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "||ads.example^\n/banner/ads/\n").unwrap();
        fs::write(&b, "0.0.0.0 ignored\ntracker.net\n/banner/ads/\n").unwrap();

        let inputs = vec![a.display().to_string(), b.display().to_string()];
        let (ruleset, stats) = compile_files(&inputs, ParseOptions::default(), false).unwrap();
        assert_eq!(stats.lines, 5);
        assert_eq!(stats.hosts, 2);
        assert_eq!(stats.patterns_before, 2);
        assert_eq!(stats.patterns_after, 1);
        assert!(ruleset.hosts().matches("x.tracker.net"));

        let out = dir.path().join("out/hosts.txt");
        assert_eq!(write_host_list(&out, &ruleset).unwrap(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), "ads.example\ntracker.net\n");
    }

    #[test]
    fn host_list_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("list.txt");
        let out = dir.path().join("hosts.txt");
        fs::write(&out, "stale.example\nold.example\n").unwrap();
        fs::write(&input, "||fresh.example^\n").unwrap();

        let inputs = vec![input.display().to_string()];
        let (ruleset, _) = compile_files(&inputs, ParseOptions::default(), false).unwrap();
        write_host_list(&out, &ruleset).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "fresh.example\n");
        assert!(!dir.path().join("hosts.txt.tmp").exists());
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(compile_files(&[], ParseOptions::default(), false).is_err());
        let missing = vec!["/definitely/not/here.txt".to_string()];
        assert!(compile_files(&missing, ParseOptions::default(), false).is_err());
    }
}
