//! Sieve CLI
//!
//! CLI tool for syncing filter list subscriptions, compiling local lists and
//! checking requests against the compiled rules.

mod compile;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use sv_core::{DecisionEngine, RequestContext, ResourceType, RuleSetHandle};
use sv_sync::{HttpFetcher, ListFetcher, SyncConfig, SyncCoordinator, SyncReport};

use crate::compile::{compile_files, write_host_list};

#[derive(Parser)]
#[command(name = "sv-cli")]
#[command(about = "Sieve filter list sync and matching tools")]
struct Cli {
    /// Config file (TOML); defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "sieve.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync of all enabled subscriptions
    Sync,

    /// Sync on an interval until interrupted
    Daemon {
        /// Override the configured interval
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Register a subscription (or re-enable it)
    Add { url: String },

    /// Remove a subscription and its cached list
    Remove { url: String },

    /// Enable a registered subscription
    Enable { url: String },

    /// Disable a subscription without deleting its cache
    Disable { url: String },

    /// List subscriptions and their health
    List,

    /// Compile local filter lists into a host list
    Compile {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Output host list
        #[arg(short, long, default_value = "blocked_domains.txt")]
        output: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decide a request against the cached rules
    Check {
        /// Full request URL
        #[arg(short, long)]
        url: String,

        /// Request host; taken from the URL when omitted
        #[arg(short, long)]
        domain: Option<String>,

        /// Resource type (document, script, image, xhr, other)
        #[arg(short = 't', long = "type", default_value = "other")]
        resource_type: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = SyncConfig::load_or_default(&cli.config)
        .map_err(|e| e.to_string())
        .and_then(|config| {
            setup_logging(&config);
            run_command(cli.command, config)
        });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Route `log` records from the library crates through a tracing subscriber.
fn setup_logging(config: &SyncConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(command: Commands, config: SyncConfig) -> Result<(), String> {
    match command {
        Commands::Sync => block_on(cmd_sync(config))?,
        Commands::Daemon { interval_minutes } => block_on(cmd_daemon(config, interval_minutes))?,
        Commands::Add { url } => block_on(cmd_add(config, url))?,
        Commands::Remove { url } => block_on(cmd_remove(config, url))?,
        Commands::Enable { url } => block_on(cmd_set_enabled(config, url, true))?,
        Commands::Disable { url } => block_on(cmd_set_enabled(config, url, false))?,
        Commands::List => block_on(cmd_list(config))?,
        Commands::Compile {
            input,
            output,
            verbose,
        } => cmd_compile(&config, &input, &output, verbose),
        Commands::Check {
            url,
            domain,
            resource_type,
        } => block_on(cmd_check(config, url, domain, resource_type))?,
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    Ok(runtime.block_on(future))
}

fn coordinator(config: SyncConfig) -> Result<SyncCoordinator, String> {
    let fetcher: Arc<dyn ListFetcher> =
        Arc::new(HttpFetcher::new(&config).map_err(|e| format!("Failed to build HTTP client: {}", e))?);
    Ok(SyncCoordinator::new(config, fetcher, Arc::new(RuleSetHandle::default())))
}

fn print_report(report: &SyncReport) {
    for sub in &report.subscriptions {
        match &sub.error {
            Some(error) => println!("  {:?}\t{}\t{}", sub.outcome, sub.url, error),
            None => println!("  {:?}\t{}", sub.outcome, sub.url),
        }
    }
    println!(
        "Sync: {} ok, {} failed, {}",
        report.succeeded(),
        report.failed(),
        if report.rebuilt { "rebuilt" } else { "unchanged" }
    );
    println!("  Generation: {}", report.generation);
    println!("  Hosts:      {}", report.hosts);
    println!("  Patterns:   {}", report.patterns);
    if let Some(path) = &report.exported {
        println!("  Exported:   {}", path.display());
    }
}

async fn cmd_sync(config: SyncConfig) -> Result<(), String> {
    let sync = coordinator(config)?;
    let report = sync.run().await.map_err(|e| e.to_string())?;
    print_report(&report);
    Ok(())
}

async fn cmd_daemon(config: SyncConfig, interval_minutes: Option<u64>) -> Result<(), String> {
    let minutes = interval_minutes.unwrap_or(config.interval_minutes).max(1);
    let sync = coordinator(config)?;

    match sync.warm_start().await {
        Ok(Some(ruleset)) => log::info!("Warm start loaded generation {}", ruleset.generation()),
        Ok(None) => log::info!("No cached lists yet; starting empty"),
        Err(e) => log::warn!("Warm start failed: {}", e),
    }

    let mut interval = tokio::time::interval(Duration::from_secs(minutes * 60));
    log::info!("Syncing every {} minutes", minutes);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutdown signal received.");
                return Ok(());
            }
        }

        // Runs are awaited inline, so a slow run delays the next tick instead of overlapping it.
        match sync.run().await {
            Ok(report) => print_report(&report),
            Err(e) if e.is_transient() => log::warn!("Sync run will be retried next interval: {}", e),
            Err(e) => log::error!("Sync run failed: {}", e),
        }
    }
}

async fn cmd_add(config: SyncConfig, url: String) -> Result<(), String> {
    let sync = coordinator(config)?;
    let sub = sync.add_subscription(&url).await.map_err(|e| e.to_string())?;
    println!("Added {}", sub.url);
    Ok(())
}

async fn cmd_remove(config: SyncConfig, url: String) -> Result<(), String> {
    let sync = coordinator(config)?;
    if sync.remove_subscription(&url).await.map_err(|e| e.to_string())? {
        println!("Removed {}", url);
        Ok(())
    } else {
        Err(format!("No subscription for '{}'", url))
    }
}

async fn cmd_set_enabled(config: SyncConfig, url: String, enabled: bool) -> Result<(), String> {
    let sync = coordinator(config)?;
    if sync.set_enabled(&url, enabled).await.map_err(|e| e.to_string())? {
        println!("{} {}", if enabled { "Enabled" } else { "Disabled" }, url);
        Ok(())
    } else {
        Err(format!("No subscription for '{}'", url))
    }
}

async fn cmd_list(config: SyncConfig) -> Result<(), String> {
    let sync = coordinator(config)?;
    let subs = sync.subscriptions().await;
    if subs.is_empty() {
        println!("No subscriptions (defaults are added on the first sync)");
        return Ok(());
    }

    println!("Subscriptions: {}", subs.len());
    for sub in subs {
        println!(
            "  [{}] {}\n      failCount={} lastSuccess={} etag={} cached={}",
            if sub.enabled { "on" } else { "off" },
            sub.url,
            sub.fail_count,
            sub.last_success,
            sub.etag.as_deref().unwrap_or("-"),
            sub.local_path.as_deref().map(Path::display).map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

fn cmd_compile(config: &SyncConfig, inputs: &[String], output: &str, verbose: bool) -> Result<(), String> {
    let (ruleset, stats) = compile_files(inputs, config.parse_options(), verbose)?;
    write_host_list(Path::new(output), &ruleset)?;

    println!("Compiled {} filter lists to '{}'", inputs.len(), output);
    println!("  Lines:    {} ({} skipped)", stats.lines, stats.skipped);
    println!("  Hosts:    {}", stats.hosts);
    println!(
        "  Patterns: {} -> {} (dedupe removed {})",
        stats.patterns_before,
        stats.patterns_after,
        stats.patterns_before - stats.patterns_after
    );
    println!("  Time:     {:.1}ms", stats.total_ms);
    Ok(())
}

fn host_from_url(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority.rsplit_once('@').map(|(_, host)| host).unwrap_or(authority);
    host.split(':').next().unwrap_or(host)
}

async fn cmd_check(
    config: SyncConfig,
    url: String,
    domain: Option<String>,
    resource_type: String,
) -> Result<(), String> {
    let sync = coordinator(config)?;
    let loaded = sync.warm_start().await.map_err(|e| e.to_string())?;
    if loaded.is_none() {
        return Err("No cached lists; run `sv-cli sync` first".to_string());
    }

    let engine = DecisionEngine::new(Arc::clone(sync.rules()));
    let domain = domain.unwrap_or_else(|| host_from_url(&url).to_string());
    let ctx = RequestContext::new(domain, url, ResourceType::from_name(&resource_type));
    let decision = engine.decide(&ctx);

    println!("{}\t{}\t{}", decision, ctx.resource_type, ctx.url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_from_url() {
        assert_eq!(host_from_url("https://ads.example/x.js"), "ads.example");
        assert_eq!(host_from_url("http://user@cdn.example.org:8080/a?b"), "cdn.example.org");
        assert_eq!(host_from_url("tracker.net"), "tracker.net");
        assert_eq!(host_from_url("https://x.test?q=1"), "x.test");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["sv-cli", "check", "-u", "https://ads.example/", "-t", "script"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("sieve.toml"));
        assert!(matches!(cli.command, Commands::Check { .. }));

        let cli = Cli::try_parse_from(["sv-cli", "--config", "/etc/sieve.toml", "daemon", "--interval-minutes", "5"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/sieve.toml"));
        assert!(matches!(cli.command, Commands::Daemon { interval_minutes: Some(5) }));
    }
}
