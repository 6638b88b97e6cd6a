//! Sumi-Trawl main entry point
//!
//! This is the command-line interface for the Sumi-Trawl content harvester.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_trawl::config::{load_config_with_hash, Config};
use sumi_trawl::pipeline::{BatchStatus, SiteSuggestion};
use sumi_trawl::progress::{EventPayload, ProgressNotifier};
use sumi_trawl::session::SessionStore;
use sumi_trawl::{is_valid_url, Pipeline};
use tracing_subscriber::EnvFilter;

/// Sumi-Trawl: A polite content harvester
///
/// Sumi-Trawl fetches a batch of pages while respecting robots.txt and a
/// request delay, extracts their main content, images and metadata, and
/// keeps the relevant pages in a timestamped session directory.
#[derive(Parser, Debug)]
#[command(name = "sumi-trawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite content harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Target URLs to fetch
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// JSON file with site suggestions ({"message": ..., "websites": [...]})
    #[arg(long, value_name = "FILE")]
    suggestions: Option<PathBuf>,

    /// Client id that progress events are published under
    #[arg(long, default_value = "cli")]
    client_id: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and targets without fetching anything
    #[arg(long, conflicts_with_all = ["tree", "cleanup"])]
    dry_run: bool,

    /// Print the session directory tree as JSON and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cleanup"])]
    tree: bool,

    /// Remove expired sessions and exit
    #[arg(long, conflicts_with_all = ["dry_run", "tree"])]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.tree {
        return handle_tree(&config);
    }
    if cli.cleanup {
        return handle_cleanup(&config);
    }

    let mut targets = cli.urls.clone();
    if let Some(path) = &cli.suggestions {
        targets.extend(load_suggestions(path)?);
    }

    if cli.dry_run {
        handle_dry_run(&config, &targets);
        return Ok(());
    }

    handle_batch(config, targets, &cli.client_id).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_trawl=info,warn"),
            1 => EnvFilter::new("sumi_trawl=debug,info"),
            2 => EnvFilter::new("sumi_trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the target list out of a site suggestion file
fn load_suggestions(path: &Path) -> anyhow::Result<Vec<String>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read suggestions from {}", path.display()))?;
    let suggestion = SiteSuggestion::from_json(&json)
        .with_context(|| format!("Invalid suggestions file {}", path.display()))?;

    if !suggestion.message.is_empty() {
        tracing::info!("Suggestion: {}", suggestion.message);
    }
    Ok(suggestion.websites)
}

/// Handles the --dry-run mode: shows the configuration and target verdicts
fn handle_dry_run(config: &Config, targets: &[String]) {
    println!("=== Sumi-Trawl Dry Run ===\n");

    println!("Crawler:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nExtraction:");
    println!(
        "  Minimum content length: {}",
        config.extraction.min_content_length
    );
    println!(
        "  Images: {} (max {} per page)",
        if config.images.enabled { "enabled" } else { "disabled" },
        config.images.max_per_page
    );
    println!(
        "  Relevance threshold: {}",
        config.analysis.relevance_threshold
    );

    println!("\nSessions:");
    println!("  Base directory: {}", config.session.base_directory.display());
    println!("  Retention: {}h", config.session.retention_hours);

    println!("\nTargets ({}):", targets.len());
    for target in targets {
        let verdict = if is_valid_url(target) { "ok" } else { "invalid" };
        println!("  - {} [{}]", target, verdict);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --tree mode: prints the session directory tree
fn handle_tree(config: &Config) -> anyhow::Result<()> {
    let store = SessionStore::from_config(&config.session);
    let tree = store.list_tree()?;
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}

/// Handles the --cleanup mode: removes expired sessions
fn handle_cleanup(config: &Config) -> anyhow::Result<()> {
    let store = SessionStore::from_config(&config.session);
    let report = store.cleanup()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Handles the main batch operation
async fn handle_batch(config: Config, targets: Vec<String>, client_id: &str) -> anyhow::Result<()> {
    if targets.is_empty() {
        bail!("No target URLs given (pass URLs or --suggestions FILE)");
    }

    let notifier = Arc::new(ProgressNotifier::from_config(&config.progress));
    let mut stream = notifier.subscribe(client_id);

    let consumer = tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            match &event.payload {
                EventPayload::Log { message, .. } => tracing::info!("[log] {}", message),
                EventPayload::Progress {
                    progress, message, ..
                } => match progress {
                    Some(p) => tracing::info!("[{:>3}%] {}", p, message),
                    None => tracing::info!("[progress] {}", message),
                },
                EventPayload::Ping => tracing::trace!("[ping]"),
            }
        }
    });

    let mut pipeline = Pipeline::new(&config, Arc::clone(&notifier))?;
    let result = pipeline.run_batch(&targets, client_id).await;

    notifier.unsubscribe(client_id);
    if let Err(e) = consumer.await {
        tracing::warn!("Progress consumer ended abnormally: {}", e);
    }

    let result = result?;
    let output = serde_json::json!({
        "session_id": result.session_id,
        "session_path": result.session_path,
        "summary": result.summary,
        "status": result.status,
        "errors": result.errors,
        "records": result
            .records
            .iter()
            .map(|r| serde_json::json!({
                "url": r.url,
                "title": r.metadata.title,
                "relevance_score": r.relevance_score,
                "images": r.images.len(),
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if result.status == BatchStatus::AllFailed {
        bail!("All {} targets failed", result.summary.total);
    }

    Ok(())
}
