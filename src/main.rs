//! Sitemap-Walker main entry point
//!
//! This is the command-line interface for the Sitemap-Walker visitor.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use sitemap_walker::config::{load_config_with_hash, parse_sitemap_url, validate, Config};
use sitemap_walker::Coordinator;
use tracing_subscriber::EnvFilter;

/// Interval between progress lines while a crawl runs
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Sitemap-Walker: a paced sitemap visitor
///
/// Sitemap-Walker expands a sitemap (or sitemap index) into its page URLs
/// and visits each one in a real browser with randomized pacing and
/// optional human-like scrolling.
#[derive(Parser, Debug)]
#[command(name = "sitemap-walker")]
#[command(version = "1.0.0")]
#[command(about = "A paced sitemap visitor", long_about = None)]
struct Cli {
    /// Sitemap or sitemap index to walk
    #[arg(value_name = "SITEMAP_URL")]
    sitemap_url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resolve the sitemap and print its URLs without visiting them
    #[arg(long)]
    dry_run: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Minimum pause between batches (ms)
    #[arg(long, value_name = "MS")]
    delay_min: Option<u64>,

    /// Maximum pause between batches (ms)
    #[arg(long, value_name = "MS")]
    delay_max: Option<u64>,

    /// Upper bound of the settle time after each page load (ms)
    #[arg(long, value_name = "MS")]
    load_wait_time: Option<u64>,

    /// Pages visited concurrently per batch
    #[arg(long, value_name = "N")]
    max_concurrent: Option<u32>,

    /// User agent presented to visited sites
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Skip the scrolling that imitates a human reader
    #[arg(long)]
    no_simulate_human: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration")?;

    let sitemap_url = parse_sitemap_url(&cli.sitemap_url)?;

    let coordinator = Coordinator::new(config)?;

    if cli.dry_run {
        handle_dry_run(&coordinator, sitemap_url.as_str()).await
    } else {
        handle_crawl(&coordinator, sitemap_url.as_str()).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitemap_walker=info,warn"),
            1 => EnvFilter::new("sitemap_walker=debug,info"),
            2 => EnvFilter::new("sitemap_walker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Overlays command-line options on the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    let visit = &mut config.visit;

    if let Some(delay_min) = cli.delay_min {
        visit.delay_min = delay_min;
    }
    if let Some(delay_max) = cli.delay_max {
        visit.delay_max = delay_max;
    }
    if let Some(load_wait_time) = cli.load_wait_time {
        visit.load_wait_time = load_wait_time;
    }
    if let Some(max_concurrent) = cli.max_concurrent {
        visit.max_concurrent = max_concurrent;
    }
    if let Some(user_agent) = &cli.user_agent {
        visit.user_agent = user_agent.clone();
    }
    if cli.no_simulate_human {
        visit.simulate_human = false;
    }
    if cli.headed {
        config.browser.headless = false;
    }
}

/// Handles the --dry-run mode: resolves the sitemap and lists its URLs
async fn handle_dry_run(coordinator: &Coordinator, sitemap_url: &str) -> anyhow::Result<()> {
    println!("=== Sitemap-Walker Dry Run ===\n");

    let visit = &coordinator.config().visit;
    println!("Visit Options:");
    println!("  Delay between batches: {}-{}ms", visit.delay_min, visit.delay_max);
    println!("  Load wait time: {}ms", visit.load_wait_time);
    println!("  Simulate human: {}", visit.simulate_human);
    println!("  Max concurrent: {}", visit.max_concurrent);
    println!("  User agent: {}", visit.user_agent);

    let urls = coordinator.resolve(sitemap_url).await?;

    println!("\nPages ({}):", urls.len());
    for url in &urls {
        println!("  - {}", url);
    }

    println!("\n✓ Sitemap resolved");
    println!(
        "✓ Would visit {} pages in {} batches",
        urls.len(),
        urls.len().div_ceil(sitemap_walker::crawler::batch_width(visit))
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(coordinator: &Coordinator, sitemap_url: &str) -> anyhow::Result<()> {
    let handle = coordinator.start(sitemap_url).await?;

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    while !handle.is_finished() {
        ticker.tick().await;
        if handle.is_finished() {
            break;
        }

        let snapshot = coordinator.snapshot();
        tracing::info!(
            "Progress: {}/{} visited (current: {})",
            snapshot.visited_count,
            snapshot.total_urls,
            snapshot.current_url.as_deref().unwrap_or("-")
        );
    }

    let summary = handle.wait().await?;
    let snapshot = coordinator.snapshot();

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    match &snapshot.error {
        Some(error) => {
            tracing::error!("Crawl failed: {}", error);
            anyhow::bail!("Crawl failed: {}", error)
        }
        None => {
            tracing::info!(
                "Crawl completed: {} visited, {} failed",
                summary.succeeded,
                summary.failed
            );
            Ok(())
        }
    }
}
