//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest listing harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::crawler::harvest;
use sumi_harvest::output::{load_statistics, print_report, print_statistics};
use sumi_harvest::storage::{open_store, Store};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a resumable listing harvester
///
/// Walks the paginated listing for one region and category, reveals each
/// entry's contact address, and checkpoints the results to a CSV file after
/// every page. Re-running the same command resumes where the last run
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A resumable listing harvester", long_about = None)]
struct Cli {
    /// Region selector substituted into the listing URL
    #[arg(value_name = "REGION")]
    region: String,

    /// Category selector substituted into the listing URL
    #[arg(value_name = "CATEGORY")]
    category: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "harvest.toml")]
    config: PathBuf,

    /// Start from the first page, ignoring persisted results
    #[arg(long)]
    fresh: bool,

    /// Override the configured page ceiling
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Validate config and show the resolved listing URL without harvesting
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the result file and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli.region, &cli.category)
    } else if cli.stats {
        handle_stats(&config);
        Ok(())
    } else {
        handle_harvest(config, &cli.region, &cli.category, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config, region: &str, category: &str) -> anyhow::Result<()> {
    let listing_url = config
        .site
        .resolve_listing_url(region, category)
        .context("listing URL does not resolve")?;

    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Listing: {}", listing_url);
    println!("  Reveal endpoint: {}", config.site.reveal_url);
    println!(
        "  Reveal parameter: {} (field \"{}\")",
        config.reveal.key_param, config.reveal.field
    );

    println!("\nCrawler Configuration:");
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!(
        "  Fetch attempts: {} (base delay {}ms)",
        config.fetch.max_attempts, config.fetch.base_delay_ms
    );
    println!(
        "  Reveal attempts: {} (base delay {}ms, {}ms between lookups)",
        config.reveal.max_attempts, config.reveal.base_delay_ms, config.reveal.delay_ms
    );

    println!("\nLayout:");
    println!("  Entry marker: {}", config.layout.entry_selector);
    println!("  Next control: {}", config.layout.next_selector);
    println!("  Labels: {}", config.layout.labels.join(", "));

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path);

    let persisted = open_store(config).load().len();
    println!("\n✓ Configuration is valid");
    println!(
        "✓ {} records already persisted; would start at page {}",
        persisted,
        persisted / config.crawler.page_size + 1
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the result file
fn handle_stats(config: &Config) {
    println!("Results: {}\n", config.output.results_path);

    let store = open_store(config);
    let stats = load_statistics(&store);
    print_statistics(&stats);
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    region: &str,
    category: &str,
    fresh: bool,
) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring persisted results)");
    } else {
        tracing::info!("Starting harvest (will resume from persisted results)");
    }

    let report = harvest(config, region, category, fresh)
        .await
        .context("harvest failed")?;

    print_report(&report);
    Ok(())
}
