//! DrugBank Harvester main entry point
//!
//! This is the command-line interface for the DrugBank catalog harvester.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use drugbank_harvester::config::{load_config_with_hash, Config, DEFAULT_CONFIG_HASH};
use drugbank_harvester::crawler::{HarvestTarget, Harvester, RunCounters, MAX_DRUG_ID};
use drugbank_harvester::output::{print_statistics, write_corpus, write_stats};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// DrugBank Harvester: a patient catalog scraper
///
/// Walks the DrugBank catalog listing, extracts every drug detail page into a
/// structured record, and writes the corpus together with run statistics.
#[derive(Parser, Debug)]
#[command(name = "drugbank-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A patient DrugBank catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Pretty-print the harvested records to stdout
    #[arg(long)]
    print: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Harvest every drug on the first COUNT listing pages
    Pages {
        /// Number of listing pages; prompted for when omitted
        count: Option<u32>,
    },

    /// Harvest a single drug by numeric id (1 for DB00001)
    Id {
        /// Numeric drug id; prompted for when omitted
        id: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), DEFAULT_CONFIG_HASH.to_string()),
    };

    let target = match cli.mode {
        Mode::Pages { count } => HarvestTarget::Pages(match count {
            Some(count) => count,
            None => prompt_for_integer(&format!(
                "Enter number of pages to scrape (max. {})",
                config.harvest.max_pages
            ))?,
        }),
        Mode::Id { id } => HarvestTarget::Id(match id {
            Some(id) => id,
            None => prompt_for_integer(&format!("Enter DB ID (max. {})", MAX_DRUG_ID))?,
        }),
    };

    target
        .validate(&config.harvest)
        .map_err(|message| anyhow!("❌ {}", message))?;

    if cli.dry_run {
        handle_dry_run(&config, target);
        return Ok(());
    }

    handle_harvest(config, config_hash, target, cli.print).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("drugbank_harvester=info,warn"),
            1 => EnvFilter::new("drugbank_harvester=debug,info"),
            2 => EnvFilter::new("drugbank_harvester=trace,debug"),
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

/// Asks on stdin until a non-negative integer is entered
fn prompt_for_integer(message: &str) -> anyhow::Result<u32> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}: ", message);
        io::stdout().flush()?;

        let line = lines
            .next()
            .ok_or_else(|| anyhow!("stdin closed before a number was entered"))??;
        match line.trim().parse::<u32>() {
            Ok(value) => return Ok(value),
            Err(_) => println!("'{}' is not a valid number", line.trim()),
        }
    }
}

/// Handles the --dry-run mode: shows the effective configuration and target
fn handle_dry_run(config: &Config, target: HarvestTarget) {
    println!("=== DrugBank Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  First listing page: {}", config.site.listing_url(0));

    println!("\nFetcher:");
    println!("  Retry limit: {}", config.fetcher.retry_limit);
    println!("  Base delay: {}ms", config.fetcher.base_delay_ms);
    println!("  Error delay: {}ms", config.fetcher.error_delay_ms);
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nHarvest:");
    println!("  Workers: {}", config.harvest.workers);
    println!("  Max pages: {}", config.harvest.max_pages);
    println!(
        "  Interactions: {} rows per page, at most {} pages",
        config.harvest.interaction_page_length, config.harvest.max_interaction_pages
    );

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_dir);
    println!("  Stats: {}", config.output.stats_dir);

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {}", target);
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: String,
    target: HarvestTarget,
    print: bool,
) -> anyhow::Result<()> {
    let results_dir = PathBuf::from(&config.output.results_dir);
    let stats_dir = PathBuf::from(&config.output.stats_dir);

    let harvester = Harvester::new(config, Arc::new(RunCounters::new()))?
        .with_config_hash(config_hash);

    let run = match harvester.run(target).await {
        Ok(run) => run,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    if print {
        println!("{}", serde_json::to_string_pretty(&run.records)?);
    }

    print_statistics(&run.stats);

    let corpus_path = write_corpus(&results_dir, &run.records)
        .with_context(|| format!("Failed to write corpus to {}", results_dir.display()))?;
    let stats_path = write_stats(&stats_dir, &run.stats)
        .with_context(|| format!("Failed to write statistics to {}", stats_dir.display()))?;

    println!("✓ Corpus: {}", display_path(&corpus_path));
    println!("✓ Statistics: {}", display_path(&stats_path));

    Ok(())
}

fn display_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .map(|absolute| format!("file://{}", absolute.display()))
        .unwrap_or_else(|_| path.display().to_string())
}
