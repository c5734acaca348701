//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the Listing-Harvester crawler.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use listing_harvester::config::{load_config_with_hash, CategoryRegistry, Config};
use listing_harvester::crawler::{crawl, SharedStore};
use listing_harvester::listing::Category;
use listing_harvester::output::{export_links, load_link_statistics, print_link_statistics, ExportOptions};
use listing_harvester::progress::{ProgressBroadcaster, ProgressEvent};
use listing_harvester::server::{serve, AppState};
use listing_harvester::storage::{open_storage, ListingStore, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a concurrent real-estate listing crawler
///
/// Crawls every index page of a listing category with a bounded pool of
/// workers, deduplicates the listings into SQLite and serves them over HTTP.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent real-estate listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and the live progress channel
    Serve,

    /// Crawl one category to completion
    Crawl {
        /// Category to crawl, e.g. villas
        category: String,

        /// Stop after this many index pages
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Show how many stored listings carry a valid link
    Stats,

    /// Export listing links to CSV
    Export {
        /// Categories to export (comma separated, default all)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<Category>,

        /// Only listings scraped on or after this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_min_date)]
        min_date: Option<DateTime<Utc>>,

        /// Row limit per category (0 for no limit)
        #[arg(long)]
        max_per_category: Option<usize>,

        /// Add price, location, surface and scraping date columns
        #[arg(long)]
        extended: bool,

        /// Output file (defaults to output.export-path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete every stored listing
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => handle_serve(config).await,
        Command::Crawl {
            category,
            max_pages,
        } => handle_crawl(config, &category, max_pages).await,
        Command::Stats => handle_stats(&config),
        Command::Export {
            categories,
            min_date,
            max_per_category,
            extended,
            output,
        } => {
            let options = ExportOptions {
                categories,
                min_date,
                max_per_category,
                extended,
            };
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.export_path));
            handle_export(&config, &output, &options)
        }
        Command::Reset => handle_reset(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,tower_http=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using built-in defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

fn parse_min_date(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
        .and_then(|date| {
            date.and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .ok_or_else(|| format!("invalid date: {}", s))
        })
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    open_storage(path).with_context(|| format!("failed to open database {}", path.display()))
}

async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(open_store(&config)?);
    let state = AppState::new(config, store)?;
    serve(state).await?;
    Ok(())
}

/// Crawls one category, echoing progress events to stdout
async fn handle_crawl(config: Config, category: &str, max_pages: Option<u32>) -> anyhow::Result<()> {
    let registry = CategoryRegistry::from_config(&config)?;
    let store: SharedStore = Arc::new(open_store(&config)?);
    let broadcaster = ProgressBroadcaster::new();

    let mut subscription = broadcaster.subscribe().await;
    let printer = tokio::spawn(async move {
        while let Some(payload) = subscription.receiver.recv().await {
            match serde_json::from_str::<ProgressEvent>(&payload) {
                Ok(event) => println!("[{:?}] {}", event.status, event.message),
                Err(_) => println!("{}", payload),
            }
        }
    });

    let result = crawl(&config, &registry, category, max_pages, store, broadcaster).await;

    // Dropping the broadcaster closes the subscription and ends the printer
    let _ = printer.await;

    let job = result?;
    println!(
        "\n✓ {}: {} new listings from {}/{} pages",
        job.category, job.new_records, job.succeeded_pages, job.total_pages
    );
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(config)?;
    let stats = load_link_statistics(&store, &config.site.link_domain)?;
    print_link_statistics(&stats);

    Ok(())
}

fn handle_export(config: &Config, output: &Path, options: &ExportOptions) -> anyhow::Result<()> {
    println!("=== Exporting Listing Links ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", output.display());
    println!();

    let store = open_store(config)?;
    let report = export_links(&store, &config.site.link_domain, output, options)?;

    for (category, count) in &report.per_category {
        println!("  {:20} {}", category.as_str(), count);
    }
    println!("\n✓ {} links exported to: {}", report.total, report.path.display());

    Ok(())
}

fn handle_reset(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    store.reset()?;
    println!("✓ Database reset: {}", config.output.database_path);
    Ok(())
}
