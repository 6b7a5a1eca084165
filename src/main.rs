//! Kumo-Index main entry point
//!
//! This is the command-line interface for the Kumo-Index crawler and search
//! tool.

use anyhow::Context;
use clap::Parser;
use kumo_index::config::{load_config_with_hash, Config};
use kumo_index::crawler::crawl;
use kumo_index::embedder::build_embedder;
use kumo_index::output::{
    format_hits, hits_to_json, load_statistics, print_crawl_report, print_statistics,
};
use kumo_index::search::Searcher;
use kumo_index::storage::open_shared;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Kumo-Index: crawl seed sites and search them by meaning
///
/// Kumo-Index crawls a fixed set of seed sites, extracts text from HTML and
/// PDF documents, embeds each document, and answers natural-language queries
/// by cosine similarity over the stored embeddings.
#[derive(Parser, Debug)]
#[command(name = "kumo-index")]
#[command(version = "1.0.0")]
#[command(about = "Seed-domain crawler with semantic search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl the configured seeds (default behavior)
    #[arg(long, conflicts_with_all = ["search", "stats", "dry_run"])]
    crawl: bool,

    /// Search the index with a natural-language query and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["stats", "dry_run"])]
    search: Option<String>,

    /// Print search results as JSON
    #[arg(long, requires = "search")]
    json: bool,

    /// Number of search results (overrides the configured top-k)
    #[arg(long, requires = "search")]
    top_k: Option<usize>,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run"])]
    stats: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(query) = &cli.search {
        let top_k = cli.top_k.unwrap_or(config.search.top_k);
        handle_search(&config, query, top_k, cli.json).await?;
    } else {
        if !cli.crawl {
            tracing::debug!("No mode given, defaulting to --crawl");
        }
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kumo_index=info,warn"),
            1 => EnvFilter::new("kumo_index=debug,info"),
            2 => EnvFilter::new("kumo_index=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Kumo-Index Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page budget: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Accept invalid certificates: {}",
        config.crawler.accept_invalid_certs
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  PDF downloads: {}", config.output.download_dir);

    println!("\nEmbedder:");
    println!("  Model: {}", config.embedder.model);
    println!("  Endpoint: {}", config.embedder.base_url);
    println!("  Dimensions: {}", config.embedder.dimensions);
    let key_present = std::env::var(&config.embedder.api_key_env)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false);
    println!(
        "  API key ({}): {}",
        config.embedder.api_key_env,
        if key_present { "set" } else { "missing" }
    );

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl up to {} pages from {} seed URLs",
        config.crawler.max_pages,
        config.crawler.seeds.len()
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use kumo_index::storage::SqliteStorage;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --search mode
async fn handle_search(config: &Config, query: &str, top_k: usize, json: bool) -> anyhow::Result<()> {
    let store = open_shared(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let searcher = Searcher::new(
        store,
        build_embedder(&config.embedder),
        config.search.snippet_chars,
    );

    let hits = searcher.search(query, top_k).await;

    if json {
        println!("{}", hits_to_json(&hits)?);
    } else {
        print!("{}", format_hits(query, &hits));
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, page budget: {}, workers: {}",
        config.crawler.seeds.len(),
        config.crawler.max_pages,
        config.crawler.workers
    );

    let report = crawl(config, config_hash).await.context("crawl failed")?;
    print_crawl_report(&report);

    Ok(())
}
