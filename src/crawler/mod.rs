//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier (dedup set, pending queue, page budget)
//! - HTTP fetching
//! - The worker pool and per-URL pipeline
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;

pub use coordinator::{process_url, Coordinator, CrawlContext, CrawlReport, PageOutcome, SkipReason};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::Frontier;

use crate::config::Config;
use crate::embedder::build_embedder;
use crate::storage::{open_shared, DocumentStore, RunStatus};
use crate::KumoError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the document store, create the download directory and build
///    the HTTP client
/// 2. Record a new crawl run
/// 3. Build the embedder
/// 4. Seed the frontier and run the worker pool until it drains
/// 5. Record the run's totals
///
/// The frontier is built fresh on every call; nothing is resumed.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to completion; `pages_admitted` is the
///   number of distinct URLs admitted
/// * `Err(KumoError)` - Storage or the download directory could not be
///   set up, the HTTP client could not be built, or a worker panicked
pub async fn crawl(config: &Config, config_hash: &str) -> Result<CrawlReport, KumoError> {
    let store = open_shared(Path::new(&config.output.database_path))?;
    tokio::fs::create_dir_all(&config.output.download_dir).await?;
    let fetcher = HttpFetcher::new(config)?;
    let run_id = store.lock().create_run(config_hash)?;

    let ctx = CrawlContext {
        fetcher: Arc::new(fetcher),
        embedder: build_embedder(&config.embedder),
        store: Arc::clone(&store),
        download_dir: PathBuf::from(&config.output.download_dir),
    };

    let coordinator = Coordinator::new(ctx, config.crawler.max_pages, config.crawler.workers);
    coordinator.seed(&config.crawler.seeds);

    match coordinator.run().await {
        Ok(report) => {
            store.lock().finish_run(
                run_id,
                RunStatus::Completed,
                report.pages_admitted as u64,
                report.documents_stored as u64,
            )?;
            Ok(report)
        }
        Err(e) => {
            let admitted = coordinator.frontier().admitted() as u64;
            if let Err(store_err) = store
                .lock()
                .finish_run(run_id, RunStatus::Failed, admitted, 0)
            {
                tracing::error!("Failed to record failed run {}: {}", run_id, store_err);
            }
            Err(e)
        }
    }
}
