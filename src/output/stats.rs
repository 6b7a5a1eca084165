//! Statistics generation from the document store
//!
//! This module provides functionality for extracting and displaying
//! index statistics from the storage layer.

use crate::storage::{DocumentStore, RunRecord};
use crate::KumoError;

/// Index statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Number of stored documents
    pub documents: u64,

    /// Number of stored embeddings
    pub vectors: u64,

    /// Most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl StoreStatistics {
    /// Documents that have no embedding (should be zero)
    pub fn documents_without_vectors(&self) -> u64 {
        self.documents.saturating_sub(self.vectors)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(KumoError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn DocumentStore) -> Result<StoreStatistics, KumoError> {
    Ok(StoreStatistics {
        documents: storage.count_documents()?,
        vectors: storage.count_vectors()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Documents: {}", stats.documents);
    println!("  Embeddings: {}", stats.vectors);
    if stats.documents_without_vectors() > 0 {
        println!(
            "  Documents missing embeddings: {}",
            stats.documents_without_vectors()
        );
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Crawl Run:");
            println!("  Run ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(admitted) = run.pages_admitted {
                println!("  Pages admitted: {}", admitted);
            }
            if let Some(stored) = run.documents_stored {
                println!("  Documents stored: {}", stored);
            }
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No crawl runs recorded"),
    }
}
