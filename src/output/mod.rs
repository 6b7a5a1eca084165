//! Output module for presenting crawl and search results
//!
//! This module handles:
//! - Printing crawl summaries
//! - Printing ranked search hits as text or JSON
//! - Index statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::crawler::CrawlReport;
use crate::search::SearchHit;

/// Prints a one-crawl summary to stdout
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl Summary ===\n");
    println!("  Pages admitted: {}", report.pages_admitted);
    println!("  Documents stored: {}", report.documents_stored);
    println!("  Pages skipped: {}", report.pages_skipped);
}

/// Renders search hits as numbered plain-text entries
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results for \"{}\"\n", query);
    }

    let mut out = format!("Results for \"{}\":\n\n", query);
    for (rank, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({:.3})\n   {}\n   {}\n\n",
            rank + 1,
            hit.title,
            hit.score,
            hit.url,
            hit.snippet
        ));
    }
    out
}

/// Renders search hits as a JSON array
pub fn hits_to_json(hits: &[SearchHit]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(hits)
}
