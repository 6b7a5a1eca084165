//! Kumo-Index: a seed-domain crawler with semantic search
//!
//! This crate crawls a fixed set of seed sites, extracts text from HTML and PDF
//! documents, embeds each document into a fixed-width vector, and ranks stored
//! documents against natural-language queries by cosine similarity.

pub mod config;
pub mod crawler;
pub mod embedder;
pub mod extract;
pub mod output;
pub mod search;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Kumo-Index operations
#[derive(Debug, Error)]
pub enum KumoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embedder::EmbedError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Reasons a URL is refused before it can enter the frontier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Excluded link target: {0}")]
    Excluded(String),
}

/// Result type alias for Kumo-Index operations
pub type Result<T> = std::result::Result<T, KumoError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlReport, PageOutcome, SkipReason};
pub use search::{SearchHit, Searcher};
pub use url::{admission_url, strip_fragment};
