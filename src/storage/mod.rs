//! Storage module for persisting documents and embeddings
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Insert-or-fetch document persistence keyed by URL
//! - Embedding upserts and the full scan used by search
//! - Crawl run history

mod codec;
mod schema;
mod sqlite;
mod traits;

pub use codec::{decode_embedding, encode_embedding};
pub use sqlite::SqliteStorage;
pub use traits::{DocumentStore, StorageError, StorageResult};

use crate::KumoError;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Storage handle shared between crawl workers and the search engine
pub type SharedStore = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(KumoError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, KumoError> {
    SqliteStorage::new(path)
}

/// Opens storage and wraps it for sharing across tasks
pub fn open_shared(path: &Path) -> Result<SharedStore, KumoError> {
    Ok(Arc::new(Mutex::new(open_storage(path)?)))
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub text: String,
    pub file_path: Option<String>,
    pub added_on: String,
}

/// A stored embedding; `dim` always equals `vector.len()`
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub doc_id: i64,
    pub dim: usize,
    pub vector: Vec<f32>,
}

/// Fields supplied when creating a document
#[derive(Debug, Clone, Copy)]
pub struct NewDocument<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub text: &'a str,
    pub file_path: Option<&'a str>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub pages_admitted: Option<u64>,
    pub documents_stored: Option<u64>,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
