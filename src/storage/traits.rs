//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{DocumentRecord, EmbeddingRecord, NewDocument, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Implementations are not required to be `Sync`; callers share one instance
/// behind a mutex so a multi-statement write is never interleaved with
/// another worker's write.
pub trait DocumentStore {
    // ===== Documents =====

    /// Inserts a document, or returns the id of the existing row for this URL
    ///
    /// First write wins: an existing row's title and text are left untouched.
    fn create_document(
        &mut self,
        url: &str,
        title: &str,
        text: &str,
        file_path: Option<&str>,
    ) -> StorageResult<i64>;

    /// Gets a document by ID
    fn get_document(&self, doc_id: i64) -> StorageResult<DocumentRecord>;

    /// Gets a document by URL
    fn get_document_by_url(&self, url: &str) -> StorageResult<Option<DocumentRecord>>;

    // ===== Embeddings =====

    /// Writes the embedding for a document, replacing any previous one
    fn upsert_embedding(&mut self, doc_id: i64, vector: &[f32]) -> StorageResult<()>;

    /// Gets the embedding for a document
    fn get_embedding(&self, doc_id: i64) -> StorageResult<Option<EmbeddingRecord>>;

    /// Creates (or resolves) a document and writes its embedding atomically
    ///
    /// # Returns
    ///
    /// The document ID (either newly created or existing)
    fn store_document(&mut self, doc: &NewDocument<'_>, vector: &[f32]) -> StorageResult<i64>;

    /// Full scan of every document that has an embedding, in insertion order
    fn list_all(&self) -> StorageResult<Vec<(DocumentRecord, EmbeddingRecord)>>;

    // ===== Run History =====

    /// Records the start of a crawl run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the end of a crawl run with its totals
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_admitted: u64,
        documents_stored: u64,
    ) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Counts stored documents
    fn count_documents(&self) -> StorageResult<u64>;

    /// Counts stored embeddings
    fn count_vectors(&self) -> StorageResult<u64>;
}
