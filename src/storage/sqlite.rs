//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::storage::codec::{decode_embedding, encode_embedding};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use crate::storage::{DocumentRecord, EmbeddingRecord, NewDocument, RunRecord, RunStatus};
use crate::KumoError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const DOCUMENT_COLUMNS: &str = "id, url, title, text, file_path, added_on";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(KumoError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, KumoError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, KumoError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        text: row.get(3)?,
        file_path: row.get(4)?,
        added_on: row.get(5)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        pages_admitted: row.get::<_, Option<i64>>(4)?.map(|n| n as u64),
        documents_stored: row.get::<_, Option<i64>>(5)?.map(|n| n as u64),
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(RunStatus::Running),
    })
}

/// INSERT OR IGNORE, then resolve the id by URL
///
/// Works on a plain connection or inside a transaction.
fn insert_or_get_document(conn: &Connection, doc: &NewDocument<'_>) -> StorageResult<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO documents (url, title, text, file_path, added_on)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![doc.url, doc.title, doc.text, doc.file_path, now],
    )?;

    let id = conn.query_row(
        "SELECT id FROM documents WHERE url = ?1",
        params![doc.url],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn write_embedding(conn: &Connection, doc_id: i64, vector: &[f32]) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO vectors (doc_id, dim, embedding_blob) VALUES (?1, ?2, ?3)
         ON CONFLICT(doc_id) DO UPDATE SET dim = excluded.dim, embedding_blob = excluded.embedding_blob",
        params![doc_id, vector.len() as i64, encode_embedding(vector)],
    )?;
    Ok(())
}

impl DocumentStore for SqliteStorage {
    // ===== Documents =====

    fn create_document(
        &mut self,
        url: &str,
        title: &str,
        text: &str,
        file_path: Option<&str>,
    ) -> StorageResult<i64> {
        insert_or_get_document(
            &self.conn,
            &NewDocument {
                url,
                title,
                text,
                file_path,
            },
        )
    }

    fn get_document(&self, doc_id: i64) -> StorageResult<DocumentRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                params![doc_id],
                document_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::DocumentNotFound(format!("Document ID {}", doc_id)))
    }

    fn get_document_by_url(&self, url: &str) -> StorageResult<Option<DocumentRecord>> {
        let doc = self
            .conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE url = ?1", DOCUMENT_COLUMNS),
                params![url],
                document_from_row,
            )
            .optional()?;
        Ok(doc)
    }

    // ===== Embeddings =====

    fn upsert_embedding(&mut self, doc_id: i64, vector: &[f32]) -> StorageResult<()> {
        write_embedding(&self.conn, doc_id, vector)
    }

    fn get_embedding(&self, doc_id: i64) -> StorageResult<Option<EmbeddingRecord>> {
        let raw: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT dim, embedding_blob FROM vectors WHERE doc_id = ?1",
                params![doc_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match raw {
            Some((dim, blob)) => {
                let dim = dim as usize;
                let vector = decode_embedding(&blob, dim)?;
                Ok(Some(EmbeddingRecord {
                    doc_id,
                    dim,
                    vector,
                }))
            }
            None => Ok(None),
        }
    }

    fn store_document(&mut self, doc: &NewDocument<'_>, vector: &[f32]) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;
        let doc_id = insert_or_get_document(&tx, doc)?;
        write_embedding(&tx, doc_id, vector)?;
        tx.commit()?;
        Ok(doc_id)
    }

    fn list_all(&self) -> StorageResult<Vec<(DocumentRecord, EmbeddingRecord)>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.url, d.title, d.text, d.file_path, d.added_on, v.dim, v.embedding_blob
             FROM documents d
             JOIN vectors v ON v.doc_id = d.id
             ORDER BY d.id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let doc = document_from_row(row)?;
                let dim: i64 = row.get(6)?;
                let blob: String = row.get(7)?;
                Ok((doc, dim as usize, blob))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (doc, dim, blob) in rows {
            let vector = match decode_embedding(&blob, dim) {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!("Skipping embedding for {}: {}", doc.url, e);
                    continue;
                }
            };
            let embedding = EmbeddingRecord {
                doc_id: doc.id,
                dim,
                vector,
            };
            entries.push((doc, embedding));
        }

        Ok(entries)
    }

    // ===== Run History =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_admitted: u64,
        documents_stored: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, pages_admitted = ?3,
             documents_stored = ?4 WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                pages_admitted as i64,
                documents_stored as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, pages_admitted,
                 documents_stored, status FROM crawl_runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    fn count_documents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_vectors(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
