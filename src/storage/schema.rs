//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Kumo-Index database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per unique URL; rows are never updated
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    file_path TEXT,
    added_on TEXT NOT NULL
);

-- One embedding per document, replaced on rewrite
CREATE TABLE IF NOT EXISTS vectors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_id INTEGER NOT NULL UNIQUE REFERENCES documents(id),
    dim INTEGER NOT NULL,
    embedding_blob TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vectors_doc ON vectors(doc_id);

-- Crawl history (not used for resumption)
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    pages_admitted INTEGER,
    documents_stored INTEGER,
    status TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
