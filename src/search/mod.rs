//! Semantic search over stored documents
//!
//! A query is embedded with the same [`Embedder`] used during the crawl and
//! ranked against every stored embedding by cosine similarity.

mod engine;

pub use engine::{cosine_similarity, rank, EPSILON};

use crate::embedder::Embedder;
use crate::storage::{DocumentRecord, DocumentStore, SharedStore};
use crate::KumoError;
use serde::Serialize;
use std::sync::Arc;

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Cosine similarity rounded to 3 decimal places
    pub score: f64,
}

impl SearchHit {
    fn from_ranked(doc: DocumentRecord, score: f32, snippet_chars: usize) -> Self {
        let title = if doc.title.trim().is_empty() {
            "Untitled".to_string()
        } else {
            doc.title
        };

        Self {
            url: doc.url,
            title,
            snippet: snippet(&doc.text, snippet_chars),
            score: (f64::from(score) * 1000.0).round() / 1000.0,
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended if cut
fn snippet(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return "No content available".to_string();
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Answers natural-language queries against the document store
pub struct Searcher {
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    snippet_chars: usize,
}

impl Searcher {
    pub fn new(store: SharedStore, embedder: Arc<dyn Embedder>, snippet_chars: usize) -> Self {
        Self {
            store,
            embedder,
            snippet_chars,
        }
    }

    /// Ranks stored documents against a precomputed query vector
    pub fn search_vector(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(DocumentRecord, f32)>, KumoError> {
        let entries = self.store.lock().list_all()?;
        Ok(rank(query, entries, k))
    }

    /// Embeds `query` and returns the `top_k` best matches
    ///
    /// Errors never escape: a failing store is logged and yields an empty
    /// list. A blank query yields no hits.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() {
            tracing::warn!("Empty search query");
            return Vec::new();
        }

        let vector = self.embedder.embed(query).await;

        match self.search_vector(&vector, top_k) {
            Ok(ranked) => ranked
                .into_iter()
                .map(|(doc, score)| SearchHit::from_ranked(doc, score, self.snippet_chars))
                .collect(),
            Err(e) => {
                tracing::error!("Search error: {}", e);
                Vec::new()
            }
        }
    }
}
