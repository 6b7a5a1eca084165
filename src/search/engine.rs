//! Brute-force cosine ranking
//!
//! Every stored embedding is scored against the query on each call. There is
//! no index: cost is O(documents x dimension) per query.

use crate::storage::{DocumentRecord, EmbeddingRecord};

/// Guards the denominator against all-zero vectors
pub const EPSILON: f32 = 1e-8;

/// `dot(a, b) / (|a| * |b| + EPSILON)`
///
/// An all-zero input scores 0.0 against everything instead of NaN. Slices
/// of different lengths are compared over their common prefix; callers are
/// expected to check dimensions first.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt() + EPSILON)
}

/// Scores every entry against `query` and keeps the best `k`
///
/// Sorting is stable, so equal scores keep the order of `entries` (which
/// is insertion order when it comes from a full store scan). Entries whose
/// dimension differs from the query are left out.
pub fn rank(
    query: &[f32],
    entries: Vec<(DocumentRecord, EmbeddingRecord)>,
    k: usize,
) -> Vec<(DocumentRecord, f32)> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(DocumentRecord, f32)> = entries
        .into_iter()
        .filter_map(|(doc, embedding)| {
            if embedding.vector.len() != query.len() {
                tracing::warn!(
                    "Skipping document {}: embedding has {} dimensions, query has {}",
                    doc.id,
                    embedding.vector.len(),
                    query.len()
                );
                return None;
            }
            let score = cosine_similarity(query, &embedding.vector);
            Some((doc, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}
