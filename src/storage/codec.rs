//! Text encoding for embedding blobs
//!
//! Vectors are stored as comma-separated decimals with six fractional
//! digits. The `dim` column is checked against the decoded length on every
//! read.

use crate::storage::{StorageError, StorageResult};

const SEPARATOR: &str = ",";

/// Serializes a vector as `0.100000,0.200000,...`
pub fn encode_embedding(vector: &[f32]) -> String {
    vector
        .iter()
        .map(|v| format!("{:.6}", v))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Parses a blob written by [`encode_embedding`]
///
/// Fails if any component is not a number or if the component count does
/// not match `dim`.
pub fn decode_embedding(blob: &str, dim: usize) -> StorageResult<Vec<f32>> {
    let vector = if blob.trim().is_empty() {
        Vec::new()
    } else {
        blob.split(SEPARATOR)
            .map(|part| {
                part.trim().parse::<f32>().map_err(|e| {
                    StorageError::Serialization(format!("bad component '{}': {}", part, e))
                })
            })
            .collect::<StorageResult<Vec<f32>>>()?
    };

    if vector.len() != dim {
        return Err(StorageError::Serialization(format!(
            "embedding declares dim {} but holds {} values",
            dim,
            vector.len()
        )));
    }

    Ok(vector)
}
