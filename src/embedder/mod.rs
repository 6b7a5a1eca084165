//! Text embedding
//!
//! Every stored document and every search query passes through an
//! [`Embedder`]. The pipeline never fails on an embedding error: the provided
//! [`Embedder::embed`] method logs the failure and returns an all-zero vector
//! of the configured width instead.

mod openai;

pub use openai::OpenAiEmbedder;

use crate::config::EmbedderConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Key value shipped in the sample `.env`; treated the same as no key
pub const PLACEHOLDER_API_KEY: &str = "sk-your-actual-openai-key-here";

/// Errors from the embedding service
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("invalid API key header: {0}")]
    InvalidApiKey(String),

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    #[error("expected {expected} dimensions, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Capability contract for turning text into a fixed-width vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Width of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Embeds `text`, surfacing any service failure
    async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embeds `text`, degrading to a zero vector on failure
    async fn embed(&self, text: &str) -> Vec<f32> {
        match self.try_embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("Embedding failed, using zero vector: {}", e);
                vec![0.0; self.dimension()]
            }
        }
    }
}

/// Returns zero vectors for every input
///
/// Selected when no API key is available. Documents embedded this way are
/// still stored but carry no search signal.
#[derive(Debug, Clone)]
pub struct ZeroEmbedder {
    dimension: usize,
}

impl ZeroEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for ZeroEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn try_embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(vec![0.0; self.dimension])
    }
}

/// Cuts `text` to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Filters out empty and placeholder keys
fn usable_key(raw: Option<String>) -> Option<String> {
    raw.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY)
}

/// Builds the embedder described by `config`
///
/// Reads the API key from the environment variable named in the config. A
/// missing or placeholder key, or a client that cannot be built, selects the
/// [`ZeroEmbedder`].
pub fn build_embedder(config: &EmbedderConfig) -> Arc<dyn Embedder> {
    let Some(api_key) = usable_key(std::env::var(&config.api_key_env).ok()) else {
        tracing::warn!(
            "{} not set or still the placeholder; embeddings will be zero vectors",
            config.api_key_env
        );
        return Arc::new(ZeroEmbedder::new(config.dimensions));
    };

    match OpenAiEmbedder::new(api_key, config) {
        Ok(embedder) => {
            tracing::info!("Embedding with model {}", config.model);
            Arc::new(embedder)
        }
        Err(e) => {
            tracing::error!("Failed to initialize embedding client: {}", e);
            Arc::new(ZeroEmbedder::new(config.dimensions))
        }
    }
}
