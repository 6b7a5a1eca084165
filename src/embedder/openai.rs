//! OpenAI-compatible embeddings client

use crate::config::EmbedderConfig;
use crate::embedder::{truncate_chars, EmbedError, Embedder};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Async client for `POST {base_url}/embeddings`
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_chars: usize,
}

impl OpenAiEmbedder {
    /// Builds a client authenticated with `api_key`.
    pub fn new(api_key: String, config: &EmbedderConfig) -> Result<Self, EmbedError> {
        if api_key.trim().is_empty() {
            return Err(EmbedError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|e| EmbedError::InvalidApiKey(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedError::Request(e.to_string()))?;

        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimensions
    }

    async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let input = [truncate_chars(text, self.max_chars)];
        let request = EmbeddingRequest {
            model: &self.model,
            input: &input,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Decode(e.to_string()))?;

        let vector = parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .map(|entry| entry.embedding)
            .ok_or_else(|| EmbedError::Decode("response held no embeddings".to_string()))?;

        if vector.len() != self.dimensions {
            return Err(EmbedError::Dimension {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
