//! Text embedding providers.
//!
//! [`Embeddings`] is the seam between retrieval code and embedding backends.
//! [`OpenAiEmbeddings`] calls the remote `/embeddings` endpoint;
//! [`HashEmbeddings`] is a deterministic local fallback (feature hashing)
//! used by offline demos and tests that must not touch the network.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};

/// Embed texts into fixed-dimension vectors.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identifier of the underlying model, reported in store stats.
    fn model_name(&self) -> &str;
}

/// Remote embeddings via the OpenAI `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiEmbeddings {
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Http)?;
        Ok(Self { config, client })
    }

    /// Read `OPENAI_API_KEY` and build a client for the given model
    /// (e.g. `text-embedding-3-small`).
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1", model)?;
        Self::new(config)
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&EmbeddingsRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await
            .map_err(LlmError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::Authentication(error_text),
                429 => LlmError::RateLimitExceeded(error_text),
                _ => LlmError::Provider(format!("API error {status}: {error_text}")),
            });
        }

        let body: EmbeddingsResponse = response.json().await.map_err(LlmError::Http)?;
        if body.data.len() != texts.len() {
            return Err(LlmError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Deterministic local embeddings via token feature hashing.
///
/// Not semantically meaningful across unrelated texts, but identical texts
/// map to identical vectors and token overlap raises cosine similarity,
/// which is what cache and retrieval tests need.
#[derive(Debug, Clone)]
pub struct HashEmbeddings {
    dimension: usize,
}

impl Default for HashEmbeddings {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

impl HashEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embeddings for HashEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hash-embeddings"
    }
}
