//! In-memory vector collection with local-directory persistence.
//!
//! Deliberately a list plus a cosine scan: collections here hold hundreds of
//! chunks, not millions, and an index would obscure the behavior. The
//! collection persists as one JSON file per collection name under a chosen
//! directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use flowgraph_llm::Embeddings;

use crate::error::{RagError, Result};

/// A stored document chunk: text, metadata, embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub embedding: Vec<f32>,
}

/// A retrieval hit: the chunk plus its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub score: f32,
}

/// Collection statistics reported by the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_chunks: usize,
    pub embedding_model: String,
}

/// Cosine similarity between two vectors. Zero for mismatched dimensions
/// or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Serialized form of a collection on disk.
#[derive(Serialize, Deserialize)]
struct PersistedCollection {
    embedding_model: String,
    chunks: Vec<DocumentChunk>,
}

/// An in-memory set of embedded chunks searchable by cosine similarity.
pub struct VectorCollection {
    name: String,
    embedding_model: String,
    chunks: Vec<DocumentChunk>,
}

impl VectorCollection {
    /// Create an empty collection. `embedding_model` is recorded for stats
    /// and must match the embedder used for both indexing and queries.
    pub fn new(name: impl Into<String>, embedding_model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            embedding_model: embedding_model.into(),
            chunks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embed `texts` and add them with the given metadata (parallel slices;
    /// metadata may be shorter, missing entries get empty metadata).
    pub async fn add_texts(
        &mut self,
        embedder: &dyn Embeddings,
        texts: Vec<String>,
        mut metadata: Vec<HashMap<String, String>>,
    ) -> Result<()> {
        if texts.is_empty() {
            return Ok(());
        }
        let embeddings = embedder.embed(&texts).await?;
        metadata.resize(texts.len(), HashMap::new());
        for ((text, embedding), metadata) in
            texts.into_iter().zip(embeddings).zip(metadata)
        {
            self.chunks.push(DocumentChunk {
                text,
                metadata,
                embedding,
            });
        }
        Ok(())
    }

    /// Top-k chunks by cosine similarity to `query_embedding`, scores
    /// non-increasing. Returns fewer than `top_k` only when the collection
    /// holds fewer chunks.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                score: cosine_similarity(query_embedding, &chunk.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored
    }

    /// Collection statistics.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            total_chunks: self.chunks.len(),
            embedding_model: self.embedding_model.clone(),
        }
    }

    fn file_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.json"))
    }

    /// Persist the collection as `<dir>/<name>.json`, creating `dir` if
    /// needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let persisted = PersistedCollection {
            embedding_model: self.embedding_model.clone(),
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_string(&persisted)?;
        std::fs::write(Self::file_path(dir, &self.name), json)?;
        Ok(())
    }

    /// Load a previously saved collection from `<dir>/<name>.json`.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(Self::file_path(dir, name))?;
        let persisted: PersistedCollection = serde_json::from_str(&raw)?;
        Ok(Self {
            name: name.to_string(),
            embedding_model: persisted.embedding_model,
            chunks: persisted.chunks,
        })
    }

    /// Load the collection if its file exists, otherwise create it empty.
    pub fn load_or_create(
        dir: &Path,
        name: &str,
        embedding_model: impl Into<String>,
    ) -> Result<Self> {
        if Self::file_path(dir, name).exists() {
            Self::load(dir, name)
        } else {
            Ok(Self::new(name, embedding_model))
        }
    }

    /// Reject queries the pipeline cannot serve: empty text or an
    /// out-of-range result count. Called before any embedding request.
    pub fn validate_query(question: &str, top_k: usize) -> Result<()> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".into()));
        }
        if !(1..=10).contains(&top_k) {
            return Err(RagError::InvalidInput(format!(
                "top_k must be between 1 and 10, got {top_k}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgraph_llm::HashEmbeddings;

    async fn sample_collection() -> (VectorCollection, HashEmbeddings) {
        let embedder = HashEmbeddings::default();
        let mut collection = VectorCollection::new("test", embedder.model_name());
        collection
            .add_texts(
                &embedder,
                vec![
                    "the rust borrow checker enforces ownership".to_string(),
                    "tokio provides an async runtime for rust".to_string(),
                    "gingerbread cookies are a holiday tradition".to_string(),
                ],
                vec![],
            )
            .await
            .unwrap();
        (collection, embedder)
    }

    #[tokio::test]
    async fn search_returns_top_k_non_increasing() {
        let (collection, embedder) = sample_collection().await;
        let query = embedder
            .embed(&["rust borrow checker".to_string()])
            .await
            .unwrap();
        let hits = collection.search(&query[0], 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].text.contains("borrow checker"));
    }

    #[tokio::test]
    async fn search_caps_at_collection_size() {
        let (collection, embedder) = sample_collection().await;
        let query = embedder.embed(&["anything".to_string()]).await.unwrap();
        let hits = collection.search(&query[0], 10);
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn save_load_round_trips() {
        let (collection, embedder) = sample_collection().await;
        let dir = std::env::temp_dir().join(format!("flowgraph-test-{}", std::process::id()));
        collection.save(&dir).unwrap();

        let loaded = VectorCollection::load(&dir, "test").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.stats().embedding_model, "hash-embeddings");

        let query = embedder
            .embed(&["async runtime".to_string()])
            .await
            .unwrap();
        let hits = loaded.search(&query[0], 1);
        assert!(hits[0].text.contains("tokio"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn validate_query_rejects_bad_input() {
        assert!(VectorCollection::validate_query("", 3).is_err());
        assert!(VectorCollection::validate_query("   ", 3).is_err());
        assert!(VectorCollection::validate_query("ok", 0).is_err());
        assert!(VectorCollection::validate_query("ok", 11).is_err());
        assert!(VectorCollection::validate_query("ok", 10).is_ok());
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
