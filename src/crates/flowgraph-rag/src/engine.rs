//! Retrieval + generation pipeline.
//!
//! `RagEngine` owns the vector collection, the embedder, the chat model, and
//! a semantic query cache. `search` is retrieval only; `query` retrieves,
//! builds a grounded prompt, and asks the model for an answer, consulting
//! the cache first.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use flowgraph_core::{ChatModel, ChatRequest, Message};
use flowgraph_llm::Embeddings;

use crate::error::Result;
use crate::semantic_cache::SemanticCache;
use crate::store::{CollectionStats, ScoredChunk, VectorCollection};

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the question using only the provided context. If the context does not contain the answer, say you don't know.";

/// Retrieval-augmented answering over one vector collection.
pub struct RagEngine {
    collection: RwLock<VectorCollection>,
    embedder: Arc<dyn Embeddings>,
    model: Arc<dyn ChatModel>,
    cache: RwLock<SemanticCache>,
}

impl RagEngine {
    pub fn new(
        collection: VectorCollection,
        embedder: Arc<dyn Embeddings>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            collection: RwLock::new(collection),
            embedder,
            model,
            cache: RwLock::new(SemanticCache::default()),
        }
    }

    /// Embed and index texts into the collection.
    pub async fn index(
        &self,
        texts: Vec<String>,
        metadata: Vec<std::collections::HashMap<String, String>>,
    ) -> Result<()> {
        let mut collection = self.collection.write().await;
        collection.add_texts(self.embedder.as_ref(), texts, metadata).await
    }

    /// Retrieve the `top_k` most similar chunks for `question`.
    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        VectorCollection::validate_query(question, top_k)?;
        let embeddings = self.embedder.embed(&[question.to_string()]).await?;
        let collection = self.collection.read().await;
        Ok(collection.search(&embeddings[0], top_k))
    }

    /// Answer `question` grounded in the `top_k` retrieved chunks. Answers
    /// for semantically equivalent questions are served from the cache.
    pub async fn query(&self, question: &str, top_k: usize) -> Result<String> {
        VectorCollection::validate_query(question, top_k)?;

        let embeddings = self.embedder.embed(&[question.to_string()]).await?;
        let query_embedding = &embeddings[0];

        if let Some((cached, original)) = self.cache.read().await.lookup(query_embedding) {
            debug!(original, "semantic cache hit");
            return Ok(cached.to_string());
        }

        let hits = {
            let collection = self.collection.read().await;
            collection.search(query_embedding, top_k)
        };

        let context = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("[{}] {}", i + 1, hit.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!("Context:\n{context}\n\nQuestion: {question}");
        let request = ChatRequest::new(vec![
            Message::system(ANSWER_SYSTEM_PROMPT),
            Message::human(prompt),
        ]);
        let response = self.model.chat(request).await?;
        let answer = response.content;

        info!(question, hits = hits.len(), "answered query");
        self.cache
            .write()
            .await
            .insert(question, query_embedding.clone(), answer.clone());
        Ok(answer)
    }

    /// Collection statistics.
    pub async fn stats(&self) -> CollectionStats {
        self.collection.read().await.stats()
    }

    /// Persist the collection to `dir`.
    pub async fn save(&self, dir: &std::path::Path) -> Result<()> {
        self.collection.read().await.save(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowgraph_core::ChatResponse;
    use flowgraph_llm::HashEmbeddings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Chat model that counts calls and echoes a fixed answer.
    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        async fn chat(&self, _request: ChatRequest) -> flowgraph_core::Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse::text("grounded answer"))
        }
    }

    async fn engine_with_docs() -> (Arc<RagEngine>, Arc<CountingModel>) {
        let embedder = Arc::new(HashEmbeddings::default());
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
        });
        let collection = VectorCollection::new("docs", embedder.model_name());
        let engine = Arc::new(RagEngine::new(collection, embedder, model.clone()));
        engine
            .index(
                vec![
                    "rust uses ownership for memory safety".to_string(),
                    "cargo is the rust package manager".to_string(),
                ],
                vec![],
            )
            .await
            .unwrap();
        (engine, model)
    }

    #[tokio::test]
    async fn query_hits_model_once_then_cache() {
        let (engine, model) = engine_with_docs().await;
        let first = engine.query("what is cargo", 2).await.unwrap();
        assert_eq!(first, "grounded answer");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        // Identical question embeds identically, so the cache serves it.
        let second = engine.query("what is cargo", 2).await.unwrap();
        assert_eq!(second, "grounded answer");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_validates_before_embedding() {
        let (engine, _) = engine_with_docs().await;
        assert!(engine.search("", 3).await.is_err());
        assert!(engine.search("ok", 0).await.is_err());
        assert!(engine.search("ok", 11).await.is_err());
    }

    #[tokio::test]
    async fn stats_reflect_indexed_chunks() {
        let (engine, _) = engine_with_docs().await;
        let stats = engine.stats().await;
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.embedding_model, "hash-embeddings");
    }
}
