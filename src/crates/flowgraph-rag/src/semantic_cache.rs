//! Embedding-similarity query cache.
//!
//! Stores (query, embedding, result) triples; a lookup hits when some stored
//! embedding's cosine similarity to the probe meets the threshold. The
//! default threshold (0.92) is configuration carried over from operational
//! tuning, not a derived value.

use crate::store::cosine_similarity;

/// Default similarity threshold for a cache hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.92;

#[derive(Debug, Clone)]
struct CachedAnswer {
    query: String,
    embedding: Vec<f32>,
    result: String,
}

/// Cache of answered queries matched by embedding similarity.
#[derive(Debug)]
pub struct SemanticCache {
    threshold: f32,
    entries: Vec<CachedAnswer>,
}

impl Default for SemanticCache {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SemanticCache {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            entries: Vec::new(),
        }
    }

    /// Best match at or above the threshold, if any. Returns the cached
    /// result and the original query it was computed for.
    pub fn lookup(&self, embedding: &[f32]) -> Option<(&str, &str)> {
        let mut best: Option<(&CachedAnswer, f32)> = None;
        for entry in &self.entries {
            let score = cosine_similarity(embedding, &entry.embedding);
            if score >= self.threshold {
                match best {
                    Some((_, best_score)) if best_score >= score => {}
                    _ => best = Some((entry, score)),
                }
            }
        }
        best.map(|(entry, _)| (entry.result.as_str(), entry.query.as_str()))
    }

    /// Record an answered query.
    pub fn insert(&mut self, query: impl Into<String>, embedding: Vec<f32>, result: impl Into<String>) {
        self.entries.push(CachedAnswer {
            query: query.into(),
            embedding,
            result: result.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
