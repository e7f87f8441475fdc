//! flowgraph-rag: retrieval-augmented generation.
//!
//! Chunk documents, embed them into an in-memory vector collection with
//! local-directory persistence, retrieve by cosine similarity, and answer
//! questions grounded in retrieved context. A semantic query cache serves
//! repeated questions without re-generation, and an `axum` HTTP API (with a
//! streaming endpoint) exposes the pipeline as a service.

pub mod api;
pub mod chunker;
pub mod engine;
pub mod error;
pub mod semantic_cache;
pub mod store;

pub use chunker::{chunk_by_paragraphs, chunk_by_sections, chunk_by_sentences, SectionChunk};
pub use engine::RagEngine;
pub use error::{RagError, Result};
pub use semantic_cache::{SemanticCache, DEFAULT_SIMILARITY_THRESHOLD};
pub use store::{
    cosine_similarity, CollectionStats, DocumentChunk, ScoredChunk, VectorCollection,
};
