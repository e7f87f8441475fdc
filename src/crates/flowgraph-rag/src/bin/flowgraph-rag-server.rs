//! RAG HTTP server.
//!
//! Loads documents from a directory, indexes them into a persisted vector
//! collection, and serves the query/search API. Requires `OPENAI_API_KEY`;
//! a missing key aborts startup.

use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use flowgraph_llm::{Embeddings, OpenAiClient, OpenAiEmbeddings, RateLimiter};
use flowgraph_rag::{api, chunk_by_sections, RagEngine, VectorCollection};

#[derive(Parser, Debug)]
#[command(name = "flowgraph-rag-server", about = "Retrieval-augmented generation API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Directory of markdown/text documents to index at startup.
    #[arg(long, env = "DOCS_DIR")]
    docs_dir: Option<PathBuf>,

    /// Directory where the vector collection is persisted.
    #[arg(long, env = "PERSIST_DIR", default_value = "./data")]
    persist_dir: PathBuf,

    /// Collection name.
    #[arg(long, default_value = "documents")]
    collection: String,

    /// Chat model identifier.
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o-mini")]
    chat_model: String,

    /// Embedding model identifier.
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Maximum chat completions per minute.
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value_t = 60)]
    rate_limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let model = OpenAiClient::from_env(&args.chat_model)
        .context("chat model setup failed")?
        .with_rate_limiter(Arc::new(RateLimiter::per_minute(args.rate_limit)));
    let embedder =
        OpenAiEmbeddings::from_env(&args.embedding_model).context("embeddings setup failed")?;

    let collection = VectorCollection::load_or_create(
        &args.persist_dir,
        &args.collection,
        embedder.model_name(),
    )?;
    info!(
        collection = %args.collection,
        chunks = collection.len(),
        "collection ready"
    );

    let engine = Arc::new(RagEngine::new(collection, Arc::new(embedder), Arc::new(model)));

    if let Some(docs_dir) = &args.docs_dir {
        index_directory(&engine, docs_dir).await?;
        engine.save(&args.persist_dir).await?;
    }

    let router = api::create_router(engine);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Index every `.md` and `.txt` file under `dir` as section chunks.
async fn index_directory(engine: &RagEngine, dir: &PathBuf) -> anyhow::Result<()> {
    let mut texts = Vec::new();
    let mut metadata = Vec::new();

    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_doc = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("md") | Some("txt")
        );
        if !is_doc {
            continue;
        }
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let content = std::fs::read_to_string(&path)?;
        for chunk in chunk_by_sections(&content, 4, 1) {
            let mut meta = HashMap::new();
            meta.insert("source".to_string(), source.clone());
            meta.insert("section".to_string(), chunk.section);
            texts.push(chunk.text);
            metadata.push(meta);
        }
    }

    info!(chunks = texts.len(), dir = %dir.display(), "indexing documents");
    engine.index(texts, metadata).await?;
    Ok(())
}
