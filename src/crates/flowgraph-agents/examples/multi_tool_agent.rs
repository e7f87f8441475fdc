//! Multi-tool assistant demo: weather, dictionary, web search, and document
//! retrieval behind one conversational loop with session memory.
//!
//! Requires `OPENAI_API_KEY`. Runs canned questions, then chats on stdin
//! until "exit" or "quit".

use std::io::{BufRead, Write};
use std::sync::Arc;

use flowgraph_agents::{AssistantConfig, ToolKit};
use flowgraph_core::InMemoryStore;
use flowgraph_llm::{Embeddings, HashEmbeddings, OpenAiClient, RateLimiter};
use flowgraph_rag::{RagEngine, VectorCollection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let model = Arc::new(
        OpenAiClient::from_env("gpt-4o-mini")?
            .with_rate_limiter(Arc::new(RateLimiter::per_minute(30))),
    );

    // Local embeddings keep the demo self-contained.
    let embedder = Arc::new(HashEmbeddings::default());
    let collection = VectorCollection::new("notes", embedder.model_name());
    let engine = Arc::new(RagEngine::new(collection, embedder, model.clone()));
    engine
        .index(
            vec![
                "The team standup is at 9:30 on weekdays.".to_string(),
                "Deploy windows are Tuesday and Thursday afternoons.".to_string(),
            ],
            vec![],
        )
        .await?;

    let toolkit = Arc::new(ToolKit::new().with_retrieval(engine));
    let assistant = AssistantConfig::new(model, toolkit, Arc::new(InMemoryStore::new())).build()?;

    for question in [
        "What's the weather in Tokyo?",
        "Define the word serendipity",
        "When are the deploy windows?",
    ] {
        println!("\n>>> {question}");
        let (answer, invocations) = assistant.reply_stateless(question).await?;
        println!("[tools: {invocations:?}]");
        println!("{answer}");
    }

    println!("\nChat (exit/quit to stop):");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }
        match assistant.reply("demo", input).await {
            Ok(answer) => println!("{answer}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
