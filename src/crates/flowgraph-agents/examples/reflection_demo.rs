//! Refine-loop demo: generate, critique, refine until approved or capped.
//!
//! Requires `OPENAI_API_KEY`. Runs two canned tasks, then reads tasks from
//! stdin until "exit" or "quit".

use std::io::{BufRead, Write};
use std::sync::Arc;

use flowgraph_agents::{run_reflection, ReflectionConfig};
use flowgraph_llm::{OpenAiClient, RateLimiter};

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
    let graph = ReflectionConfig::new(model.clone(), model)
        .with_max_iterations(3)
        .build()?;

    for task in [
        "Explain Rust ownership in simple terms",
        "Write a short paragraph on why tests matter",
    ] {
        println!("\n=== Task: {task}");
        let output = run_reflection(&graph, task).await?;
        println!("{output}");
    }

    println!("\nEnter a task (exit/quit to stop):");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if matches!(task, "exit" | "quit") {
            break;
        }
        match run_reflection(&graph, task).await {
            Ok(output) => println!("{output}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
