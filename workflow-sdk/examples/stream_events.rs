//! Stream a run and print its events.
//!
//! ```bash
//! WORKFLOW_API_URL=http://localhost:8123 \
//!   cargo run --example stream_events -- <thread_id> <assistant_id>
//! ```
//!
//! Press Ctrl-C to cancel the stream.

use serde_json::json;
use tracing_subscriber::EnvFilter;
use workflow_sdk::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let thread_id = args.next().unwrap_or_else(|| "demo-thread".to_string());
    let assistant_id = args.next().unwrap_or_else(|| "agent".to_string());

    let client = WorkflowClient::from_env()?;
    client.check_connection().await?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let request = StreamRequest::post(
        format!("/threads/{thread_id}/runs/stream"),
        json!({
            "assistant_id": assistant_id,
            "input": {"messages": [{"role": "user", "content": "Hello!"}]},
            "stream_mode": ["values"],
        }),
    )
    .cancel_with(cancel);

    let mut stream = client.stream(request).await?;
    let mut count = 0;
    while let Some(event) = stream.recv().await {
        count += 1;
        println!("[{}] {}", event.event, event.data);
        if !event.metadata.is_empty() {
            println!("    metadata: {}", event.metadata);
        }
    }

    match stream.error() {
        Some(err) if err.is_cancelled() => println!("Cancelled after {count} events"),
        Some(err) => return Err(err.into()),
        None => println!("Done: {count} events"),
    }

    Ok(())
}
