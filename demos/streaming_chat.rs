//! Stream one reply and print it as it arrives.
//!
//! Run with:
//! ```bash
//! export STREAMCHAT_BASE_URL="http://localhost:8080"
//! cargo run --example streaming_chat -- "Tell me about Rust"
//! ```

use std::io::Write;

use streamchat::{AppendMode, ChatClient, ChatRequest, ClientOptions, FnSink};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let base_url = std::env::var("STREAMCHAT_BASE_URL")
        .unwrap_or_else(|_| streamchat::options::DEFAULT_BASE_URL.to_string());
    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello, please introduce yourself".to_string());

    let client = ChatClient::new(
        ClientOptions::new(base_url).with_append_mode(AppendMode::Spaced),
    )?;

    let mut sink = FnSink::new(
        |token: &str| {
            print!("{token}");
            // Flush stdout to show text immediately
            let _ = std::io::stdout().flush();
        },
        || println!("\n\n=== Stream Complete ==="),
        |error: &str| eprintln!("\n\nError: {error}"),
    );

    let state = client.send_message(ChatRequest::new(message), &mut sink).await?;

    if let Some(session_id) = state.session_id {
        println!("Session: {session_id}");
    }

    Ok(())
}
