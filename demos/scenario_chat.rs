//! Chat inside the first available scenario, then fetch the stored session.
//!
//! Run with:
//! ```bash
//! export STREAMCHAT_BASE_URL="http://localhost:8080"
//! cargo run --example scenario_chat
//! ```

use streamchat::{ChatClient, ChatRequest, ClientOptions, FnSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let base_url = std::env::var("STREAMCHAT_BASE_URL")
        .unwrap_or_else(|_| streamchat::options::DEFAULT_BASE_URL.to_string());
    let client = ChatClient::new(ClientOptions::new(base_url))?;

    let scenarios = client.scenarios().await?;
    println!("Available scenarios: {scenarios:?}");

    let Some(scenario) = scenarios.first() else {
        println!("No scenarios configured");
        return Ok(());
    };
    println!("Using scenario: {scenario}");

    let mut full_response = String::new();
    let mut sink = FnSink::new(
        |token: &str| {
            full_response.push_str(token);
            println!("Token: {token:?}");
        },
        || {},
        |error: &str| eprintln!("Error: {error}"),
    );
    let request = ChatRequest::new("Please help me with a task").with_scenario(scenario.as_str());
    client.send_message(request, &mut sink).await?;
    drop(sink);

    println!("Full response: {full_response}");

    match client.current_session_content().await {
        Ok(content) if content.is_found() => println!("Session content: {}", content.content),
        Ok(_) => println!("Session no longer available"),
        Err(e) => eprintln!("Session lookup failed: {e}"),
    }

    Ok(())
}
