//! # streamchat - Streaming chat API client
//!
//! A small client library for chat servers that stream their replies as
//! Server-Sent Events.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental SSE parsing that is independent of network chunk boundaries
//! - Literal-token fallback for plain-text `data:` payloads
//! - Optional re-insertion of word boundaries between sub-word tokens
//! - Session capture and follow-up lookup
//!
//! ## Architecture
//!
//! Bytes flow through two stages:
//!
//! 1. **[`sse::SseParser`]** frames lines and decodes them into [`SseEvent`]s
//! 2. **[`accumulator::ResponseState`]** folds events into the response text
//!    and drives a [`RenderSink`]
//!
//! [`ChatClient`] connects the two to the HTTP API.
//!
//! ## Example
//! ```no_run
//! use streamchat::{ChatClient, ChatRequest, ClientOptions, FnSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChatClient::new(ClientOptions::default())?;
//!
//!     let mut full_response = String::new();
//!     let mut sink = FnSink::new(
//!         |token: &str| full_response.push_str(token),
//!         || {},
//!         |error: &str| eprintln!("Error: {error}"),
//!     );
//!     client
//!         .send_message(ChatRequest::new("Hello!").with_scenario("coder"), &mut sink)
//!         .await?;
//!     drop(sink);
//!
//!     println!("{full_response}");
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod client;
pub mod http;
pub mod model;
pub mod options;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use accumulator::{AppendMode, FnSink, Outcome, RenderSink, ResponseState};
pub use client::{ChatClient, ClientError};
pub use model::{ChatRequest, SessionContent, SessionStatus};
pub use options::ClientOptions;
pub use sse::{EventKind, SseEvent, SseParser};
