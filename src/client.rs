//! Chat API client and error types.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::accumulator::{RenderSink, ResponseState};
use crate::http::{build_http_client, with_extra_headers};
use crate::model::{
    Ack, ChatReply, ChatRequest, CurrentScenario, ScenarioTemplate, SessionContent,
    VariablesChatRequest,
};
use crate::options::ClientOptions;
use crate::sse::{EventKind, SseEvent};
use crate::stream::SseResponseExt;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}")]
    Status { status: StatusCode, body: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream cancelled")]
    StreamCancelled,

    #[error("No session has been established")]
    NoSession,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Client for the streaming chat API.
///
/// The session identifier announced by the last streamed request is kept so
/// the conversation can be looked up afterwards. It is recorded as soon as the
/// event is read, whether through [`send_message`](Self::send_message) or by
/// polling [`stream_chat`](Self::stream_chat) directly.
///
/// # Example
/// ```no_run
/// use streamchat::accumulator::{AppendMode, FnSink};
/// use streamchat::client::ChatClient;
/// use streamchat::model::ChatRequest;
/// use streamchat::options::ClientOptions;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ChatClient::new(
///         ClientOptions::new("http://localhost:8080").with_append_mode(AppendMode::Spaced),
///     )?;
///
///     let mut sink = FnSink::new(
///         |token: &str| print!("{token}"),
///         || println!(),
///         |error: &str| eprintln!("\n\nError: {error}"),
///     );
///     let state = client.send_message(ChatRequest::new("Hello!"), &mut sink).await?;
///
///     if state.session_id.is_some() {
///         println!("{:?}", client.current_session_content().await?);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ChatClient {
    options: ClientOptions,
    http: reqwest::Client,
    session_id: Arc<RwLock<Option<String>>>,
}

impl ChatClient {
    /// Create a client, building the HTTP client from the options.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self::with_http_client(options, http))
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http_client(options: ClientOptions, http: reqwest::Client) -> Self {
        Self {
            options,
            http,
            session_id: Arc::new(RwLock::new(None)),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Session identifier announced by the most recent streamed request.
    pub async fn current_session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// Open a streaming chat request and return its decoded events.
    ///
    /// A non-success status fails before any event is produced.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<SseEvent, ClientError>>, ClientError> {
        let url = self.url("/api/chat/stream")?;
        tracing::debug!(%url, scenario = ?request.scenario, "opening chat stream");

        let req = self
            .http
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        let req = with_extra_headers(req, &self.options);

        let response = check_status(req.json(request).send().await?).await?;

        let store = Arc::clone(&self.session_id);
        let events = response.sse_events().then(move |item| {
            let store = Arc::clone(&store);
            async move {
                let announced = match &item {
                    Ok(event) if event.kind == EventKind::SessionId => Some(event.content.clone()),
                    _ => None,
                };
                if let Some(session_id) = announced {
                    *store.write().await = Some(session_id);
                }
                item
            }
        });
        Ok(events.boxed())
    }

    /// Send a message and render the streamed reply into `sink`.
    ///
    /// Transport failures are reported to `sink.on_error` and returned as
    /// `Err`. Error events from the server only mark the returned state.
    pub async fn send_message<S>(
        &self,
        request: ChatRequest,
        sink: &mut S,
    ) -> Result<ResponseState, ClientError>
    where
        S: RenderSink + ?Sized,
    {
        self.send_message_with_cancel(request, sink, &CancellationToken::new())
            .await
    }

    /// Like [`send_message`](Self::send_message), stopping as soon as
    /// `cancel` fires. No callback is invoked after cancellation.
    pub async fn send_message_with_cancel<S>(
        &self,
        request: ChatRequest,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<ResponseState, ClientError>
    where
        S: RenderSink + ?Sized,
    {
        let mut state = ResponseState::new(self.options.append_mode);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::StreamCancelled),
            opened = self.stream_chat(&request) => opened,
        };
        let events = match opened {
            Ok(events) => events,
            Err(e) => {
                state.fail(e.to_string(), sink);
                return Err(e);
            }
        };

        consume(events, state, sink, cancel).await
    }

    /// Look up the content the server holds for a session.
    pub async fn session_content(&self, session_id: &str) -> Result<SessionContent, ClientError> {
        let mut url = self.url("/api/chat/stream")?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Config(format!(
                    "base URL cannot hold a path: {}",
                    self.options.base_url
                ))
            })?
            .push(session_id);
        self.get_json(url).await
    }

    /// Look up the session announced by the most recent streamed request.
    pub async fn current_session_content(&self) -> Result<SessionContent, ClientError> {
        let session_id = self
            .current_session_id()
            .await
            .ok_or(ClientError::NoSession)?;
        self.session_content(&session_id).await
    }

    /// List the scenario names the server offers.
    pub async fn scenarios(&self) -> Result<Vec<String>, ClientError> {
        self.get_json(self.url("/api/chat/scenarios")?).await
    }

    /// Non-streaming chat.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let reply: ChatReply = self.post_json(self.url("/api/chat")?, request).await?;
        Ok(reply.response)
    }

    /// Non-streaming chat with prompt template variables.
    pub async fn chat_with_variables(
        &self,
        request: &VariablesChatRequest,
    ) -> Result<String, ClientError> {
        let reply: ChatReply = self.post_json(self.url("/api/chat/with-variables")?, request).await?;
        Ok(reply.response)
    }

    /// Name of the scenario currently selected on the server.
    pub async fn current_scenario(&self) -> Result<String, ClientError> {
        let current: CurrentScenario = self.get_json(self.url("/api/chat/current-scenario")?).await?;
        Ok(current.scenario)
    }

    /// Register a scenario with its prompt template.
    pub async fn add_scenario(&self, template: &ScenarioTemplate) -> Result<String, ClientError> {
        let ack: Ack = self.post_json(self.url("/api/chat/add-scenario")?, template).await?;
        Ok(ack.message)
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        let endpoint = self.options.endpoint(path);
        Url::parse(&endpoint).map_err(|e| ClientError::Config(format!("invalid URL {endpoint}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        tracing::debug!(%url, "GET");
        let req = with_extra_headers(self.http.get(url), &self.options);
        decode_json(req.send().await?).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(%url, "POST");
        let req = with_extra_headers(self.http.post(url), &self.options);
        decode_json(req.json(body).send().await?).await
    }
}

/// Read events into `state` until the stream ends, fails or `cancel` fires.
async fn consume<S>(
    mut events: BoxStream<'static, Result<SseEvent, ClientError>>,
    mut state: ResponseState,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<ResponseState, ClientError>
where
    S: RenderSink + ?Sized,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("chat stream cancelled");
                return Err(ClientError::StreamCancelled);
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => state.apply(event, sink),
            Some(Err(e)) => {
                state.fail(e.to_string(), sink);
                return Err(e);
            }
            None => return Ok(state),
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, "chat API returned an error status");
    Err(ClientError::Status { status, body })
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let body = check_status(response).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    /// Records callbacks and cancels once a given token has been rendered.
    struct CancellingSink {
        tokens: Vec<String>,
        completions: usize,
        errors: Vec<String>,
        cancel_after: &'static str,
        cancel: CancellationToken,
    }

    impl CancellingSink {
        fn new(cancel_after: &'static str, cancel: CancellationToken) -> Self {
            Self {
                tokens: Vec::new(),
                completions: 0,
                errors: Vec::new(),
                cancel_after,
                cancel,
            }
        }
    }

    impl RenderSink for CancellingSink {
        fn on_token(&mut self, fragment: &str) {
            self.tokens.push(fragment.to_string());
            if fragment == self.cancel_after {
                self.cancel.cancel();
            }
        }

        fn on_complete(&mut self) {
            self.completions += 1;
        }

        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    fn events(
        items: Vec<Result<SseEvent, ClientError>>,
    ) -> BoxStream<'static, Result<SseEvent, ClientError>> {
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_stops_callbacks() {
        let cancel = CancellationToken::new();
        let mut sink = CancellingSink::new("lo", cancel.clone());

        let result = consume(
            events(vec![
                Ok(SseEvent::token("Hel")),
                Ok(SseEvent::token("lo")),
                Ok(SseEvent::token(" late")),
                Ok(SseEvent::complete()),
            ]),
            ResponseState::default(),
            &mut sink,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(ClientError::StreamCancelled)));
        assert_eq!(sink.tokens, vec!["Hel", "lo"]);
        assert_eq!(sink.completions, 0);
        assert!(sink.errors.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_mid_stream_reported_once() {
        let read_error = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let cancel = CancellationToken::new();
        let mut sink = CancellingSink::new("", cancel.clone());

        let result = consume(
            events(vec![
                Ok(SseEvent::token("par")),
                Err(ClientError::Http(read_error)),
                Ok(SseEvent::token("tial")),
                Ok(SseEvent::complete()),
            ]),
            ResponseState::default(),
            &mut sink,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(ClientError::Http(_))));
        assert_eq!(sink.tokens, vec!["par"]);
        assert_eq!(sink.errors.len(), 1);
        assert!(sink.errors[0].starts_with("HTTP error: "));
        assert_eq!(sink.completions, 0);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_stream_end_returns_state() {
        let cancel = CancellationToken::new();
        let mut sink = CancellingSink::new("", cancel.clone());

        let state = consume(
            events(vec![Ok(SseEvent::token("done")), Ok(SseEvent::complete())]),
            ResponseState::default(),
            &mut sink,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(state.full_response, "done");
        assert_eq!(sink.completions, 1);
    }

    #[test]
    fn test_status_error_message() {
        let err = ClientError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_current_session_content_without_session() {
        let client = ChatClient::new(ClientOptions::default()).unwrap();
        assert!(client.current_session_id().await.is_none());
        assert!(matches!(
            client.current_session_content().await,
            Err(ClientError::NoSession)
        ));
    }
}
