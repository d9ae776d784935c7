//! Async adapter from a byte stream to decoded [`SseEvent`]s.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::client::ClientError;
use crate::sse::{SseEvent, SseParser};

/// Extension trait for `reqwest::Response` to decode its body as chat events.
///
/// # Example
/// ```ignore
/// use futures::StreamExt;
/// use streamchat::stream::SseResponseExt;
///
/// let response = http.post(url).json(&body).send().await?;
/// let mut events = response.sse_events();
/// while let Some(event) = events.next().await {
///     println!("{:?}", event?);
/// }
/// ```
pub trait SseResponseExt {
    fn sse_events(self) -> BoxStream<'static, Result<SseEvent, ClientError>>;
}

impl SseResponseExt for reqwest::Response {
    fn sse_events(self) -> BoxStream<'static, Result<SseEvent, ClientError>> {
        event_stream(self.bytes_stream())
    }
}

struct State<S> {
    bytes: S,
    parser: SseParser,
    ready: VecDeque<SseEvent>,
    done: bool,
}

/// Drive an [`SseParser`] over a stream of byte chunks.
///
/// The stream ends right after the first terminal event. If the bytes run out
/// first, a synthetic `Complete` is yielded. A transport error is yielded once
/// and ends the stream.
pub fn event_stream<S, E>(bytes: S) -> BoxStream<'static, Result<SseEvent, ClientError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let state = State {
        bytes: Box::pin(bytes),
        parser: SseParser::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                if event.is_terminal() {
                    state.ready.clear();
                    state.done = true;
                }
                tracing::debug!(kind = ?event.kind, "sse event");
                return Some((Ok(event), state));
            }

            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.ready.extend(state.parser.feed(&chunk));
                }
                Some(Err(e)) => {
                    state.done = true;
                    let err: ClientError = e.into();
                    tracing::warn!(error = %err, "stream read failed");
                    return Some((Err(err), state));
                }
                None => {
                    state.ready.extend(state.parser.finish());
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::EventKind;

    fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, ClientError>> {
        parts
            .iter()
            .copied()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect()
    }

    async fn collect(items: Vec<Result<Bytes, ClientError>>) -> Vec<Result<SseEvent, ClientError>> {
        event_stream(stream::iter(items)).collect().await
    }

    #[tokio::test]
    async fn test_events_across_chunks() {
        let events = collect(chunks(&[
            "data: {\"type\":\"session-id\",\"content\":\"s1\"}\ndata: {\"type\":\"tok",
            "en\",\"content\":\"Hi\"}\n",
            "data: there\n",
        ]))
        .await;

        let events: Vec<SseEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                SseEvent::session_id("s1"),
                SseEvent::token("Hi"),
                SseEvent::token("there"),
                SseEvent::complete(),
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_after_terminal_event() {
        let events = collect(chunks(&[
            "data: a\ndata: {\"type\":\"complete\",\"content\":\"\"}\ndata: b\n",
            "data: c\n",
        ]))
        .await;

        let events: Vec<SseEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events, vec![SseEvent::token("a"), SseEvent::complete()]);
    }

    #[tokio::test]
    async fn test_error_event_ends_stream() {
        let events = collect(chunks(&[
            "data: {\"type\":\"error\",\"content\":\"Error: quota\"}\n",
        ]))
        .await;

        assert_eq!(events.len(), 1);
        let event = events.into_iter().next().unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.content, "Error: quota");
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_once() {
        let mut items = chunks(&["data: a\n"]);
        items.push(Err(ClientError::StreamCancelled));
        items.extend(chunks(&["data: b\n"]));

        let events = collect(items).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap(), &SseEvent::token("a"));
        assert!(matches!(events[1], Err(ClientError::StreamCancelled)));
    }

    #[tokio::test]
    async fn test_empty_body_completes() {
        let events = collect(Vec::new()).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &SseEvent::complete());
    }
}
