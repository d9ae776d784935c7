//! Server-Sent Events (SSE) line framing and event decoding.
//!
//! The chat endpoint streams lines of the form:
//! ```text
//! data: {"type": "session-id", "content": "3f2c..."}
//! data: {"type": "token", "content": "Hel"}
//! data: {"type": "token", "content": "lo"}
//!
//! data: {"type": "complete", "content": "Stream completed"}
//! ```
//!
//! A `data:` payload that is not a structured record is delivered as a
//! literal token, so a plain-text stream can be served through the same pipe.

use serde_json::Value;

const DATA_PREFIX: &str = "data: ";

/// Kind of a decoded stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Token,
    SessionId,
    Complete,
    Error,
}

impl EventKind {
    /// Map a wire `type` field to an event kind.
    ///
    /// # Example
    /// ```
    /// use streamchat::sse::EventKind;
    ///
    /// assert_eq!(EventKind::from_wire("session-id"), Some(EventKind::SessionId));
    /// assert_eq!(EventKind::from_wire("foo"), None);
    /// ```
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "token" => Some(EventKind::Token),
            "session-id" => Some(EventKind::SessionId),
            "complete" => Some(EventKind::Complete),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }

    /// `Complete` and `Error` end a stream.
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Error)
    }
}

/// A single decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub kind: EventKind,
    pub content: String,
}

impl SseEvent {
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn token(content: impl Into<String>) -> Self {
        Self::new(EventKind::Token, content)
    }

    pub fn session_id(content: impl Into<String>) -> Self {
        Self::new(EventKind::SessionId, content)
    }

    pub fn complete() -> Self {
        Self::new(EventKind::Complete, String::new())
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(EventKind::Error, content)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

/// Incremental SSE parser.
///
/// Bytes are buffered until a `\n` arrives, so chunks may be split anywhere,
/// including inside a multi-byte UTF-8 sequence. Lines are decoded only once
/// they are complete.
///
/// # Example
/// ```
/// use streamchat::sse::{SseEvent, SseParser};
///
/// let mut parser = SseParser::new();
/// assert!(parser.feed("data: {\"type\":\"token\",\"con").is_empty());
/// assert_eq!(parser.feed("tent\":\"hi\"}\n"), vec![SseEvent::token("hi")]);
/// assert_eq!(parser.finish(), Some(SseEvent::complete()));
/// ```
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    terminated: bool,
    finished: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the events of every line it completes.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk.as_ref());

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let remainder = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, remainder);

        let mut events = Vec::new();
        for raw_line in complete.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(raw_line);
            if let Some(event) = decode_line(&line) {
                if event.is_terminal() {
                    self.terminated = true;
                }
                events.push(event);
            }
        }
        events
    }

    /// Signal end of stream.
    ///
    /// Yields a synthetic `Complete` unless a terminal event was already seen.
    /// An unterminated trailing line is discarded.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;

        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "discarding unterminated trailing line"
            );
            self.buffer.clear();
        }

        if self.terminated {
            None
        } else {
            self.terminated = true;
            Some(SseEvent::complete())
        }
    }

    /// Whether a `Complete` or `Error` event has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Bytes waiting for their line terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

/// Decode one complete line (without its `\n`).
///
/// # Example
/// ```
/// use streamchat::sse::{decode_line, SseEvent};
///
/// assert_eq!(decode_line("data: hello world"), Some(SseEvent::token("hello world")));
/// assert_eq!(decode_line(": keep-alive"), None);
/// assert_eq!(decode_line("   "), None);
/// ```
pub fn decode_line(line: &str) -> Option<SseEvent> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }
    line.strip_prefix(DATA_PREFIX).and_then(decode_payload)
}

/// Decode a `data:` payload.
///
/// Payloads that are not JSON become literal tokens, as do JSON scalars and
/// arrays. A JSON object is a framed event: one whose `type` is missing or
/// unknown is dropped.
///
/// # Example
/// ```
/// use streamchat::sse::{decode_payload, SseEvent};
///
/// assert_eq!(decode_payload(r#"{"type":"complete","content":7}"#),
///     Some(SseEvent::new(streamchat::sse::EventKind::Complete, "7")));
/// assert_eq!(decode_payload(r#"{"content":"orphan"}"#), None);
/// assert_eq!(decode_payload("plain"), Some(SseEvent::token("plain")));
/// ```
pub fn decode_payload(payload: &str) -> Option<SseEvent> {
    let record = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(record)) => record,
        Ok(_) | Err(_) => return Some(SseEvent::token(payload)),
    };

    let Some(kind) = record.get("type").and_then(Value::as_str) else {
        tracing::trace!("dropping record without a string type");
        return None;
    };
    let Some(kind) = EventKind::from_wire(kind) else {
        tracing::trace!(kind, "dropping event of unknown type");
        return None;
    };

    let content = match record.get("content") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    Some(SseEvent::new(kind, content))
}
