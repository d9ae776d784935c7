//! Token accumulation and rendering callbacks.
//!
//! [`ResponseState`] owns everything a single streaming request builds up:
//! the response text, the session identifier and the terminal outcome. Events
//! are applied to it one by one and forwarded to a [`RenderSink`].

use std::borrow::Cow;

use crate::sse::{EventKind, SseEvent};

/// Receiver of rendered output.
pub trait RenderSink {
    /// A token fragment, already spaced when the spaced append path is used.
    fn on_token(&mut self, fragment: &str);

    /// The stream completed. Called at most once per request.
    fn on_complete(&mut self);

    /// The stream failed. Called at most once per request.
    fn on_error(&mut self, message: &str);
}

/// Sink built from three closures.
///
/// # Example
/// ```
/// use streamchat::accumulator::{FnSink, RenderSink};
///
/// let mut text = String::new();
/// let mut sink = FnSink::new(|t: &str| text.push_str(t), || {}, |_: &str| {});
/// sink.on_token("hi");
/// drop(sink);
/// assert_eq!(text, "hi");
/// ```
pub struct FnSink<T, C, E> {
    on_token: T,
    on_complete: C,
    on_error: E,
}

impl<T, C, E> FnSink<T, C, E>
where
    T: FnMut(&str),
    C: FnMut(),
    E: FnMut(&str),
{
    pub fn new(on_token: T, on_complete: C, on_error: E) -> Self {
        Self {
            on_token,
            on_complete,
            on_error,
        }
    }
}

impl<T, C, E> RenderSink for FnSink<T, C, E>
where
    T: FnMut(&str),
    C: FnMut(),
    E: FnMut(&str),
{
    fn on_token(&mut self, fragment: &str) {
        (self.on_token)(fragment)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }

    fn on_error(&mut self, message: &str) {
        (self.on_error)(message)
    }
}

/// Sink that ignores everything. Useful when only the final state matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn on_token(&mut self, _fragment: &str) {}
    fn on_complete(&mut self) {}
    fn on_error(&mut self, _message: &str) {}
}

/// How token fragments are appended to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendMode {
    /// Fragments are appended verbatim.
    #[default]
    Raw,
    /// Word boundaries are re-inserted with [`normalize_spacing`].
    Spaced,
}

/// Terminal outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Pending,
    Completed,
    Errored(String),
}

/// Accumulated state of one streaming request.
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    pub full_response: String,
    pub session_id: Option<String>,
    pub outcome: Outcome,
    mode: AppendMode,
}

impl ResponseState {
    pub fn new(mode: AppendMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> AppendMode {
        self.mode
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    /// Apply one event. Events arriving after a terminal outcome are ignored.
    pub fn apply<S: RenderSink + ?Sized>(&mut self, event: SseEvent, sink: &mut S) {
        if self.is_terminal() {
            tracing::trace!(kind = ?event.kind, "ignoring event after terminal outcome");
            return;
        }

        match event.kind {
            EventKind::Token => {
                let fragment = match self.mode {
                    AppendMode::Raw => Cow::Borrowed(event.content.as_str()),
                    AppendMode::Spaced => normalize_spacing(&self.full_response, &event.content),
                };
                self.full_response.push_str(&fragment);
                sink.on_token(&fragment);
            }
            EventKind::SessionId => {
                tracing::debug!(session_id = %event.content, "session established");
                self.session_id = Some(event.content);
            }
            EventKind::Complete => {
                self.outcome = Outcome::Completed;
                sink.on_complete();
            }
            EventKind::Error => self.fail(event.content, sink),
        }
    }

    /// Record a failure, delivering it to the sink unless already terminal.
    pub fn fail<S: RenderSink + ?Sized>(&mut self, message: impl Into<String>, sink: &mut S) {
        if self.is_terminal() {
            return;
        }
        let message = message.into();
        sink.on_error(&message);
        self.outcome = Outcome::Errored(message);
    }
}

/// Re-insert a word boundary between concatenated sub-word tokens.
///
/// `fragment` gets a single leading space only when `current` is non-empty,
/// doesn't already end in a space or newline, ends in an ASCII letter, digit
/// or one of `,.!?;:`, and `fragment` starts with an ASCII letter.
///
/// # Example
/// ```
/// use streamchat::accumulator::normalize_spacing;
///
/// assert_eq!(normalize_spacing("Hi.", "there"), " there");
/// assert_eq!(normalize_spacing("Hi ", "there"), "there");
/// assert_eq!(normalize_spacing("你好", "there"), "there");
/// ```
pub fn normalize_spacing<'a>(current: &str, fragment: &'a str) -> Cow<'a, str> {
    let Some(last) = current.chars().next_back() else {
        return Cow::Borrowed(fragment);
    };
    let starts_with_letter = fragment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    let boundary_before = last.is_ascii_alphanumeric() || ",.!?;:".contains(last);

    if starts_with_letter && last != ' ' && last != '\n' && boundary_before {
        Cow::Owned(format!(" {fragment}"))
    } else {
        Cow::Borrowed(fragment)
    }
}
