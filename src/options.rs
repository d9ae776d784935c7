//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::accumulator::AppendMode;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Options for [`ChatClient`](crate::client::ChatClient).
///
/// # Example
/// ```rust
/// use streamchat::accumulator::AppendMode;
/// use streamchat::options::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::new("http://chat.internal:8080")
///     .with_timeout(Duration::from_secs(1800))
///     .with_append_mode(AppendMode::Spaced);
/// assert_eq!(options.base_url, "http://chat.internal:8080");
/// ```
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server root, without the `/api/chat` path
    pub base_url: String,

    /// Request timeout. Applies to the whole streamed response.
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,

    /// How streamed tokens are appended to the response text
    pub append_mode: AppendMode,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientOptions {
    /// Create options for the given base URL. A trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
            proxy: None,
            extra_headers: None,
            append_mode: AppendMode::default(),
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set how tokens are appended.
    pub fn with_append_mode(mut self, append_mode: AppendMode) -> Self {
        self.append_mode = append_mode;
        self
    }

    /// Join an API path onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.append_mode, AppendMode::Raw);
        assert!(options.timeout.is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let options = ClientOptions::new("http://example.com/");
        assert_eq!(
            options.endpoint("/api/chat/scenarios"),
            "http://example.com/api/chat/scenarios"
        );
    }

    #[test]
    fn test_with_header_accumulates() {
        let options = ClientOptions::default()
            .with_header("X-Trace", "1")
            .with_header("X-Tenant", "blue");
        let headers = options.extra_headers.unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["X-Tenant"], "blue");
    }
}
