//! HTTP client construction and request helpers.

use reqwest::{Client, RequestBuilder};

use crate::client::ClientError;
use crate::options::ClientOptions;

/// Build a configured HTTP client from client options.
///
/// This applies the timeout and proxy settings.
pub fn build_http_client(options: &ClientOptions) -> Result<Client, ClientError> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Config(format!("invalid proxy {proxy_url}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Attach the headers configured in `options.extra_headers`.
///
/// Configured headers are appended after the ones already on the request, so a
/// header such as `Accept` set by the caller is kept alongside them.
pub fn with_extra_headers(request: RequestBuilder, options: &ClientOptions) -> RequestBuilder {
    options
        .extra_headers
        .iter()
        .flatten()
        .fold(request, |request, (name, value)| request.header(name, value))
}
