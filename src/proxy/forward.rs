//! Single-attempt outbound forwarding with redirect following.
//!
//! The proxy follows upstream redirects itself instead of relaying a 3xx
//! to the caller: 301/302/303 demote non-GET/HEAD methods to GET and drop
//! the body, 307/308 replay method and body unchanged. One forwarding
//! attempt per inbound request — no retries, no proxy-imposed timeout.

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;

use crate::server::HttpClient;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid target URL: {0}")]
    InvalidUrl(String),

    #[error("request build failed: {0}")]
    RequestBuild(#[from] axum::http::Error),

    #[error("{0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("too many redirects (limit {MAX_REDIRECTS})")]
    TooManyRedirects,
}

/// Issue the outbound request and follow redirects up to [`MAX_REDIRECTS`].
///
/// `headers` must already be scrubbed and stripped of `Host`; the current
/// hop's `Host` is set here so it tracks redirect targets. On a
/// cross-host redirect, credential headers are dropped before replaying.
pub async fn forward(
    client: &HttpClient,
    mut method: Method,
    mut url: url::Url,
    mut headers: HeaderMap,
    mut body: Bytes,
) -> Result<hyper::Response<Incoming>, ForwardError> {
    let mut hops = 0;

    loop {
        set_host_header(&mut headers, &url);

        let mut builder = hyper::Request::builder()
            .method(method.clone())
            .uri(url.as_str());
        for (key, value) in &headers {
            builder = builder.header(key, value);
        }
        let request = builder.body(Full::new(body.clone()))?;

        let response = client.request(request).await?;

        if !response.status().is_redirection() {
            return Ok(response);
        }

        let Some(location) = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            // Redirect without a usable Location is relayed as-is
            return Ok(response);
        };

        if hops >= MAX_REDIRECTS {
            return Err(ForwardError::TooManyRedirects);
        }
        hops += 1;

        let next = url
            .join(location)
            .map_err(|e| ForwardError::InvalidUrl(e.to_string()))?;

        let status = response.status();
        if (status == StatusCode::SEE_OTHER && method != Method::HEAD)
            || ((status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND)
                && method == Method::POST)
        {
            method = Method::GET;
            body = Bytes::new();
            headers.remove(header::CONTENT_TYPE);
        }

        if next.host_str() != url.host_str() {
            headers.remove(header::AUTHORIZATION);
            headers.remove(header::COOKIE);
        }

        tracing::debug!(status = %status, next = %next, "following upstream redirect");
        url = next;
    }
}

fn set_host_header(headers: &mut HeaderMap, url: &url::Url) {
    if let Some(host) = url.host_str() {
        let host_value = url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(value) = HeaderValue::from_str(&host_value) {
            headers.insert(header::HOST, value);
        }
    }
}
