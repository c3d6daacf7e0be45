//! Forwarded header construction and scrubbing.
//!
//! [`build_forwarded_headers`] clones the inbound client headers, strips
//! hop-by-hop headers, and — unless scrubbing is disabled — removes
//! client-identifying network metadata so it is never relayed to the
//! upstream provider. Authorization, content-type, and provider auth
//! headers always pass through untouched.

use std::sync::LazyLock;

use axum::http::{header, HeaderMap, HeaderName};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Headers that identify the connecting client or its network path.
/// Removed before forwarding when scrubbing is enabled.
static CLIENT_IDENTITY: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "x-forwarded-for",
        "x-real-ip",
        "cf-connecting-ip",
        "cf-visitor",
        "cf-ipcountry",
        "cf-ray",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Build the outbound header set from the inbound one.
///
/// `Host` is removed here and set per hop by the forwarder, since a
/// followed redirect may land on a different host. `Content-Length` is
/// removed because the outbound body is re-framed from the buffered
/// bytes (and dropped entirely for GET/HEAD).
#[must_use]
pub fn build_forwarded_headers(original: &HeaderMap, scrub: bool) -> HeaderMap {
    let mut headers = original.clone();

    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    if scrub {
        for name in CLIENT_IDENTITY.iter() {
            headers.remove(name);
        }
    }

    headers
}

/// Strip hop-by-hop headers from an upstream response before relaying it.
/// `Content-Length` is kept — the body is streamed through verbatim.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}
