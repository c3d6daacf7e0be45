//! Path parsing and target URL construction.
//!
//! [`resolve_target`] splits the request path into non-empty segments,
//! resolves the first segment against the [`Registry`], and concatenates
//! the base URL, the remaining path, and the original query string into
//! one absolute target URL.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::registry::Registry;

pub const INVALID_FORMAT_MSG: &str = "Invalid URL format. Expected /{service}/{path}";
pub const UNSUPPORTED_SERVICE_MSG: &str = "Service not supported";

/// A locally detected request problem. Always yields a 400 with a fixed
/// plain-text body; never treated as a system fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// Fewer than two non-empty path segments.
    InvalidFormat,
    /// First segment is not a registered service identifier.
    UnsupportedService,
}

impl RouteError {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidFormat => INVALID_FORMAT_MSG,
            Self::UnsupportedService => UNSUPPORTED_SERVICE_MSG,
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.message()).into_response()
    }
}

/// Resolve an inbound path and query into an absolute target URL string.
///
/// Empty segments from leading, trailing, or duplicate slashes are
/// discarded before counting. The query string is appended verbatim with
/// its leading `?`, or omitted entirely when absent.
///
/// The concatenation is deliberately literal: a base URL that already
/// ends in a version segment (`.../v1`) combined with a caller path that
/// repeats it produces `/v1/v1/...`. Known quirk, kept as documented
/// behavior rather than silently deduplicated.
pub fn resolve_target(
    registry: &Registry,
    path: &str,
    query: Option<&str>,
) -> Result<String, RouteError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.len() < 2 {
        return Err(RouteError::InvalidFormat);
    }

    let service = segments[0].to_ascii_lowercase();
    let base_url = registry
        .lookup(&service)
        .ok_or(RouteError::UnsupportedService)?;

    let mut target = String::with_capacity(base_url.len() + path.len() + 1);
    target.push_str(base_url);
    for segment in &segments[1..] {
        target.push('/');
        target.push_str(segment);
    }

    match query {
        Some(q) if !q.is_empty() => {
            target.push('?');
            target.push_str(q);
        }
        _ => {}
    }

    Ok(target)
}
