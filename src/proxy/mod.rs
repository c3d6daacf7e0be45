//! Core HTTP request forwarding handler.
//!
//! [`forward_handler`] is the Axum fallback that receives every request
//! not claimed by an explicit route. It parses the path into
//! `/{service}/{rest}`, resolves the service against the registry,
//! builds the target URL, and relays the upstream response verbatim.
//! Submodules handle path resolution ([`routing`]), header construction
//! ([`headers`]), and the outbound call ([`forward`]).

pub mod forward;
pub mod headers;
#[cfg(feature = "stream-inspect")]
pub mod inspect;
pub mod routing;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::server::AppState;

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let target = match routing::resolve_target(&state.registry, uri.path(), uri.query()) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(
                correlation_id = %correlation_id,
                method = %method,
                path = %uri.path(),
                reason = e.message(),
                "request rejected"
            );
            return e.into_response();
        }
    };

    // An unparseable target (e.g. the azure_openai placeholder left
    // unsubstituted) is an operator problem, not a caller problem.
    let url = match url::Url::parse(&target) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(
                correlation_id = %correlation_id,
                target = %target,
                error = %e,
                "target URL is not valid"
            );
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            return internal_error(format_args!("invalid target URL: {e}"));
        }
    };

    tracing::info!(
        correlation_id = %correlation_id,
        method = %method,
        path = %uri.path(),
        target = %url,
        "request received"
    );

    let forwarded_headers = headers::build_forwarded_headers(&req_headers, state.options.scrub);

    // GET and HEAD define no body semantics; drop any inbound payload.
    let body = if matches!(method, Method::GET | Method::HEAD) {
        Bytes::new()
    } else {
        body
    };

    match forward::forward(&state.http_client, method, url, forwarded_headers, body).await {
        Ok(upstream) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);

            let (mut parts, upstream_body) = upstream.into_parts();
            headers::strip_response_hop_by_hop(&mut parts.headers);

            tracing::info!(
                correlation_id = %correlation_id,
                status = %parts.status,
                "upstream responded"
            );

            #[cfg(feature = "stream-inspect")]
            if state.options.trace_stream && is_event_stream(&parts.headers) {
                let inspected = inspect::InspectedBody::new(upstream_body, correlation_id);
                return Response::from_parts(parts, axum::body::Body::new(inspected));
            }

            Response::from_parts(parts, axum::body::Body::new(upstream_body))
        }
        Err(e) => {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "forwarding failed"
            );
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            internal_error(e)
        }
    }
}

fn internal_error(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal Error: {message}"),
    )
        .into_response()
}

#[cfg(feature = "stream-inspect")]
fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}
