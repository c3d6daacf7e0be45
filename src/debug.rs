//! Diagnostic routes (`/debug`, `/debug-ip`), behind the `debug-routes`
//! feature.
//!
//! `/debug` reflects the connection metadata of the current request as
//! JSON. `/debug-ip` performs an outbound lookup against a third-party
//! IP information service and relays its JSON body unmodified. Both are
//! conveniences and sit outside the core forwarding contract.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body_util::{BodyExt, Limited};
use serde::Serialize;

use crate::server::{AppState, HttpClient};

const IP_INFO_URL: &str = "https://ipinfo.io/json";

/// Inbound bodies are capped by `RequestBodyLimitLayer`; this is the
/// matching cap for the diagnostic lookup's response.
const FETCH_JSON_MAX_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub remote_addr: String,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub host: Option<String>,
    pub user_agent: Option<String>,
}

pub async fn connection_info_handler(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<ConnectionInfo> {
    let header_str =
        |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);

    Json(ConnectionInfo {
        remote_addr: addr.to_string(),
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        host: header_str(header::HOST),
        user_agent: header_str(header::USER_AGENT),
    })
}

pub async fn ip_info_handler(State(state): State<Arc<AppState>>) -> Response {
    fetch_json(&state.http_client, IP_INFO_URL).await
}

/// Relay a JSON document fetched from `uri`, with the body capped at
/// [`FETCH_JSON_MAX_BYTES`].
pub async fn fetch_json(client: &HttpClient, uri: &str) -> Response {
    let request = match hyper::Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .body(http_body_util::Full::new(bytes::Bytes::new()))
    {
        Ok(request) => request,
        Err(e) => return internal_error(e),
    };

    let response = match client.request(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "ip info lookup failed");
            return internal_error(e);
        }
    };

    let status = response.status();
    match Limited::new(response.into_body(), FETCH_JSON_MAX_BYTES)
        .collect()
        .await
    {
        Ok(collected) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            collected.to_bytes(),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ip info body read failed");
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
