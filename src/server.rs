//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the service
//! registry, HTTP client, runtime options, stats, and uptime),
//! [`build_router`] for constructing the Axum router with middleware
//! layers, [`build_http_client`] for the connection-pooled hyper client,
//! and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::health::health_handler;
use crate::proxy;
use crate::registry::Registry;

/// Runtime toggles resolved from CLI flags at startup.
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Remove client-identifying headers before forwarding.
    pub scrub: bool,

    /// Log parsed SSE deltas from streamed upstream responses.
    #[cfg(feature = "stream-inspect")]
    pub trace_stream: bool,
}

impl RelayOptions {
    #[must_use]
    pub const fn new(scrub: bool) -> Self {
        Self {
            scrub,
            #[cfg(feature = "stream-inspect")]
            trace_stream: false,
        }
    }
}

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct AppState {
    pub registry: Registry,
    pub http_client: HttpClient,
    pub options: RelayOptions,
    pub start_time: Instant,
    pub stats: Stats,
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in (e.g. `--all-features`
    // enables both `ring` and `aws-lc-rs`), rustls cannot auto-detect which one
    // to use. Explicitly install `ring` as the default provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    let router = Router::new().route("/health", get(health_handler));

    // Diagnostic routes sit ahead of the fallback; their names must never
    // collide with a registry identifier.
    #[cfg(feature = "debug-routes")]
    let router = router
        .route("/debug", get(crate::debug::connection_info_handler))
        .route("/debug-ip", get(crate::debug::ip_info_handler));

    router
        .fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
