//! `llm-relay run` — start the relay server.
//!
//! Builds the service registry (with env overrides applied), starts the
//! Axum HTTP server, and waits for graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::cli::RunArgs;
use crate::error::RelayError;
use crate::logging;
use crate::registry::Registry;
use crate::server::{self, AppState, RelayOptions, Stats};

pub async fn execute(args: RunArgs) -> Result<(), RelayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let registry = Registry::from_env();
    let service_count = registry.len();

    #[allow(unused_mut)]
    let mut options = RelayOptions::new(!args.no_scrub);
    #[cfg(feature = "stream-inspect")]
    {
        options.trace_stream = args.trace_stream;
    }

    let state = Arc::new(AppState {
        registry,
        http_client: server::build_http_client(),
        options,
        start_time: Instant::now(),
        stats: Stats::new(),
    });

    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        services = service_count,
        scrub = !args.no_scrub,
        "llm-relay started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("llm-relay stopped");
    Ok(())
}
