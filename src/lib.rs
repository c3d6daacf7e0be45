//! llm-relay is a path-based HTTP reverse proxy for LLM provider APIs.
//!
//! The first URL segment of an inbound request names one of a fixed set
//! of upstream providers (`/openai/...`, `/anthropic/...`); the relay
//! rewrites the target URL, forwards method, headers, and body, and
//! returns the upstream response verbatim. Client-identifying network
//! headers are scrubbed before forwarding unless disabled.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, services, health).
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- Core HTTP forwarding: path resolution, header construction,
//!   and the outbound call with redirect following.
//! - [`registry`] -- The immutable service-identifier-to-base-URL table.
//! - [`server`] -- Axum server setup, shared application state, HTTP client,
//!   and graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `debug-routes` | `/debug` and `/debug-ip` diagnostic endpoints |
//! | `stream-inspect` | Best-effort SSE delta logging (never alters responses) |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
#[cfg(feature = "debug-routes")]
pub mod debug;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod registry;
pub mod server;
