//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, services, health), and their associated argument
//! structs. Every flag has an environment variable equivalent for
//! container deployments.

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "llm-relay",
    version,
    about = "Path-based reverse proxy for LLM provider APIs",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        llm-relay run                        Start the relay on port 3000\n  \
        llm-relay run -p 8080 --pretty       Local dev mode\n  \
        llm-relay services                   List supported upstream services\n\n  \
        Requests are routed by first path segment: /{service}/{path}"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server
    Run(RunArgs),

    /// List registered services and their upstream base URLs
    Services,

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        llm-relay run                                      Defaults (0.0.0.0:3000)\n  \
        llm-relay run -p 8080 --pretty                     Local dev mode\n  \
        llm-relay run --no-scrub                           Pass client headers through\n  \
        LLM_RELAY_UPSTREAM_AZURE_OPENAI=https://my-rg.openai.azure.com llm-relay run")]
pub struct RunArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Forwarding --
    /// Forward client-identifying headers (X-Forwarded-For etc.) instead
    /// of scrubbing them
    #[arg(long, env = "LLM_RELAY_NO_SCRUB", help_heading = "Forwarding")]
    pub no_scrub: bool,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 33_554_432,
        help_heading = "Forwarding"
    )]
    pub max_body: usize,

    /// Log parsed SSE deltas from streamed upstream responses
    #[cfg(feature = "stream-inspect")]
    #[arg(long, env = "LLM_RELAY_TRACE_STREAM", help_heading = "Forwarding")]
    pub trace_stream: bool,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}
