//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`services`], or [`health`]. Each
//! handler lives in its own submodule.

pub mod health;
pub mod run;
pub mod services;

use crate::cli::{Cli, Commands};
use crate::error::RelayError;

pub async fn dispatch(cli: Cli) -> Result<(), RelayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(args).await,
        Some(Commands::Services) => {
            services::execute();
            Ok(())
        }
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  llm-relay v{version} \u{2014} path-based reverse proxy for LLM provider APIs\n\n  \
         No command provided. To get started:\n\n    \
         llm-relay run                Start the relay (0.0.0.0:3000)\n    \
         llm-relay services           List supported upstream services\n    \
         llm-relay --help             See all commands and options\n"
    );
}
