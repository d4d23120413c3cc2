// SPDX-FileCopyrightText: 2026 Michimem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Michimem - persistent memory for assistant sessions.
//!
//! Two modes: `hook <event>` handles one host lifecycle event (payload on
//! stdin, optional context JSON on stdout), and `serve` runs the tool
//! server over stdio. Logs go to stderr; stdout is the protocol channel.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Michimem - persistent memory for assistant sessions.
#[derive(Parser, Debug)]
#[command(name = "michimem", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one host lifecycle event; the JSON payload arrives on stdin.
    Hook {
        /// Event name (SessionStart, PreCompact, Stop, SessionEnd).
        event: String,
    },
    /// Serve the memory tools over stdin/stdout.
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Hook { event } => {
            let mut payload = String::new();
            if let Err(e) = tokio::io::stdin().read_to_string(&mut payload).await {
                error!(error = %e, "failed to read hook payload");
                return ExitCode::FAILURE;
            }
            match michimem::hooks::dispatch(&event, &payload).await {
                Ok(Some(output)) => {
                    println!("{output}");
                    ExitCode::SUCCESS
                }
                Ok(None) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(event = %event, error = %e, "hook failed");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Serve => {
            let config = match michimem_config::load_config() {
                Ok(config) => config,
                Err(e) => {
                    error!(error = %e, "configuration failed to load");
                    return ExitCode::FAILURE;
                }
            };
            match michimem::server::run_server(&config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "tool server failed");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
