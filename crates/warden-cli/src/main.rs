//! Warden CLI - request-gating gateway.
//!
//! Validates gateway configuration files and runs one-off decisions against
//! them, printing the final verdict as JSON.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;

use commands::{check_config, decide};

/// Warden - request-gating gateway
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (overrides the config file)
    #[arg(long, global = true, env = "WARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: pretty, compact, json or full (overrides the config file)
    #[arg(long, global = true, env = "WARDEN_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a gateway configuration file
    CheckConfig {
        /// Path to the TOML configuration file
        file: PathBuf,
    },

    /// Decide a single request and print the final verdict as JSON
    Decide {
        /// Path to the TOML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Request as inline JSON, or `@path` to read it from a file
        #[arg(short, long)]
        request: String,
    },
}

impl Commands {
    fn config_path(&self) -> &PathBuf {
        match self {
            Self::CheckConfig { file } => file,
            Self::Decide { config, .. } => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load the config early for its logging section; commands report errors.
    let logging = warden_config::loader::load_file(cli.command.config_path())
        .ok()
        .map(|c| c.logging);
    let log_config = config_bridge::to_log_config(
        logging.as_ref(),
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
    );
    if let Err(e) = warden_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::CheckConfig { file } => check_config::run(&file),
        Commands::Decide { config, request } => decide::run(&config, &request).await,
    }
}
