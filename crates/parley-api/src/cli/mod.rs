//! CLI definitions for the `parley` binary.

pub mod check;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Telegram chat bot backed by a Gemini model, with per-chat memory.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// More log output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Path to config.toml (default: $PARLEY_CONFIG, then the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter directive derived from `--quiet` / `-v`.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,parley_api=debug,parley_core=debug,parley_infra=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot.
    Serve {
        /// Listen port in webhook mode (default: $PORT, then 8080).
        #[arg(long)]
        port: Option<u16>,

        /// Public hostname for the webhook (default: $RAILWAY_PUBLIC_DOMAIN or
        /// $PARLEY_PUBLIC_DOMAIN). Without one the bot long-polls.
        #[arg(long)]
        domain: Option<String>,

        /// Long-poll even when a public domain is configured.
        #[arg(long)]
        polling: bool,
    },

    /// Verify config, credentials and connectivity, then exit.
    Check,
}
