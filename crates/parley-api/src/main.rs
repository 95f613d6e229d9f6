//! Parley entry point.
//!
//! Binary name: `parley`
//!
//! Loads `.env`, parses CLI arguments, initializes tracing, resolves config
//! and secrets (failing fast when a required credential is missing), then
//! dispatches to the selected command.

mod cli;
mod http;
mod polling;
mod state;

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use parley_infra::config::{
    TransportOverrides, load_proxy_config, resolve_config_path, resolve_transport,
};
use parley_infra::secret::Secrets;
use parley_infra::secret::env::EnvSecretProvider;
use parley_observe::tracing_setup::{init_tracing, shutdown_tracing};
use parley_types::config::ProxyConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Best effort: a missing .env is normal in hosted deployments.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    init_tracing(cli.log_directive(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.clone()).await?;
    let secrets = Secrets::load(&EnvSecretProvider::new())?;

    match cli.command {
        Commands::Serve {
            port,
            domain,
            polling,
        } => {
            let transport = resolve_transport(&TransportOverrides {
                port,
                domain,
                force_polling: polling,
            })?;
            let state = AppState::init(config, &secrets)?;

            let shutdown = CancellationToken::new();
            tokio::spawn({
                let shutdown = shutdown.clone();
                async move {
                    shutdown_signal().await;
                    tracing::info!("Shutdown signal received");
                    shutdown.cancel();
                }
            });

            cli::serve::serve(state, transport, shutdown).await?;
        }

        Commands::Check => {
            cli::check::check(&config, &secrets, cli.json).await?;
        }
    }

    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<ProxyConfig> {
    match resolve_config_path(explicit.as_deref()) {
        Some(path) => Ok(load_proxy_config(&path).await?),
        None => {
            tracing::debug!("No config directory available, using defaults");
            Ok(ProxyConfig::default())
        }
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
