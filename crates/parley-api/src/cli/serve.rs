//! `parley serve` -- run the bot on the selected transport.

use tokio_util::sync::CancellationToken;

use parley_infra::config::{Transport, webhook_url};

use crate::http;
use crate::polling;
use crate::state::AppState;

pub async fn serve(
    state: AppState,
    transport: Transport,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let me = state.channel.get_me().await?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or(&me.first_name),
        "Authenticated with Telegram"
    );

    match transport {
        Transport::Webhook { domain, port } => {
            let url = webhook_url(&domain, &state.config.webhook.path);
            state.channel.set_webhook(&url, false).await?;
            tracing::info!(%url, "Webhook registered");

            let addr = format!("0.0.0.0:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "Listening for Telegram updates");

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await?;
        }
        Transport::Polling => {
            tracing::warn!(
                "No public domain configured (RAILWAY_PUBLIC_DOMAIN / PARLEY_PUBLIC_DOMAIN); \
                 falling back to long polling"
            );
            polling::run_polling(state, shutdown).await?;
        }
    }

    tracing::info!("Stopped");
    Ok(())
}
