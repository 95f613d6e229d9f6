//! Telegram webhook receiver.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use parley_infra::telegram::TelegramUpdate;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /{webhook_path} - Receive one Telegram update.
///
/// Answers as soon as the update is parsed; the round runs on a spawned
/// task so Telegram never waits on the model. Updates without text are
/// acknowledged and dropped.
pub async fn receive_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let update = TelegramUpdate::from_slice(&body)?;

    let update_id = update.update_id;
    match update.into_inbound() {
        Some(inbound) => {
            tracing::debug!(update_id, conversation_id = %inbound.conversation_id, "Webhook update accepted");
            state.spawn_delivery(inbound);
        }
        None => tracing::debug!(update_id, "Ignoring non-text update"),
    }

    Ok(StatusCode::OK)
}
