//! Long-polling transport.
//!
//! Removes any registered webhook (dropping queued updates), then loops on
//! `getUpdates` with a moving offset until the shutdown token fires. Each
//! batch is grouped by conversation; every group runs on its own task so
//! chats proceed in parallel while one chat's messages keep their order.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_infra::telegram::TelegramUpdate;
use parley_types::channel::InboundMessage;

use crate::state::AppState;

/// Server-side long-poll wait.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed poll.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub async fn run_polling(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    state.channel.delete_webhook(true).await?;
    info!("Polling for Telegram updates");

    let mut offset: Option<i64> = None;

    loop {
        let result = tokio::select! {
            () = shutdown.cancelled() => break,
            result = state.channel.get_updates(offset, POLL_TIMEOUT_SECS) => result,
        };

        match result {
            Ok(updates) => {
                if let Some(last) = updates.last() {
                    offset = Some(last.update_id + 1);
                }
                debug!(count = updates.len(), "Received updates");
                for batch in group_by_conversation(updates) {
                    state.spawn_batch(batch);
                }
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed; retrying in {}s", ERROR_BACKOFF.as_secs());
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    }

    Ok(())
}

/// Convert updates to inbound messages grouped by conversation, keeping
/// arrival order inside each group and first-seen order across groups.
fn group_by_conversation(updates: Vec<TelegramUpdate>) -> Vec<Vec<InboundMessage>> {
    let mut groups: Vec<Vec<InboundMessage>> = Vec::new();

    for inbound in updates.into_iter().filter_map(TelegramUpdate::into_inbound) {
        match groups
            .iter_mut()
            .find(|g| g[0].conversation_id == inbound.conversation_id)
        {
            Some(group) => group.push(inbound),
            None => groups.push(vec![inbound]),
        }
    }

    groups
}
