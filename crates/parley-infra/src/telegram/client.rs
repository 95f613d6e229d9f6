//! TelegramChannel -- Bot API client and [`ChatChannel`] implementation.
//!
//! All calls are `POST {base}/bot{token}/{method}` with a JSON body. The
//! token is a [`SecretString`]; transport errors are stripped of the request
//! URL before they are surfaced so the token never reaches a log line.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use parley_core::channel::chunk::{TELEGRAM_MAX_CHARS, split_message};
use parley_core::channel::port::ChatChannel;
use parley_types::channel::OutboundMessage;
use parley_types::conversation::ConversationId;
use parley_types::error::ChannelError;

use super::types::{TelegramMessage, TelegramResponse, TelegramUpdate, TelegramUser};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Timeout for ordinary API calls.
const API_TIMEOUT_SECS: u64 = 30;

/// Extra slack on top of the long-poll timeout before the HTTP call gives up.
const POLL_SLACK_SECS: u64 = 10;

/// Telegram Bot API channel.
///
/// Does NOT derive Debug; it holds the bot token.
pub struct TelegramChannel {
    client: reqwest::Client,
    token: SecretString,
    base_url: String,
}

impl TelegramChannel {
    pub fn new(token: SecretString) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChannelError::Transport(e.without_url().to_string()))?;

        Ok(Self {
            client,
            token,
            base_url: TELEGRAM_API_BASE.to_string(),
        })
    }

    /// Override the API base URL (local Bot API server, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose_secret(), method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<T, ChannelError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("{method}: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ChannelError::Transport(format!("{method}: {}", e.without_url())))?;

        decode_response(method, status, &body)
    }

    /// `getMe`: the bot's own account. Used as a credential check.
    pub async fn get_me(&self) -> Result<TelegramUser, ChannelError> {
        self.call("getMe", &json!({}), Duration::from_secs(API_TIMEOUT_SECS))
            .await
    }

    /// `getUpdates` long poll. `offset` is the first update id wanted.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> Result<Vec<TelegramUpdate>, ChannelError> {
        let mut params = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }

        self.call(
            "getUpdates",
            &params,
            Duration::from_secs(timeout_secs as u64 + POLL_SLACK_SECS),
        )
        .await
    }

    /// `setWebhook`: ask Telegram to push updates to `url`.
    pub async fn set_webhook(&self, url: &str, drop_pending: bool) -> Result<(), ChannelError> {
        let params = json!({
            "url": url,
            "allowed_updates": ["message"],
            "drop_pending_updates": drop_pending,
        });
        let _: bool = self
            .call("setWebhook", &params, Duration::from_secs(API_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    /// `deleteWebhook`: required before `getUpdates` works.
    pub async fn delete_webhook(&self, drop_pending: bool) -> Result<(), ChannelError> {
        let params = json!({ "drop_pending_updates": drop_pending });
        let _: bool = self
            .call("deleteWebhook", &params, Duration::from_secs(API_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    /// `sendMessage` with plain text (no parse mode).
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<TelegramMessage, ChannelError> {
        let mut params = json!({
            "chat_id": chat_id_param(conversation_id),
            "text": text,
        });
        if let Some(message_id) = reply_to {
            params["reply_parameters"] = json!({
                "message_id": message_id,
                "allow_sending_without_reply": true,
            });
        }

        self.call("sendMessage", &params, Duration::from_secs(API_TIMEOUT_SECS))
            .await
    }

    /// `sendChatAction`, e.g. "typing".
    pub async fn send_chat_action(
        &self,
        conversation_id: &ConversationId,
        action: &str,
    ) -> Result<(), ChannelError> {
        let params = json!({
            "chat_id": chat_id_param(conversation_id),
            "action": action,
        });
        let _: bool = self
            .call("sendChatAction", &params, Duration::from_secs(API_TIMEOUT_SECS))
            .await?;
        debug!(conversation_id = %conversation_id, action, "Sent chat action");
        Ok(())
    }
}

impl ChatChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        // Only the first piece is threaded to the triggering message.
        let mut reply_to = message.reply_to;
        for chunk in split_message(&message.text, TELEGRAM_MAX_CHARS) {
            self.send_message(&message.conversation_id, &chunk, reply_to.take())
                .await?;
        }
        Ok(())
    }

    async fn notify_typing(&self, conversation_id: &ConversationId) -> Result<(), ChannelError> {
        self.send_chat_action(conversation_id, "typing").await
    }
}

/// Chat ids are numeric; anything else (e.g. `@channel`) is passed through.
fn chat_id_param(conversation_id: &ConversationId) -> Value {
    match conversation_id.as_str().parse::<i64>() {
        Ok(id) => json!(id),
        Err(_) => json!(conversation_id.as_str()),
    }
}

/// Unwrap a Bot API envelope.
fn decode_response<T: DeserializeOwned>(
    method: &str,
    status: u16,
    body: &str,
) -> Result<T, ChannelError> {
    let envelope: TelegramResponse<T> = serde_json::from_str(body).map_err(|e| {
        if (200..300).contains(&status) {
            ChannelError::Api(format!("{method}: unreadable response: {e}"))
        } else {
            ChannelError::Api(format!("{method}: HTTP {status}"))
        }
    })?;

    if !envelope.ok {
        let mut description = envelope
            .description
            .unwrap_or_else(|| format!("HTTP {status}"));
        if let Some(retry) = envelope.parameters.and_then(|p| p.retry_after) {
            description.push_str(&format!(" (retry after {retry}s)"));
        }
        return Err(ChannelError::Api(format!("{method}: {description}")));
    }

    envelope
        .result
        .ok_or_else(|| ChannelError::Api(format!("{method}: ok response without result")))
}
