//! Telegram Bot API wire types (the subset Parley reads).

use serde::Deserialize;

use parley_types::channel::InboundMessage;
use parley_types::conversation::ConversationId;
use parley_types::error::ChannelError;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl TelegramUser {
    /// The username when set, otherwise the full name.
    pub fn display_name(&self) -> String {
        match (&self.username, &self.last_name) {
            (Some(username), _) => username.clone(),
            (None, Some(last)) => format!("{} {}", self.first_name, last),
            (None, None) => self.first_name.clone(),
        }
    }
}

impl TelegramUpdate {
    /// Parse one update as pushed to a webhook.
    pub fn from_slice(body: &[u8]) -> Result<Self, ChannelError> {
        serde_json::from_slice(body).map_err(|e| ChannelError::MalformedUpdate(e.to_string()))
    }

    /// Convert to a platform-neutral inbound message.
    ///
    /// Only plain text messages from humans are kept; edits, media,
    /// service messages and bot senders yield `None`. The conversation is
    /// keyed by chat id.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        if message.from.as_ref().is_some_and(|u| u.is_bot) {
            return None;
        }

        Some(
            InboundMessage::new(ConversationId::from(message.chat.id), text)
                .with_message_id(message.message_id),
        )
    }
}
