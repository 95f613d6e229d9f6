//! Chat platform message types for Parley.
//!
//! These are the platform-neutral shapes exchanged between a chat channel
//! adapter (e.g. Telegram) and the dispatcher.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;

/// A text message delivered by a chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub conversation_id: ConversationId,
    pub text: String,
    /// Platform message id, used to thread the reply when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

impl InboundMessage {
    pub fn new(conversation_id: impl Into<ConversationId>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            message_id: None,
        }
    }

    pub fn with_message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

/// A reply to deliver to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub conversation_id: ConversationId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<i64>,
}

impl OutboundMessage {
    pub fn new(conversation_id: impl Into<ConversationId>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            reply_to: None,
        }
    }

    /// Address a reply to the message that triggered it.
    pub fn reply_to(inbound: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            conversation_id: inbound.conversation_id.clone(),
            text: text.into(),
            reply_to: inbound.message_id,
        }
    }
}
