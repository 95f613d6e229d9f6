//! ChatChannel trait -- the port chat platform adapters implement.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition), like
//! `LlmProvider`. The dispatcher is generic over it.

use std::future::Future;

use parley_types::channel::OutboundMessage;
use parley_types::conversation::ConversationId;
use parley_types::error::ChannelError;

/// Outbound half of a chat platform.
pub trait ChatChannel: Send + Sync {
    /// Platform name (e.g. "telegram").
    fn name(&self) -> &str;

    /// Deliver a reply. Adapters split text that exceeds the platform's
    /// message size limit into several messages.
    fn send(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Show a "typing" indicator in the conversation.
    fn notify_typing(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
