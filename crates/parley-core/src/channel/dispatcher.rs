//! UpdateDispatcher -- routes inbound chat messages to commands or to the
//! turn orchestrator, and hands replies back to the channel.
//!
//! Both transports (long polling and webhook) call into the same
//! dispatcher, one spawned task per update.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_types::channel::{InboundMessage, OutboundMessage};
use parley_types::config::BotConfig;

use super::command::{self, BotCommand};
use super::port::ChatChannel;
use crate::conversation::orchestrator::TurnOrchestrator;
use crate::llm::provider::LlmProvider;

/// How much of the history `/history` shows.
#[derive(Debug, Clone, Copy)]
pub struct HistoryDisplay {
    pub turns: usize,
    pub chars: usize,
}

impl From<&BotConfig> for HistoryDisplay {
    fn from(config: &BotConfig) -> Self {
        Self {
            turns: config.history_display_turns,
            chars: config.history_display_chars,
        }
    }
}

pub struct UpdateDispatcher<P: LlmProvider> {
    orchestrator: Arc<TurnOrchestrator<P>>,
    display: HistoryDisplay,
}

impl<P: LlmProvider> UpdateDispatcher<P> {
    pub fn new(orchestrator: Arc<TurnOrchestrator<P>>, display: HistoryDisplay) -> Self {
        Self {
            orchestrator,
            display,
        }
    }

    pub fn orchestrator(&self) -> &Arc<TurnOrchestrator<P>> {
        &self.orchestrator
    }

    /// Produce the reply for one inbound message, if any.
    pub async fn dispatch(&self, inbound: &InboundMessage) -> Option<OutboundMessage> {
        let id = &inbound.conversation_id;

        let text = match BotCommand::parse(&inbound.text) {
            Some(BotCommand::Start) | Some(BotCommand::Help) => command::GREETING.to_string(),
            Some(BotCommand::Clear) => {
                self.orchestrator.clear(id).await;
                command::CLEARED_REPLY.to_string()
            }
            Some(BotCommand::History) => {
                let turns = self.orchestrator.history(id).await;
                command::render_history(&turns, self.display.turns, self.display.chars)
            }
            Some(BotCommand::Unknown(name)) => {
                debug!(conversation_id = %id, command = %name, "Ignoring unknown command");
                return None;
            }
            None => self
                .orchestrator
                .handle(id, &inbound.text)
                .await
                .reply_text()?
                .to_string(),
        };

        Some(OutboundMessage::reply_to(inbound, text))
    }

    /// Dispatch `inbound` and send the reply through `channel`.
    ///
    /// Free text gets a typing indicator first. Channel failures are
    /// logged; the conversation state is already settled by then.
    pub async fn deliver<C: ChatChannel>(&self, channel: &C, inbound: InboundMessage) {
        let id = &inbound.conversation_id;

        if BotCommand::parse(&inbound.text).is_none()
            && !inbound.text.trim().is_empty()
            && let Err(e) = channel.notify_typing(id).await
        {
            warn!(channel = channel.name(), conversation_id = %id, error = %e, "Typing indicator failed");
        }

        let Some(reply) = self.dispatch(&inbound).await else {
            return;
        };

        if let Err(e) = channel.send(&reply).await {
            warn!(channel = channel.name(), conversation_id = %id, error = %e, "Failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parley_types::conversation::{ConversationId, TurnRole};
    use parley_types::error::ChannelError;
    use parley_types::llm::{
        CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
    };

    use crate::conversation::context::ContextBuilder;
    use crate::conversation::orchestrator::{FAILURE_REPLY, TurnSettings};
    use crate::conversation::store::ConversationStore;

    struct FixedProvider {
        reply: Option<&'static str>,
        calls: AtomicUsize,
        capabilities: ProviderCapabilities,
    }

    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-model"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(CompletionResponse {
                    id: "r".to_string(),
                    content: text.to_string(),
                    model: "fixed-model".to_string(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                }),
                None => Err(LlmError::Overloaded("busy".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<OutboundMessage>>,
        typing: AtomicUsize,
        fail_send: bool,
    }

    impl ChatChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
            if self.fail_send {
                return Err(ChannelError::Transport("down".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn notify_typing(&self, _conversation_id: &ConversationId) -> Result<(), ChannelError> {
            self.typing.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn dispatcher(reply: Option<&'static str>) -> UpdateDispatcher<FixedProvider> {
        let provider = FixedProvider {
            reply,
            calls: AtomicUsize::new(0),
            capabilities: ProviderCapabilities {
                max_output_tokens: 8_192,
            },
        };
        let orchestrator = TurnOrchestrator::new(
            provider,
            ConversationStore::default(),
            ContextBuilder::new("preamble"),
            TurnSettings::default(),
        );
        UpdateDispatcher::new(
            Arc::new(orchestrator),
            HistoryDisplay {
                turns: 10,
                chars: 100,
            },
        )
    }

    fn calls(d: &UpdateDispatcher<FixedProvider>) -> usize {
        d.orchestrator().provider().calls.load(Ordering::SeqCst)
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage::new(42_i64, text).with_message_id(7)
    }

    #[tokio::test]
    async fn test_free_text_goes_to_model() {
        let d = dispatcher(Some("Great job!"));

        let reply = d.dispatch(&msg("He go to school.")).await.unwrap();

        assert_eq!(reply.text, "Great job!");
        assert_eq!(reply.reply_to, Some(7));
        assert_eq!(calls(&d), 1);
    }

    #[tokio::test]
    async fn test_model_failure_replies_with_apology() {
        let d = dispatcher(None);
        let reply = d.dispatch(&msg("hello")).await.unwrap();
        assert_eq!(reply.text, FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_start_and_help_reply_greeting_without_model() {
        let d = dispatcher(Some("unused"));
        for text in ["/start", "/help"] {
            let reply = d.dispatch(&msg(text)).await.unwrap();
            assert_eq!(reply.text, command::GREETING);
        }
        assert_eq!(calls(&d), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_history() {
        let d = dispatcher(Some("ok"));
        d.dispatch(&msg("hi")).await;
        let id = ConversationId::new("42");
        assert_eq!(d.orchestrator().store().len(&id), 2);

        let reply = d.dispatch(&msg("/clear")).await.unwrap();

        assert_eq!(reply.text, command::CLEARED_REPLY);
        assert_eq!(d.orchestrator().store().len(&id), 0);
    }

    #[tokio::test]
    async fn test_history_renders_stored_turns() {
        let d = dispatcher(Some("He goes to school."));
        assert_eq!(
            d.dispatch(&msg("/history")).await.unwrap().text,
            command::EMPTY_HISTORY_REPLY
        );

        d.dispatch(&msg("He go to school.")).await;
        let reply = d.dispatch(&msg("/history")).await.unwrap();

        assert!(reply.text.contains("1. You: He go to school."));
        assert!(reply.text.contains("2. Me: He goes to school."));
    }

    #[tokio::test]
    async fn test_blank_and_unknown_produce_no_reply() {
        let d = dispatcher(Some("unused"));
        assert!(d.dispatch(&msg("   ")).await.is_none());
        assert!(d.dispatch(&msg("/weather")).await.is_none());
        assert_eq!(calls(&d), 0);
    }

    #[tokio::test]
    async fn test_deliver_sends_typing_then_reply() {
        let d = dispatcher(Some("Nice!"));
        let channel = RecordingChannel::default();

        d.deliver(&channel, msg("He go to school.")).await;

        assert_eq!(channel.typing.load(Ordering::SeqCst), 1);
        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Nice!");
        assert_eq!(sent[0].conversation_id, ConversationId::new("42"));
    }

    #[tokio::test]
    async fn test_deliver_skips_typing_for_commands_and_blank() {
        let d = dispatcher(Some("unused"));
        let channel = RecordingChannel::default();

        d.deliver(&channel, msg("/start")).await;
        d.deliver(&channel, msg("  ")).await;

        assert_eq!(channel.typing.load(Ordering::SeqCst), 0);
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_keeps_committed_turns() {
        let d = dispatcher(Some("ok"));
        let channel = RecordingChannel {
            fail_send: true,
            ..Default::default()
        };

        d.deliver(&channel, msg("hi")).await;

        let turns = d.orchestrator().store().get(&ConversationId::new("42"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, TurnRole::Assistant);
    }
}
