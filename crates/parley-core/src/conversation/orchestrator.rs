//! TurnOrchestrator -- runs one request/response round for a conversation.
//!
//! A round is: build the context from the current history, call the model,
//! and only if the call fully succeeds commit the user turn and the
//! assistant turn to the store. A failed call leaves history untouched and
//! yields the fixed [`FAILURE_REPLY`] instead of an error, so one broken
//! conversation never takes down the dispatch loop.
//!
//! Rounds on the same conversation are serialized through a lazily created
//! per-conversation async mutex. Different conversations run concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use parley_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_RESPONSE_ID, GEN_AI_USAGE_INPUT_TOKENS,
    GEN_AI_USAGE_OUTPUT_TOKENS, OP_CHAT,
};
use parley_types::config::ModelConfig;
use parley_types::conversation::{ConversationId, Turn, TurnRole};
use parley_types::llm::{CompletionRequest, LlmError};

use super::context::ContextBuilder;
use super::store::ConversationStore;
use crate::llm::provider::LlmProvider;

/// Reply sent when a round fails. Never produced by a real model call.
pub const FAILURE_REPLY: &str = "Sorry, something went wrong on my side... please try again!";

/// Rough characters-per-token ratio used for the input ceiling.
const CHARS_PER_TOKEN: usize = 4;

/// Limits applied to every model call.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Model identifier; empty means the provider's configured model.
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f64>,
    /// Upper bound on one model call.
    pub timeout: Duration,
    /// Inbound text longer than this many characters is cut.
    pub max_input_chars: usize,
}

impl TurnSettings {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            model: config.name.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
            max_input_chars: (config.max_input_tokens as usize).saturating_mul(CHARS_PER_TOKEN),
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input: no model call, no state change, no reply.
    Ignored,
    /// The model answered and both turns were committed.
    Replied(String),
    /// The model call failed; history is unchanged.
    Failed,
}

impl TurnOutcome {
    /// Text to send back to the chat, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            TurnOutcome::Ignored => None,
            TurnOutcome::Replied(text) => Some(text),
            TurnOutcome::Failed => Some(FAILURE_REPLY),
        }
    }
}

/// Owns the conversation store for the lifetime of the service and runs
/// rounds against an [`LlmProvider`].
///
/// Generic over the provider so tests can inject mocks; production code
/// pins it to `BoxLlmProvider`.
pub struct TurnOrchestrator<P: LlmProvider> {
    provider: P,
    store: ConversationStore,
    context: ContextBuilder,
    settings: TurnSettings,
    /// One mutex per conversation ever seen. Entries are never removed: a
    /// waiter may still hold a clone, and dropping the entry would let a
    /// second round start under a fresh mutex.
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl<P: LlmProvider> TurnOrchestrator<P> {
    pub fn new(
        provider: P,
        store: ConversationStore,
        context: ContextBuilder,
        settings: TurnSettings,
    ) -> Self {
        Self {
            provider,
            store,
            context,
            settings,
            locks: DashMap::new(),
        }
    }

    /// Access the conversation store.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Access the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Handle one inbound message for `id`.
    ///
    /// Never fails: model errors are logged and turned into
    /// [`TurnOutcome::Failed`].
    pub async fn handle(&self, id: &ConversationId, inbound_text: &str) -> TurnOutcome {
        let text = inbound_text.trim();
        if text.is_empty() {
            debug!(conversation_id = %id, "Ignoring blank message");
            return TurnOutcome::Ignored;
        }

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let text = self.enforce_input_ceiling(id, text);
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: self.context.build(&self.store, id, text),
            max_tokens: self
                .settings
                .max_output_tokens
                .min(self.provider.capabilities().max_output_tokens),
            temperature: self.settings.temperature,
        };

        let span = info_span!(
            "chat",
            gen_ai.operation.name = OP_CHAT,
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %self.model_name(),
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.response.id = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            conversation_id = %id,
            round_id = %Uuid::now_v7(),
        );

        let start = Instant::now();
        match self.generate(&request).instrument(span.clone()).await {
            Ok(reply) => {
                self.store.append(id, TurnRole::User, text);
                self.store.append(id, TurnRole::Assistant, reply.clone());
                span.in_scope(|| {
                    info!(
                        response_ms = start.elapsed().as_millis() as u64,
                        history_len = self.store.len(id),
                        "Round committed"
                    );
                });
                TurnOutcome::Replied(reply)
            }
            Err(e) => {
                span.in_scope(|| {
                    error!(
                        error = %e,
                        response_ms = start.elapsed().as_millis() as u64,
                        "Model call failed; history left unchanged"
                    );
                });
                TurnOutcome::Failed
            }
        }
    }

    /// Drop all history for `id`.
    ///
    /// Waits for an in-flight round on the same conversation so a clear can
    /// never land between that round's two commits.
    pub async fn clear(&self, id: &ConversationId) {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.store.clear(id);
        info!(conversation_id = %id, "Conversation history cleared");
    }

    /// Current history for `id`, oldest first.
    ///
    /// Taken under the conversation lock, so the snapshot never shows a user
    /// turn whose reply is still being committed.
    pub async fn history(&self, id: &ConversationId) -> Vec<Turn> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.store.get(id)
    }

    fn model_name(&self) -> &str {
        if self.settings.model.is_empty() {
            self.provider.model()
        } else {
            &self.settings.model
        }
    }

    fn lock_for(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn enforce_input_ceiling<'a>(&self, id: &ConversationId, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.settings.max_input_chars) {
            Some((cut, _)) => {
                warn!(
                    conversation_id = %id,
                    max_chars = self.settings.max_input_chars,
                    "Inbound message exceeds input ceiling; truncating"
                );
                &text[..cut]
            }
            None => text,
        }
    }

    /// Call the provider under the configured timeout and return the
    /// trimmed reply text.
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = tokio::time::timeout(self.settings.timeout, self.provider.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.settings.timeout.as_secs()))??;

        let span = tracing::Span::current();
        span.record(GEN_AI_RESPONSE_ID, response.id.as_str());
        span.record(
            GEN_AI_RESPONSE_FINISH_REASONS,
            tracing::field::display(&response.stop_reason),
        );
        span.record(GEN_AI_USAGE_INPUT_TOKENS, response.usage.input_tokens);
        span.record(GEN_AI_USAGE_OUTPUT_TOKENS, response.usage.output_tokens);

        let reply = response.content.trim();
        if reply.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parley_types::llm::{
        CompletionResponse, Message, MessageRole, ProviderCapabilities, StopReason, Usage,
    };
    use tokio::sync::Barrier;

    const PREAMBLE: &str = "You are a tutor.";

    enum Behavior {
        Reply(&'static str),
        /// Reply with the text of the last message, upper-cased.
        Shout,
        Fail,
        Hang,
        /// Sleep, then reply with the number of context messages seen.
        SlowCount(Duration),
        /// Wait until `n` calls are in flight at once, then reply.
        Rendezvous(Arc<Barrier>),
    }

    struct MockProvider {
        behavior: Behavior,
        calls: AtomicUsize,
        last_request: std::sync::Mutex<Option<CompletionRequest>>,
        capabilities: ProviderCapabilities,
    }

    impl MockProvider {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
                last_request: std::sync::Mutex::new(None),
                capabilities: ProviderCapabilities {
                    max_output_tokens: 8_192,
                },
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> CompletionRequest {
            self.last_request.lock().unwrap().clone().unwrap()
        }
    }

    fn ok(content: impl Into<String>) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            id: "resp-1".to_string(),
            content: content.into(),
            model: "mock-model".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 12,
                output_tokens: 3,
            },
        })
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());

            match &self.behavior {
                Behavior::Reply(text) => ok(*text),
                Behavior::Shout => {
                    let last = request.messages.last().map(|m| m.content.clone());
                    ok(last.unwrap_or_default().to_uppercase())
                }
                Behavior::Fail => Err(LlmError::Provider {
                    message: "HTTP 500: boom".to_string(),
                }),
                Behavior::Hang => std::future::pending().await,
                Behavior::SlowCount(delay) => {
                    let seen = request.messages.len();
                    tokio::time::sleep(*delay).await;
                    ok(format!("seen {seen}"))
                }
                Behavior::Rendezvous(barrier) => {
                    barrier.wait().await;
                    ok("met")
                }
            }
        }
    }

    fn orchestrator(behavior: Behavior) -> TurnOrchestrator<MockProvider> {
        orchestrator_with(behavior, TurnSettings::default())
    }

    fn orchestrator_with(
        behavior: Behavior,
        settings: TurnSettings,
    ) -> TurnOrchestrator<MockProvider> {
        TurnOrchestrator::new(
            MockProvider::new(behavior),
            ConversationStore::new(10),
            ContextBuilder::new(PREAMBLE),
            settings,
        )
    }

    fn id(s: &str) -> ConversationId {
        ConversationId::new(s)
    }

    #[tokio::test]
    async fn test_success_commits_user_and_assistant_turns() {
        let orch = orchestrator(Behavior::Reply("Great job!"));
        let conv = id("fresh");

        let outcome = orch.handle(&conv, "He go to school.").await;

        assert_eq!(outcome, TurnOutcome::Replied("Great job!".to_string()));
        assert_eq!(outcome.reply_text(), Some("Great job!"));
        let history = orch.store().get(&conv);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "He go to school.");
        assert_eq!(history[1].role, TurnRole::Assistant);
        assert_eq!(history[1].content, "Great job!");
    }

    #[tokio::test]
    async fn test_request_carries_preamble_history_and_message() {
        let orch = orchestrator(Behavior::Reply("ok"));
        let conv = id("ctx");
        orch.handle(&conv, "first").await;

        orch.handle(&conv, "second").await;

        let request = orch.provider().last_request();
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(
            request.messages,
            vec![
                Message::new(MessageRole::System, PREAMBLE),
                Message::new(MessageRole::User, "first"),
                Message::new(MessageRole::Assistant, "ok"),
                Message::new(MessageRole::User, "second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_reply_is_trimmed_before_commit() {
        let orch = orchestrator(Behavior::Reply("  Nice!\n\n"));
        let conv = id("trim");

        let outcome = orch.handle(&conv, "  hi there  ").await;

        assert_eq!(outcome, TurnOutcome::Replied("Nice!".to_string()));
        let history = orch.store().get(&conv);
        assert_eq!(history[0].content, "hi there");
        assert_eq!(history[1].content, "Nice!");
    }

    #[tokio::test]
    async fn test_failure_returns_apology_and_leaves_history() {
        let orch = orchestrator(Behavior::Fail);
        let conv = id("fail");
        orch.store().append(&conv, TurnRole::User, "earlier");
        orch.store().append(&conv, TurnRole::Assistant, "reply");
        let before = orch.store().get(&conv);

        let outcome = orch.handle(&conv, "He go to school.").await;

        assert_eq!(outcome, TurnOutcome::Failed);
        assert_eq!(outcome.reply_text(), Some(FAILURE_REPLY));
        assert_eq!(orch.store().get(&conv), before);
        assert_eq!(orch.provider().calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_on_fresh_conversation_creates_nothing() {
        let orch = orchestrator(Behavior::Fail);
        orch.handle(&id("new"), "hello").await;
        assert_eq!(orch.store().conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_reply_counts_as_failure() {
        let orch = orchestrator(Behavior::Reply("   \n"));
        let conv = id("blank-reply");

        let outcome = orch.handle(&conv, "hello").await;

        assert_eq!(outcome, TurnOutcome::Failed);
        assert!(orch.store().get(&conv).is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored_without_model_call() {
        let orch = orchestrator(Behavior::Reply("unused"));
        let conv = id("blank");
        orch.store().append(&conv, TurnRole::User, "keep");
        let before = orch.store().get(&conv);

        for input in ["", "   ", "\n\t  \n"] {
            let outcome = orch.handle(&conv, input).await;
            assert_eq!(outcome, TurnOutcome::Ignored);
            assert_eq!(outcome.reply_text(), None);
        }

        assert_eq!(orch.provider().calls(), 0);
        assert_eq!(orch.store().get(&conv), before);
    }

    #[tokio::test]
    async fn test_hung_call_times_out_as_failure() {
        let settings = TurnSettings {
            timeout: Duration::from_millis(20),
            ..TurnSettings::default()
        };
        let orch = orchestrator_with(Behavior::Hang, settings);
        let conv = id("hang");

        let outcome = orch.handle(&conv, "hello").await;

        assert_eq!(outcome, TurnOutcome::Failed);
        assert!(orch.store().get(&conv).is_empty());
    }

    #[tokio::test]
    async fn test_output_budget_is_clamped_to_provider_limit() {
        let settings = TurnSettings {
            max_output_tokens: 100_000,
            ..TurnSettings::default()
        };
        let orch = orchestrator_with(Behavior::Reply("ok"), settings);

        orch.handle(&id("clamp"), "hi").await;

        assert_eq!(orch.provider().last_request().max_tokens, 8_192);
    }

    #[tokio::test]
    async fn test_output_budget_below_provider_limit_is_kept() {
        let orch = orchestrator(Behavior::Reply("ok"));
        orch.handle(&id("keep"), "hi").await;
        assert_eq!(
            orch.provider().last_request().max_tokens,
            TurnSettings::default().max_output_tokens
        );
    }

    #[tokio::test]
    async fn test_oversized_input_is_cut_at_ceiling() {
        let settings = TurnSettings {
            max_input_chars: 5,
            ..TurnSettings::default()
        };
        let orch = orchestrator_with(Behavior::Shout, settings);
        let conv = id("long");

        let outcome = orch.handle(&conv, "héllo wörld").await;

        assert_eq!(outcome, TurnOutcome::Replied("HÉLLO".to_string()));
        assert_eq!(orch.store().get(&conv)[0].content, "héllo");
    }

    #[tokio::test]
    async fn test_input_at_ceiling_is_kept_whole() {
        let settings = TurnSettings {
            max_input_chars: 5,
            ..TurnSettings::default()
        };
        let orch = orchestrator_with(Behavior::Shout, settings);
        let conv = id("exact");

        orch.handle(&conv, "hello").await;

        assert_eq!(orch.store().get(&conv)[0].content, "hello");
    }

    #[tokio::test]
    async fn test_history_window_holds_across_many_rounds() {
        let orch = TurnOrchestrator::new(
            MockProvider::new(Behavior::Shout),
            ConversationStore::new(2),
            ContextBuilder::new(PREAMBLE),
            TurnSettings::default(),
        );
        let conv = id("window");

        for i in 0..5 {
            orch.handle(&conv, &format!("m{i}")).await;
        }

        let contents: Vec<String> = orch
            .history(&conv)
            .await
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["m3", "M3", "m4", "M4"]);
        // Context for the last call: preamble + 4 history turns + message.
        assert_eq!(orch.provider().last_request().messages.len(), 6);
    }

    #[tokio::test]
    async fn test_same_conversation_rounds_are_serialized() {
        let orch = Arc::new(orchestrator(Behavior::SlowCount(Duration::from_millis(30))));
        let conv = id("same");

        let (a, b) = tokio::join!(orch.handle(&conv, "one"), orch.handle(&conv, "two"));

        // The second round must have seen the first round's two turns.
        let mut replies = vec![a.reply_text().unwrap().to_string(), b.reply_text().unwrap().to_string()];
        replies.sort();
        assert_eq!(replies, vec!["seen 2", "seen 4"]);

        let history = orch.store().get(&conv);
        assert_eq!(history.len(), 4);
        let roles: Vec<TurnRole> = history.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Assistant, TurnRole::User, TurnRole::Assistant]
        );
        assert_eq!(history[1].content, "seen 2");
        assert_eq!(history[3].content, "seen 4");
    }

    #[tokio::test]
    async fn test_different_conversations_run_concurrently() {
        // Both calls must be in flight at the same time to pass the barrier.
        let barrier = Arc::new(Barrier::new(2));
        let orch = orchestrator(Behavior::Rendezvous(barrier));

        let (conv_a, conv_b) = (id("a"), id("b"));
        let both = async { tokio::join!(orch.handle(&conv_a, "x"), orch.handle(&conv_b, "y")) };
        let (a, b) = tokio::time::timeout(Duration::from_secs(5), both)
            .await
            .expect("rounds on different conversations blocked each other");

        assert_eq!(a, TurnOutcome::Replied("met".to_string()));
        assert_eq!(b, TurnOutcome::Replied("met".to_string()));
    }

    #[tokio::test]
    async fn test_clear_waits_for_in_flight_round() {
        let orch = Arc::new(orchestrator(Behavior::SlowCount(Duration::from_millis(30))));
        let conv = id("clear");

        let round = {
            let orch = Arc::clone(&orch);
            let conv = conv.clone();
            tokio::spawn(async move { orch.handle(&conv, "hello").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        orch.clear(&conv).await;

        assert!(matches!(round.await.unwrap(), TurnOutcome::Replied(_)));
        assert!(orch.store().get(&conv).is_empty());
    }

    #[tokio::test]
    async fn test_clear_unknown_conversation_is_noop() {
        let orch = orchestrator(Behavior::Reply("ok"));
        orch.handle(&id("keep"), "hi").await;

        orch.clear(&id("missing")).await;

        assert_eq!(orch.store().get(&id("keep")).len(), 2);
    }

    #[test]
    fn test_settings_from_config_derive_char_ceiling() {
        let settings = TurnSettings::from_config(&ModelConfig::default());
        assert_eq!(settings.max_input_chars, 32_000);
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.max_output_tokens, 2048);
    }
}
