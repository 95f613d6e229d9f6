//! Application state wiring the proxy together.
//!
//! AppState holds the concrete instances shared by the webhook handlers and
//! the polling loop. Core types are generic over the provider; AppState pins
//! them to `BoxLlmProvider` so the backend is chosen from config at runtime.

use std::sync::Arc;

use parley_core::channel::dispatcher::{HistoryDisplay, UpdateDispatcher};
use parley_core::conversation::context::ContextBuilder;
use parley_core::conversation::orchestrator::{TurnOrchestrator, TurnSettings};
use parley_core::conversation::store::ConversationStore;
use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::llm::provider::LlmProvider;
use parley_infra::llm::create_provider;
use parley_infra::secret::Secrets;
use parley_infra::telegram::TelegramChannel;
use parley_types::channel::InboundMessage;
use parley_types::config::ProxyConfig;

pub type ConcreteDispatcher = UpdateDispatcher<BoxLlmProvider>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub channel: Arc<TelegramChannel>,
    pub config: Arc<ProxyConfig>,
}

impl AppState {
    /// Build the model provider and Telegram client from config + secrets.
    pub fn init(config: ProxyConfig, secrets: &Secrets) -> anyhow::Result<Self> {
        let provider = create_provider(&config.model, &secrets.model_api_key)?;
        let channel = TelegramChannel::new(secrets.telegram_token.clone())?;
        Ok(Self::from_parts(config, provider, channel))
    }

    /// Wire the store, orchestrator and dispatcher around a provider.
    pub fn from_parts(config: ProxyConfig, provider: BoxLlmProvider, channel: TelegramChannel) -> Self {
        tracing::info!(
            provider = provider.name(),
            model = %config.model.name,
            max_rounds = config.history.max_rounds,
            "Conversation engine ready"
        );

        let orchestrator = TurnOrchestrator::new(
            provider,
            ConversationStore::new(config.history.max_rounds),
            ContextBuilder::new(config.bot.preamble.clone()),
            TurnSettings::from_config(&config.model),
        );
        let dispatcher = UpdateDispatcher::new(
            Arc::new(orchestrator),
            HistoryDisplay::from(&config.bot),
        );

        Self {
            dispatcher: Arc::new(dispatcher),
            channel: Arc::new(channel),
            config: Arc::new(config),
        }
    }

    /// Handle `inbound` on a background task: dispatch, then reply.
    pub fn spawn_delivery(&self, inbound: InboundMessage) {
        self.spawn_batch(vec![inbound]);
    }

    /// Handle several messages of one conversation in order on one task.
    pub fn spawn_batch(&self, batch: Vec<InboundMessage>) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let channel = Arc::clone(&self.channel);
        tokio::spawn(async move {
            for inbound in batch {
                dispatcher.deliver(channel.as_ref(), inbound).await;
            }
        });
    }
}
