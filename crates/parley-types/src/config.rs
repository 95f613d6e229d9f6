//! Configuration types for Parley.
//!
//! `ProxyConfig` represents the optional `config.toml` that tunes history
//! retention, the model call, and the bot's canned texts. Every field has a
//! default, so an empty file (or no file) is a valid configuration.
//! Secrets never live here; they come from the environment.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderType;

/// Instruction block sent ahead of every conversation.
pub const DEFAULT_PREAMBLE: &str = "\
## Role
You are a friendly, professional English tutor. You correct the user's grammar, \
vocabulary and sentence fluency.
- Tone: warm, encouraging and positive, e.g. \"Nice! Just one small fix here...\"
- For each sentence the user sends: 1. Restate the corrected sentence. \
2. Explain the mistake simply and clearly. 3. Give one or two similar example sentences. \
4. Suggest what to practise next.
- If the user asks for news or reading material, recommend a short, simple English \
news summary or article on a topic of your choice, followed by 3-5 key words with \
short explanations.
- Reply mainly in English; use the user's language only to clarify difficult grammar.
- Keep replies concise and fun.
";

/// Top-level configuration for the proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Rolling history retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of user+assistant rounds kept per conversation.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

fn default_max_rounds() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

/// How the preamble reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreambleStyle {
    /// Native system-instruction slot of the target API.
    #[default]
    SystemInstruction,
    /// First context entry, tagged with the model's own role.
    ModelTurn,
}

/// Language model selection and call limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ProviderType,

    #[serde(default = "default_model_name")]
    pub name: String,

    /// Override the provider's default API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Upper bound on a single model call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Ceiling on the inbound message, in estimated tokens.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: u32,

    #[serde(default)]
    pub preamble_style: PreambleStyle,
}

fn default_model_name() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_max_input_tokens() -> u32 {
    8000
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            name: default_model_name(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
            temperature: None,
            max_input_tokens: default_max_input_tokens(),
            preamble_style: PreambleStyle::default(),
        }
    }
}

/// Bot persona and display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_preamble")]
    pub preamble: String,

    /// Most recent turns shown by `/history`.
    #[serde(default = "default_history_display_turns")]
    pub history_display_turns: usize,

    /// Per-turn character cut for `/history`.
    #[serde(default = "default_history_display_chars")]
    pub history_display_chars: usize,
}

fn default_preamble() -> String {
    DEFAULT_PREAMBLE.to_string()
}

fn default_history_display_turns() -> usize {
    10
}

fn default_history_display_chars() -> usize {
    100
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            preamble: default_preamble(),
            history_display_turns: default_history_display_turns(),
            history_display_chars: default_history_display_chars(),
        }
    }
}

/// Push-delivery endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// URL path segment Telegram posts updates to.
    #[serde(default = "default_webhook_path")]
    pub path: String,
}

fn default_webhook_path() -> String {
    "telegram".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: default_webhook_path(),
        }
    }
}
