//! Configuration and per-endpoint defaults for the OpenAI-compatible provider.

use parley_types::llm::ProviderCapabilities;

/// Gemini's OpenAI-compatible endpoint.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Configuration for an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g., "gemini-2.5-flash", "gpt-4o-mini").
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// Google Gemini through its OpenAI-compatible beta endpoint.
///
/// 64K output.
pub fn gemini_defaults(api_key: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        base_url: GEMINI_OPENAI_BASE.into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_output_tokens: 65_536,
        },
    }
}

/// Any other OpenAI-compatible endpoint. Conservative limits.
pub fn custom(base_url: &str, api_key: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        base_url: base_url.trim_end_matches('/').into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_output_tokens: 16_384,
        },
    }
}
