//! LLM provider implementations and the provider factory.

pub mod gemini;
pub mod openai_compat;

use secrecy::{ExposeSecret, SecretString};

use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::llm::provider::LlmProvider;
use parley_types::config::ModelConfig;
use parley_types::llm::{CompletionRequest, LlmError, Message, MessageRole, ProviderType};

use self::gemini::GeminiProvider;
use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] from a [`ModelConfig`].
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn create_provider(
    config: &ModelConfig,
    api_key: &SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    match config.provider {
        ProviderType::Gemini => {
            let mut provider =
                GeminiProvider::new(api_key.clone(), config.name.clone(), config.preamble_style)?;
            if let Some(base_url) = config.base_url.as_deref() {
                provider = provider.with_base_url(base_url);
            }
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderType::OpenAiCompatible => {
            let key = api_key.expose_secret();
            let provider = match config.base_url.as_deref() {
                Some(base_url) => OpenAiCompatibleProvider::new(openai_compat::config::custom(
                    base_url,
                    key,
                    &config.name,
                )),
                None => OpenAiCompatibleProvider::gemini(key, &config.name),
            };
            Ok(BoxLlmProvider::new(provider))
        }
    }
}

/// Verify provider connectivity with a tiny completion request.
///
/// # Errors
///
/// Returns the LLM error if the provider fails to respond.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![Message::new(MessageRole::User, "Hello")],
        max_tokens: 16,
        temperature: Some(0.0),
    };
    provider.complete(&request).await?;
    Ok(())
}
