//! GeminiProvider -- [`LlmProvider`] over the native Gemini
//! `generateContent` endpoint.
//!
//! The `System` preamble goes either into `systemInstruction` or, with
//! [`PreambleStyle::ModelTurn`], in front of the history as a `model` turn.
//! Assistant turns are sent with role `model`.
//!
//! The API key is wrapped in [`SecretString`] and sent in the
//! `x-goog-api-key` header, never in the URL.

pub mod types;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use parley_core::llm::provider::LlmProvider;
use parley_observe::genai_attrs::PROVIDER_GEMINI;
use parley_types::config::PreambleStyle;
use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities, StopReason,
    Usage,
};

use self::types::{
    GeminiContent, GeminiErrorResponse, GeminiGenerationConfig, GeminiRequest, GeminiResponse,
};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini native API provider.
///
/// Does NOT derive Debug; it holds the API key.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    preamble_style: PreambleStyle,
    capabilities: ProviderCapabilities,
}

impl GeminiProvider {
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        preamble_style: PreambleStyle,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        let model = model.into();
        let capabilities = Self::capabilities_for_model(&model);

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            model,
            preamble_style,
            capabilities,
        })
    }

    /// Override the base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_output_tokens = if model.starts_with("gemini-2.5") {
            65_536
        } else {
            8_192
        };
        ProviderCapabilities { max_output_tokens }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn resolve_model<'a>(&'a self, request: &'a CompletionRequest) -> &'a str {
        if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        }
    }

    /// Translate a generic request into the Gemini wire shape.
    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut contents = Vec::with_capacity(request.messages.len());

        for msg in &request.messages {
            match (msg.role, self.preamble_style) {
                (MessageRole::System, PreambleStyle::SystemInstruction) => {
                    system_parts.push(&msg.content);
                }
                (MessageRole::System, PreambleStyle::ModelTurn) | (MessageRole::Assistant, _) => {
                    contents.push(GeminiContent::text(Some("model"), msg.content.clone()));
                }
                (MessageRole::User, _) => {
                    contents.push(GeminiContent::text(Some("user"), msg.content.clone()));
                }
            }
        }

        let system_instruction =
            (!system_parts.is_empty()).then(|| GeminiContent::text(None, system_parts.join("\n\n")));

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: (request.max_tokens > 0).then_some(request.max_tokens),
                temperature: request.temperature,
            }),
        }
    }

    /// Turn a parsed response into a [`CompletionResponse`].
    fn normalize_response(
        resp: GeminiResponse,
        requested_model: &str,
    ) -> Result<CompletionResponse, LlmError> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            let reason = resp
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "none given".to_string());
            warn!(block_reason = %reason, "Gemini returned no candidates");
            return Err(LlmError::EmptyResponse);
        };

        let content: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text)
            .collect();

        let stop_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") | None => StopReason::EndTurn,
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
                StopReason::Safety
            }
            Some(_) => StopReason::Other,
        };

        Ok(CompletionResponse {
            id: resp.response_id.unwrap_or_default(),
            content,
            model: resp
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
            stop_reason,
            usage: Usage {
                input_tokens: resp.usage_metadata.prompt_token_count,
                output_tokens: resp.usage_metadata.candidates_token_count,
            },
        })
    }
}

/// Map a non-success HTTP status and body to an [`LlmError`].
fn map_status(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| match e.error.status {
            Some(s) => format!("{s}: {}", e.error.message),
            None => e.error.message,
        })
        .unwrap_or_else(|_| body.to_string());

    match status {
        400 => LlmError::InvalidRequest(message),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        503 => LlmError::Overloaded(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_GEMINI
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = self.resolve_model(request);
        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| LlmError::Provider {
            message: format!("failed to read response: {e}"),
        })?;

        if !status.is_success() {
            return Err(map_status(status.as_u16(), &text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        Self::normalize_response(parsed, model)
    }
}
