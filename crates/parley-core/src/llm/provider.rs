//! LlmProvider trait definition.
//!
//! This is the seam between the turn orchestrator and a hosted model API.
//! Uses RPITIT for `complete`; `BoxLlmProvider` restores object safety.

use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

/// Trait for LLM provider backends (Gemini, OpenAI-compatible, ...).
///
/// Implementations live in parley-infra (e.g., `GeminiProvider`). The
/// orchestrator treats a provider as an opaque
/// `generate(context) -> text | failure` function.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// The model this provider sends requests to when the request leaves
    /// `model` empty.
    fn model(&self) -> &str;

    /// What this provider supports.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
