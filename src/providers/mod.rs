//! Completion providers used for query rewriting and answer synthesis.

mod anthropic;
mod openai;

use crate::error::ServiceError;

pub use anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_MODEL};
pub use openai::{OpenAiProvider, DEFAULT_CHAT_MODEL};

/// Trait implemented by concrete LLM providers.
pub trait LlmProvider: Send + Sync {
    /// Runs one completion and returns the raw generated text.
    fn answer(&self, request: &ProviderRequest) -> Result<String, ServiceError>;

    /// Provider label for logs.
    fn name(&self) -> &'static str;
}

/// Request envelope shared by the various providers.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    /// Instruction channel; may be empty.
    pub system: &'a str,
    /// User turn; may be empty when the whole prompt lives in `system`.
    pub user: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: usize,
}
