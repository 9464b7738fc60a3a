//! Grounded answer synthesis.

use tracing::debug;

use crate::article::Article;
use crate::error::{PipelineError, Stage};
use crate::prompt::{Prompt, PromptBuilder};
use crate::providers::{LlmProvider, ProviderRequest};

/// Sampling defaults for answer synthesis.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Completion token cap for answers.
pub const DEFAULT_MAX_COMPLETION_TOKENS: usize = 800;

/// Builds the instruction and runs exactly one completion per question.
#[derive(Debug, Clone)]
pub struct AnswerGenerator {
    builder: PromptBuilder,
    temperature: f32,
    max_tokens: usize,
}

impl AnswerGenerator {
    /// Creates a generator with explicit sampling settings.
    pub fn new(builder: PromptBuilder, temperature: f32, max_tokens: usize) -> Self {
        Self {
            builder,
            temperature,
            max_tokens: max_tokens.max(1),
        }
    }

    /// Prompt that [`generate`](Self::generate) would send.
    pub fn prompt(&self, question: &str, articles: &[Article]) -> Prompt {
        self.builder.build(question, articles)
    }

    /// Produces the trimmed answer text.
    pub fn generate(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        articles: &[Article],
    ) -> Result<String, PipelineError> {
        let prompt = self.prompt(question, articles);
        let request = ProviderRequest {
            system: &prompt.system,
            user: &prompt.user,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(
            provider = provider.name(),
            articles = articles.len(),
            prompt_chars = prompt.system.len() + prompt.user.len(),
            "requesting answer"
        );
        let raw = provider
            .answer(&request)
            .map_err(|err| PipelineError::from_service(Stage::Generation, err))?;
        let answer = raw.trim();
        if answer.is_empty() {
            return Err(PipelineError::Generation(
                "completion service returned an empty answer".into(),
            ));
        }
        Ok(answer.to_string())
    }
}

impl Default for AnswerGenerator {
    fn default() -> Self {
        Self::new(
            PromptBuilder::default(),
            DEFAULT_TEMPERATURE,
            DEFAULT_MAX_COMPLETION_TOKENS,
        )
    }
}
