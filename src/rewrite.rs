//! Optional reformulation of the question into retrieval-friendly legal terminology.

use crate::error::ServiceError;
use crate::language::Language;
use crate::providers::{LlmProvider, ProviderRequest};

const REWRITE_TEMPERATURE: f32 = 0.0;
const REWRITE_MAX_TOKENS: usize = 200;

/// Asks the completion service to restate a question for vector search.
#[derive(Debug, Clone, Copy)]
pub struct QueryRewriter {
    temperature: f32,
    max_tokens: usize,
}

impl Default for QueryRewriter {
    fn default() -> Self {
        Self {
            temperature: REWRITE_TEMPERATURE,
            max_tokens: REWRITE_MAX_TOKENS,
        }
    }
}

impl QueryRewriter {
    /// Returns the rewritten question.
    ///
    /// An empty rewrite is reported as [`ServiceError::Malformed`] so the
    /// caller can fall back to the original text.
    pub fn rewrite(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
    ) -> Result<String, ServiceError> {
        let system = instruction(Language::detect(question));
        let request = ProviderRequest {
            system: &system,
            user: question.trim(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let raw = provider.answer(&request)?;
        clean(&raw).ok_or_else(|| ServiceError::Malformed("rewrite was empty".into()))
    }
}

fn instruction(language: Language) -> String {
    format!(
        "You reformulate questions for a search engine over statutory legal articles. \
         Rewrite the user's question using precise legal terminology as it would appear in the text of a law. \
         Keep any article numbers or law names it mentions. \
         Write the result in {}. \
         Reply with the rewritten question only, without explanation.",
        language.name()
    )
}

fn clean(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|ch| matches!(ch, '"' | '\'' | '«' | '»' | '“' | '”'))
        .trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_and_whitespace() {
        assert_eq!(
            clean("  \"ما أحكام تعديل المادة الثامنة؟\"\n").as_deref(),
            Some("ما أحكام تعديل المادة الثامنة؟")
        );
        assert_eq!(clean("« »"), None);
        assert_eq!(clean(""), None);
    }

    #[test]
    fn instruction_names_the_language() {
        assert!(instruction(Language::Arabic).contains("Write the result in Arabic."));
        assert!(instruction(Language::English).contains("rewritten question only"));
    }
}
