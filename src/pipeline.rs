//! End-to-end question answering: rewrite, embed, retrieve, generate.

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::article::Article;
use crate::embedder::QueryEncoder;
use crate::error::{PipelineError, Stage};
use crate::generator::AnswerGenerator;
use crate::language::Language;
use crate::prompt::Prompt;
use crate::providers::LlmProvider;
use crate::retriever;
use crate::rewrite::QueryRewriter;
use crate::vector_store::VectorStore;

/// Default number of nearest articles requested per question.
pub const DEFAULT_LIMIT: usize = 15;

/// Per-request behavior that does not depend on which services are wired in.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Nearest-neighbour result count.
    pub limit: usize,
    /// Reformulate the question before embedding it.
    pub rewrite_queries: bool,
    /// Answer synthesis settings.
    pub generator: AnswerGenerator,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            rewrite_queries: false,
            generator: AnswerGenerator::default(),
        }
    }
}

/// Long-lived service handles plus configuration, built once at startup.
pub struct Assistant {
    encoder: Box<dyn QueryEncoder>,
    store: Box<dyn VectorStore>,
    provider: Box<dyn LlmProvider>,
    rewriter: QueryRewriter,
    config: AssistantConfig,
}

/// Result of one question.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Grounded answer plus the articles it was grounded in.
    Answered(Answer),
    /// Retrieval found nothing citable; no answer was generated.
    NoMatches {
        /// Question language, for localized rendering.
        language: Language,
        /// Text used for retrieval when it differs from the question.
        #[serde(skip_serializing_if = "Option::is_none")]
        rewritten_query: Option<String>,
    },
}

impl Outcome {
    /// Language of the question that produced this outcome.
    pub fn language(&self) -> Language {
        match self {
            Outcome::Answered(answer) => answer.language,
            Outcome::NoMatches { language, .. } => *language,
        }
    }
}

/// A generated answer with its sources.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Trimmed completion text.
    pub answer: String,
    /// Articles passed as context, in retrieval order.
    pub articles: Vec<Article>,
    /// Question language.
    pub language: Language,
    /// Text used for retrieval when it differs from the question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
}

/// Everything up to (not including) the completion call.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Filtered retrieval result.
    pub articles: Vec<Article>,
    /// Text used for retrieval when it differs from the question.
    pub rewritten_query: Option<String>,
    /// Prompt that would be sent; `None` when there is nothing to ground on.
    pub prompt: Option<Prompt>,
}

impl Assistant {
    /// Wires the three services together.
    pub fn new(
        encoder: Box<dyn QueryEncoder>,
        store: Box<dyn VectorStore>,
        provider: Box<dyn LlmProvider>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            encoder,
            store,
            provider,
            rewriter: QueryRewriter::default(),
            config,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Answers `question` with the configured result limit.
    pub fn ask(&self, question: &str) -> Result<Outcome, PipelineError> {
        self.ask_with_limit(question, self.config.limit)
    }

    /// Answers `question`, requesting `limit` nearest articles.
    pub fn ask_with_limit(&self, question: &str, limit: usize) -> Result<Outcome, PipelineError> {
        let span = info_span!("ask", limit);
        let _guard = span.enter();
        let question = validate(question)?;
        let language = Language::detect(question);
        let (articles, rewritten_query) = self.retrieve(question, limit)?;
        if articles.is_empty() {
            info!("no citable articles retrieved; skipping generation");
            return Ok(Outcome::NoMatches {
                language,
                rewritten_query,
            });
        }
        let answer = self
            .config
            .generator
            .generate(self.provider.as_ref(), question, &articles)?;
        info!(
            articles = articles.len(),
            answer_chars = answer.chars().count(),
            "answered question"
        );
        Ok(Outcome::Answered(Answer {
            answer,
            articles,
            language,
            rewritten_query,
        }))
    }

    /// Runs every stage except generation and returns the prompt it would use.
    pub fn prepare(&self, question: &str, limit: usize) -> Result<Prepared, PipelineError> {
        let question = validate(question)?;
        let (articles, rewritten_query) = self.retrieve(question, limit)?;
        let prompt = (!articles.is_empty())
            .then(|| self.config.generator.prompt(question, &articles));
        Ok(Prepared {
            articles,
            rewritten_query,
            prompt,
        })
    }

    fn retrieve(
        &self,
        question: &str,
        limit: usize,
    ) -> Result<(Vec<Article>, Option<String>), PipelineError> {
        if limit == 0 {
            return Err(PipelineError::InvalidQuestion(
                "result limit must be at least 1".into(),
            ));
        }
        let rewritten_query = if self.config.rewrite_queries {
            self.rewrite(question)
        } else {
            None
        };
        let search_text = rewritten_query.as_deref().unwrap_or(question);
        let vector = self
            .encoder
            .embed(search_text)
            .map_err(|err| PipelineError::from_service(Stage::Embedding, err))?;
        debug!(
            model = self.encoder.model_name(),
            dimensions = vector.len(),
            "embedded question"
        );
        let articles = retriever::retrieve(self.store.as_ref(), &vector, limit)?;
        Ok((articles, rewritten_query))
    }

    fn rewrite(&self, question: &str) -> Option<String> {
        match self.rewriter.rewrite(self.provider.as_ref(), question) {
            Ok(rewritten) if rewritten != question => {
                info!(rewritten = %rewritten, "rewrote question for retrieval");
                Some(rewritten)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "query rewrite failed; retrieving with the original question");
                None
            }
        }
    }
}

fn validate(question: &str) -> Result<&str, PipelineError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidQuestion(
            "question must not be empty".into(),
        ));
    }
    Ok(trimmed)
}
