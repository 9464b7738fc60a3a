//! Presentation boundary: answer text, cited sources, and the empty/error states.

use std::io::{self, Write};

use serde::Serialize;

use crate::article::Article;
use crate::error::PipelineError;
use crate::language::Language;
use crate::pipeline::Outcome;

/// Display primitives a front-end must provide.
pub trait Presenter {
    /// Shows the generated answer.
    fn render_answer(&mut self, answer: &str) -> io::Result<()>;
    /// Shows the cited sources as (title, body) pairs in retrieval order.
    fn render_sources(&mut self, sources: &[(String, String)]) -> io::Result<()>;
    /// Signals that no citable article matched the question.
    fn render_empty(&mut self) -> io::Result<()>;
    /// Reports a request-fatal failure.
    fn render_error(&mut self, err: &PipelineError) -> io::Result<()>;
}

/// Drives `presenter` for one pipeline result.
pub fn present(
    presenter: &mut dyn Presenter,
    result: &Result<Outcome, PipelineError>,
) -> io::Result<()> {
    match result {
        Ok(Outcome::Answered(answer)) => {
            presenter.render_answer(&answer.answer)?;
            presenter.render_sources(&source_entries(&answer.articles, answer.language))
        }
        Ok(Outcome::NoMatches { .. }) => presenter.render_empty(),
        Err(err) => presenter.render_error(err),
    }
}

/// Maps articles onto (title, body) display pairs.
///
/// Titles carry the parent law, or the localized placeholder when the store
/// had none, so same-numbered articles from different laws stay apart.
pub fn source_entries(articles: &[Article], language: Language) -> Vec<(String, String)> {
    articles
        .iter()
        .map(|article| {
            let title = format!(
                "{} ({})",
                article.display_title(language),
                article.law_title_or_default(language)
            );
            (title, article.text.trim().to_string())
        })
        .collect()
}

struct Labels {
    answer: &'static str,
    sources: &'static str,
    empty: &'static str,
    service_error: &'static str,
    invalid: &'static str,
}

impl Labels {
    fn for_language(language: Language) -> Self {
        match language {
            Language::Arabic => Labels {
                answer: "الإجابة",
                sources: "المواد القانونية المسترجعة",
                empty: "لم يتم العثور على مواد قانونية مناسبة لهذا السؤال.",
                service_error: "تعذر إكمال الطلب بسبب خطأ في الخدمة",
                invalid: "السؤال غير صالح",
            },
            Language::English => Labels {
                answer: "Answer",
                sources: "Retrieved legal articles",
                empty: "No matching legal provisions were found for this question.",
                service_error: "The request failed because of a service error",
                invalid: "Invalid question",
            },
        }
    }
}

/// Plain-text presenter for terminals and logs.
pub struct TerminalPresenter<W: Write> {
    out: W,
    labels: Labels,
}

impl<W: Write> TerminalPresenter<W> {
    /// Creates a presenter with labels in `language`.
    pub fn new(out: W, language: Language) -> Self {
        Self {
            out,
            labels: Labels::for_language(language),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render_answer(&mut self, answer: &str) -> io::Result<()> {
        writeln!(self.out, "--- {} ---\n{}\n", self.labels.answer, answer)
    }

    fn render_sources(&mut self, sources: &[(String, String)]) -> io::Result<()> {
        writeln!(self.out, "--- {} ---", self.labels.sources)?;
        for (idx, (title, body)) in sources.iter().enumerate() {
            writeln!(self.out, "[{}] {}\n{}\n", idx + 1, title, body)?;
        }
        Ok(())
    }

    fn render_empty(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", self.labels.empty)
    }

    fn render_error(&mut self, err: &PipelineError) -> io::Result<()> {
        let label = if err.is_service_failure() {
            self.labels.service_error
        } else {
            self.labels.invalid
        };
        writeln!(self.out, "{label}: {err}")
    }
}

/// JSON body describing a failed request.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Machine-readable error kind.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl From<&PipelineError> for ErrorReport {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
