//! Instruction builder for grounded answer synthesis.
//!
//! Every answer style the assistant supports is a combination of the
//! [`PromptOptions`] axes. [`Preset`] names the combinations that have been
//! deployed so far.

use clap::ValueEnum;
use serde::Serialize;

use crate::article::Article;
use crate::language::Language;

/// How long and in what shape the answer should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// One short coherent paragraph.
    Terse,
    /// Numbered points, each tied to the provision it relies on.
    Structured,
    /// Consultant tone, closing with a mandatory disclaimer.
    Expert,
}

/// When article numbers may appear in the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationPolicy {
    /// Never mention article or law numbers.
    Never,
    /// Only when the user asks for them.
    OnRequest,
    /// Cite every statement.
    Always,
}

/// Treatment of original/amended pairs of the same provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmendmentPolicy {
    /// Amended text controls; comparisons only on request, as before/after statements.
    PreferAmended,
    /// No amendment rule in the instruction.
    Unspecified,
}

/// Which chat channel carries what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLayout {
    /// Rules, context and question all in the system message; empty user turn.
    SystemOnly,
    /// Rules in the system message; context and question in the user turn.
    SystemAndUser,
}

/// Named option combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Brief single paragraph, numbers only on request.
    Concise,
    /// Numbered points that always cite.
    Structured,
    /// Consultant tone with disclaimer.
    Expert,
}

impl Preset {
    /// Expands the preset into concrete options.
    pub fn options(self) -> PromptOptions {
        match self {
            Preset::Concise => PromptOptions {
                verbosity: Verbosity::Terse,
                citations: CitationPolicy::OnRequest,
                amendments: AmendmentPolicy::PreferAmended,
                layout: MessageLayout::SystemOnly,
                jurisdiction: Some(DEFAULT_JURISDICTION.to_string()),
            },
            Preset::Structured => PromptOptions {
                verbosity: Verbosity::Structured,
                citations: CitationPolicy::Always,
                amendments: AmendmentPolicy::PreferAmended,
                layout: MessageLayout::SystemAndUser,
                jurisdiction: Some(DEFAULT_JURISDICTION.to_string()),
            },
            Preset::Expert => PromptOptions {
                verbosity: Verbosity::Expert,
                citations: CitationPolicy::OnRequest,
                amendments: AmendmentPolicy::PreferAmended,
                layout: MessageLayout::SystemAndUser,
                jurisdiction: Some(DEFAULT_JURISDICTION.to_string()),
            },
        }
    }
}

/// Jurisdiction named in the assistant persona unless overridden.
pub const DEFAULT_JURISDICTION: &str = "Jordanian";

/// Style and policy knobs for the answer instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    /// Answer length and shape.
    pub verbosity: Verbosity,
    /// Article-number citation policy.
    pub citations: CitationPolicy,
    /// Original/amended handling.
    pub amendments: AmendmentPolicy,
    /// Channel layout for the completion request.
    pub layout: MessageLayout,
    /// Adjective for the legal system, e.g. `Jordanian`.
    pub jurisdiction: Option<String>,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Preset::Concise.options()
    }
}

/// Completion-ready prompt split across the two chat channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System / instruction message.
    pub system: String,
    /// User message; empty for [`MessageLayout::SystemOnly`].
    pub user: String,
}

/// Serializes articles into the context block, most relevant first.
pub fn render_context(articles: &[Article], language: Language) -> String {
    articles
        .iter()
        .map(|article| render_article(article, language))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_article(article: &Article, language: Language) -> String {
    let mut block = String::new();
    if let Some(law) = article.law_title.as_deref() {
        block.push_str(&format!("{}: {}\n", language.law_label(), law));
    }
    block.push_str(&format!(
        "{} {}: {}\n",
        language.article_label(),
        article.number(),
        article.title()
    ));
    block.push_str(article.text.trim());
    block
}

/// Builds grounded answer instructions from [`PromptOptions`].
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    options: PromptOptions,
}

impl PromptBuilder {
    /// Creates a builder for the given options.
    pub fn new(options: PromptOptions) -> Self {
        Self { options }
    }

    /// Persona line plus the numbered rules, without context or question.
    pub fn instructions(&self, language: Language) -> String {
        let persona = match self.options.jurisdiction.as_deref() {
            Some(jurisdiction) => format!(
                "You are a professional legal assistant for {jurisdiction} law."
            ),
            None => "You are a professional legal assistant.".to_string(),
        };
        let rules = self.rules(language);
        let mut out = persona;
        out.push_str(" When answering any legal question:\n\n");
        for (idx, rule) in rules.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, rule));
        }
        out
    }

    fn rules(&self, language: Language) -> Vec<String> {
        let mut rules = vec![
            "Rely only on the legal texts provided below. Do not use outside knowledge. If the texts do not answer the question, say so plainly.".to_string(),
            format!(
                "Answer in {}, the same language as the question.",
                language.name()
            ),
            "The legal texts are listed from most to least relevant to the question; give earlier texts more weight.".to_string(),
        ];
        rules.push(
            match self.options.verbosity {
                Verbosity::Terse => "Begin with a brief statement of what applies to the question. Write the answer as one coherent paragraph and avoid lengthy legal discussion unless the user asks for it.",
                Verbosity::Structured => "Organize the answer as numbered points. Base each point on a specific provision from the legal texts.",
                Verbosity::Expert => "Write in the tone of an experienced legal consultant. End the answer with a disclaimer stating that it is general information drawn from the provided texts and not a substitute for advice from a licensed lawyer.",
            }
            .to_string(),
        );
        rules.push(
            match self.options.citations {
                CitationPolicy::Never => "Do not mention article numbers or law numbers.",
                CitationPolicy::OnRequest => {
                    "Do not mention article numbers or law numbers unless the user asks for them."
                }
                CitationPolicy::Always => {
                    "Cite the article number and law title for every statement you make."
                }
            }
            .to_string(),
        );
        if self.options.amendments == AmendmentPolicy::PreferAmended {
            rules.push("When both an original and an amended version of the same provision appear, treat the amended version as the one currently in force. Compare the two versions only if the question asks what changed, and then state the comparison explicitly as before and after, without inferring anything beyond what the legal texts state.".to_string());
        }
        rules
    }

    /// Assembles the full prompt for `question` grounded in `articles`.
    pub fn build(&self, question: &str, articles: &[Article]) -> Prompt {
        let language = Language::detect(question);
        let instructions = self.instructions(language);
        let body = format!(
            "Legal texts:\n\n{}\n\nQuestion: {}\n\nAnswer:",
            render_context(articles, language),
            question.trim()
        );
        match self.options.layout {
            MessageLayout::SystemOnly => Prompt {
                system: format!("{instructions}\n{body}"),
                user: String::new(),
            },
            MessageLayout::SystemAndUser => Prompt {
                system: instructions,
                user: body,
            },
        }
    }
}
