#![warn(missing_docs)]
//! Retrieval-augmented question answering over a vector-indexed legal article corpus.
//!
//! A question is embedded, the nearest articles are fetched from the vector
//! store with whole-law metadata records filtered out, and a completion model
//! answers using only those articles.

pub mod api;
pub mod article;
pub mod config;
pub mod embedder;
pub mod error;
pub mod generator;
pub mod language;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod render;
pub mod retriever;
pub mod rewrite;
pub mod vector_store;

pub use article::{Article, LAW_METADATA_SENTINEL};
pub use config::{AnswerArgs, ServiceArgs};
pub use embedder::QueryEncoder;
pub use error::{PipelineError, ServiceError, Stage};
pub use generator::AnswerGenerator;
pub use language::Language;
pub use pipeline::{Answer, Assistant, AssistantConfig, Outcome, Prepared};
pub use prompt::{
    AmendmentPolicy, CitationPolicy, MessageLayout, Preset, Prompt, PromptBuilder, PromptOptions,
    Verbosity,
};
pub use providers::{LlmProvider, ProviderRequest};
pub use render::{Presenter, TerminalPresenter};
pub use vector_store::{CollectionName, VectorStore};
