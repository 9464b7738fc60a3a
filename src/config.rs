//! Command-line and environment configuration shared by the binaries.
//!
//! Credentials are only ever read from flags, the environment, or a local
//! `.env` file loaded by the binaries.

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::embedder::openai::DEFAULT_EMBEDDING_MODEL;
use crate::embedder::{OpenAiEmbedder, QueryEncoder};
use crate::generator::{AnswerGenerator, DEFAULT_MAX_COMPLETION_TOKENS, DEFAULT_TEMPERATURE};
use crate::pipeline::{Assistant, AssistantConfig, DEFAULT_LIMIT};
use crate::prompt::{
    AmendmentPolicy, CitationPolicy, MessageLayout, Preset, PromptBuilder, PromptOptions,
    Verbosity,
};
use crate::providers::{
    AnthropicProvider, LlmProvider, OpenAiProvider, DEFAULT_ANTHROPIC_MODEL, DEFAULT_CHAT_MODEL,
};
use crate::vector_store::{
    CollectionName, QdrantStore, ScoreKind, VectorStore, WeaviateStore, DEFAULT_COLLECTION,
};

/// Supported vector store backends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StoreBackend {
    /// Weaviate GraphQL near-vector search.
    Weaviate,
    /// Qdrant REST point search.
    Qdrant,
}

/// Supported completion providers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LlmBackend {
    /// OpenAI chat completions.
    Openai,
    /// Anthropic messages API.
    Anthropic,
}

/// Endpoints, credentials, models and timeouts for the external services.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// OpenAI API key used for query embeddings (and answers with the OpenAI provider)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    #[arg(
        long,
        env = "LEGALRAG_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Embedding model identifier; must match the model the index was built with
    #[arg(long, env = "LEGALRAG_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Optional embedding dimension override sent to the embedding service
    #[arg(long, env = "LEGALRAG_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Dimensionality of the article index (0 skips the check)
    #[arg(long, env = "LEGALRAG_INDEX_DIMENSIONS", default_value_t = 3072)]
    pub index_dimensions: usize,

    /// Vector store backend
    #[arg(long, env = "LEGALRAG_STORE", value_enum, default_value_t = StoreBackend::Weaviate)]
    pub store: StoreBackend,

    /// Weaviate cluster URL
    #[arg(long, env = "WEAVIATE_URL")]
    pub weaviate_url: Option<String>,

    /// Weaviate API key
    #[arg(long, env = "WEAVIATE_API_KEY", hide_env_values = true)]
    pub weaviate_api_key: Option<String>,

    /// Qdrant cluster URL
    #[arg(long, env = "QDRANT_URL")]
    pub qdrant_url: Option<String>,

    /// Qdrant API key (optional for local clusters)
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// How the Qdrant collection metric reports scores
    #[arg(
        long,
        env = "LEGALRAG_QDRANT_SCORE",
        value_enum,
        default_value_t = ScoreKind::Similarity
    )]
    pub qdrant_score: ScoreKind,

    /// Article collection name
    #[arg(long, env = "LEGALRAG_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Completion provider used for answers and query rewriting
    #[arg(long, env = "LEGALRAG_LLM_PROVIDER", value_enum, default_value_t = LlmBackend::Openai)]
    pub llm_provider: LlmBackend,

    /// OpenAI chat model used for synthesis
    #[arg(long, env = "LEGALRAG_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Anthropic API key (required when --llm-provider anthropic)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model identifier
    #[arg(long, env = "LEGALRAG_ANTHROPIC_MODEL", default_value = DEFAULT_ANTHROPIC_MODEL)]
    pub anthropic_model: String,

    /// Base URL for the Anthropic API
    #[arg(
        long,
        env = "LEGALRAG_ANTHROPIC_BASE",
        default_value = "https://api.anthropic.com/v1"
    )]
    pub anthropic_base_url: String,

    /// Seconds before an embedding request times out
    #[arg(long, env = "LEGALRAG_EMBEDDING_TIMEOUT_SECS", default_value_t = 10)]
    pub embedding_timeout_secs: u64,

    /// Seconds before a vector search times out
    #[arg(long, env = "LEGALRAG_RETRIEVAL_TIMEOUT_SECS", default_value_t = 10)]
    pub retrieval_timeout_secs: u64,

    /// Seconds before a completion request times out
    #[arg(long, env = "LEGALRAG_GENERATION_TIMEOUT_SECS", default_value_t = 60)]
    pub generation_timeout_secs: u64,
}

impl ServiceArgs {
    /// Builds the three service clients and wires them into an [`Assistant`].
    pub fn build_assistant(&self, config: AssistantConfig) -> Result<Assistant> {
        let encoder = self.build_encoder()?;
        let store = self.build_store()?;
        let provider = self.build_provider()?;
        Ok(Assistant::new(encoder, store, provider, config))
    }

    fn build_encoder(&self) -> Result<Box<dyn QueryEncoder>> {
        let key = self
            .openai_api_key
            .clone()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set for query embeddings"))?;
        Ok(Box::new(OpenAiEmbedder::new(
            key,
            self.openai_base_url.clone(),
            self.embedding_model.clone(),
            self.embedding_dimensions,
            secs(self.embedding_timeout_secs),
        )?))
    }

    fn build_store(&self) -> Result<Box<dyn VectorStore>> {
        let collection = CollectionName::new(self.collection.clone())?;
        let dimensions = (self.index_dimensions > 0).then_some(self.index_dimensions);
        let timeout = secs(self.retrieval_timeout_secs);
        match self.store {
            StoreBackend::Weaviate => {
                let url = self
                    .weaviate_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("WEAVIATE_URL must be set for the Weaviate store"))?;
                let key = self.weaviate_api_key.clone().ok_or_else(|| {
                    anyhow!("WEAVIATE_API_KEY must be set for the Weaviate store")
                })?;
                Ok(Box::new(WeaviateStore::new(
                    url, key, collection, dimensions, timeout,
                )?))
            }
            StoreBackend::Qdrant => {
                let url = self
                    .qdrant_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("QDRANT_URL must be set for the Qdrant store"))?;
                let store = QdrantStore::new(
                    url,
                    self.qdrant_api_key.clone(),
                    collection,
                    dimensions,
                    timeout,
                )?
                .with_score_kind(self.qdrant_score);
                Ok(Box::new(store))
            }
        }
    }

    fn build_provider(&self) -> Result<Box<dyn LlmProvider>> {
        let timeout = secs(self.generation_timeout_secs);
        match self.llm_provider {
            LlmBackend::Openai => {
                let key = self.openai_api_key.clone().ok_or_else(|| {
                    anyhow!("OPENAI_API_KEY must be set for the OpenAI provider")
                })?;
                Ok(Box::new(OpenAiProvider::new(
                    key,
                    &self.openai_base_url,
                    self.chat_model.clone(),
                    timeout,
                )?))
            }
            LlmBackend::Anthropic => {
                let key = self.anthropic_api_key.clone().ok_or_else(|| {
                    anyhow!("ANTHROPIC_API_KEY must be set for the Anthropic provider")
                })?;
                Ok(Box::new(AnthropicProvider::new(
                    key,
                    &self.anthropic_base_url,
                    self.anthropic_model.clone(),
                    timeout,
                )?))
            }
        }
    }
}

/// Retrieval size, rewriting, and answer style.
#[derive(Args, Debug, Clone)]
pub struct AnswerArgs {
    /// Number of nearest articles requested per question
    #[arg(long, env = "LEGALRAG_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Reformulate the question in legal terminology before retrieval
    #[arg(long, env = "LEGALRAG_REWRITE", default_value_t = false)]
    pub rewrite: bool,

    /// Answer style preset
    #[arg(long, env = "LEGALRAG_PRESET", value_enum, default_value_t = Preset::Concise)]
    pub preset: Preset,

    /// Override the preset's verbosity
    #[arg(long, value_enum)]
    pub verbosity: Option<Verbosity>,

    /// Override the preset's article-number citation policy
    #[arg(long, value_enum)]
    pub citations: Option<CitationPolicy>,

    /// Override the preset's amendment handling
    #[arg(long, value_enum)]
    pub amendments: Option<AmendmentPolicy>,

    /// Override the preset's message layout
    #[arg(long, value_enum)]
    pub layout: Option<MessageLayout>,

    /// Jurisdiction named in the assistant persona (empty drops it)
    #[arg(long, env = "LEGALRAG_JURISDICTION")]
    pub jurisdiction: Option<String>,

    /// Sampling temperature for the answer model
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum tokens to request from the completion model
    #[arg(long, default_value_t = DEFAULT_MAX_COMPLETION_TOKENS)]
    pub max_completion_tokens: usize,
}

impl AnswerArgs {
    /// Preset options with any explicit overrides applied.
    pub fn prompt_options(&self) -> PromptOptions {
        let mut options = self.preset.options();
        if let Some(verbosity) = self.verbosity {
            options.verbosity = verbosity;
        }
        if let Some(citations) = self.citations {
            options.citations = citations;
        }
        if let Some(amendments) = self.amendments {
            options.amendments = amendments;
        }
        if let Some(layout) = self.layout {
            options.layout = layout;
        }
        if let Some(jurisdiction) = &self.jurisdiction {
            let trimmed = jurisdiction.trim();
            options.jurisdiction = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        options
    }

    /// Converts the parsed flags into an [`AssistantConfig`].
    pub fn assistant_config(&self) -> AssistantConfig {
        AssistantConfig {
            limit: self.limit.max(1),
            rewrite_queries: self.rewrite,
            generator: AnswerGenerator::new(
                PromptBuilder::new(self.prompt_options()),
                self.temperature,
                self.max_completion_tokens,
            ),
        }
    }
}

/// Installs the stderr `tracing` subscriber; `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("legalrag=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}
