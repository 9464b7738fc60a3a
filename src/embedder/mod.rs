//! Query encoders that turn question text into dense vectors.

pub mod openai;

use crate::error::ServiceError;

pub use openai::OpenAiEmbedder;

/// Converts text into a fixed-length embedding.
pub trait QueryEncoder: Send + Sync {
    /// Embeds a single non-empty string.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Model identifier, used for logging.
    fn model_name(&self) -> &str;
}
