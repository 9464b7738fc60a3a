//! Error taxonomy for the question-answering pipeline.
//!
//! External clients report [`ServiceError`]; the pipeline tags each one with
//! the stage that produced it and surfaces a [`PipelineError`]. An empty
//! retrieval is not an error and never appears here.

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Pipeline stage that issued an external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Optional query reformulation through the completion service.
    Rewrite,
    /// Question embedding.
    Embedding,
    /// Nearest-neighbour search against the vector store.
    Retrieval,
    /// Answer synthesis through the completion service.
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Rewrite => "query rewrite",
            Stage::Embedding => "embedding",
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
        };
        f.write_str(label)
    }
}

/// Failure reported by one of the external service clients.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The client-side timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Transport failure before a response arrived.
    #[error("HTTP request error: {0}")]
    Http(reqwest::Error),

    /// Non-success HTTP status.
    #[error("service returned {status}: {body}")]
    Status {
        /// Response status code.
        status: StatusCode,
        /// Response body, when readable.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else if err.is_decode() {
            ServiceError::Malformed(err.to_string())
        } else {
            ServiceError::Http(err)
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Malformed(err.to_string())
    }
}

/// Request-fatal failures surfaced to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Empty question or unusable request parameters.
    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    /// The embedding service failed.
    #[error("query encoding failed: {0}")]
    Encoding(String),

    /// The vector store failed or rejected the query vector.
    #[error("article retrieval failed: {0}")]
    Retrieval(String),

    /// The completion service failed or returned no text.
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// An external call exceeded its timeout.
    #[error("{stage} call timed out")]
    Timeout {
        /// Stage whose call timed out.
        stage: Stage,
    },
}

impl PipelineError {
    /// Attributes a client failure to the stage that made the call.
    ///
    /// Rewrite failures map onto `Generation` because they come from the
    /// completion service; the pipeline normally swallows them anyway.
    pub fn from_service(stage: Stage, err: ServiceError) -> Self {
        let message = err.to_string();
        match (stage, err) {
            (stage, ServiceError::Timeout) => PipelineError::Timeout { stage },
            (Stage::Embedding, _) => PipelineError::Encoding(message),
            (Stage::Retrieval, _) => PipelineError::Retrieval(message),
            (Stage::Rewrite | Stage::Generation, _) => PipelineError::Generation(message),
        }
    }

    /// True for operational faults, false for problems with the user's input.
    pub fn is_service_failure(&self) -> bool {
        !matches!(self, PipelineError::InvalidQuestion(_))
    }

    /// Stable machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidQuestion(_) => "invalid_question",
            PipelineError::Encoding(_) => "encoding_failure",
            PipelineError::Retrieval(_) => "retrieval_failure",
            PipelineError::Generation(_) => "generation_failure",
            PipelineError::Timeout { .. } => "timeout",
        }
    }
}
