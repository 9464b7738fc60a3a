//! Vector store clients and the shared collection-name helper.

pub mod qdrant;
pub mod weaviate;

use anyhow::Result;

use crate::article::Article;
use crate::error::ServiceError;

pub use qdrant::{QdrantStore, ScoreKind};
pub use weaviate::WeaviateStore;

/// Default article collection name.
pub const DEFAULT_COLLECTION: &str = "LawArticle";

/// Nearest-neighbour search over an article index.
pub trait VectorStore: Send + Sync {
    /// Returns up to `limit` records ordered by ascending distance to `vector`.
    fn nearest(&self, vector: &[f32], limit: usize) -> Result<Vec<Article>, ServiceError>;

    /// Dimensionality the index was built with, when known.
    fn index_dimensions(&self) -> Option<usize>;

    /// Short backend label for logs.
    fn backend(&self) -> &'static str;
}

/// Validated collection identifier shared by the store clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName {
    name: String,
}

impl CollectionName {
    /// Builds a new collection identifier.
    pub fn new<S>(name: S) -> Result<Self>
    where
        S: Into<String>,
    {
        let name = name.into().trim().to_string();
        anyhow::ensure!(!name.is_empty(), "collection name is required");
        anyhow::ensure!(
            name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic()),
            "collection name must start with a letter: {name}"
        );
        anyhow::ensure!(
            name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_'),
            "collection name may only contain ASCII letters, digits, and underscores: {name}"
        );
        Ok(Self { name })
    }

    /// Returns the raw name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Weaviate stores class names with a capitalized first letter.
    pub fn weaviate_class(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_collection_names() {
        assert!(CollectionName::new("LawArticle").is_ok());
        assert!(CollectionName::new("legal_rag_jo2").is_ok());
        assert!(CollectionName::new("  ").is_err());
        assert!(CollectionName::new("2laws").is_err());
        assert!(CollectionName::new("law-articles").is_err());
        assert!(CollectionName::new("Law{Article}").is_err());
    }

    #[test]
    fn weaviate_class_is_capitalized() {
        let name = CollectionName::new("legalragjo").unwrap();
        assert_eq!(name.weaviate_class(), "Legalragjo");
        assert_eq!(name.as_str(), "legalragjo");
        let name = CollectionName::new(DEFAULT_COLLECTION).unwrap();
        assert_eq!(name.weaviate_class(), "LawArticle");
    }
}
