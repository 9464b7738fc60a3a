//! Nearest-neighbour article retrieval with the law-metadata post-filter.

use tracing::debug;

use crate::article::Article;
use crate::error::{PipelineError, Stage};
use crate::vector_store::VectorStore;

/// Searches `store` and returns at most `limit` citable articles, most similar first.
///
/// Sentinel law-metadata records are dropped and not backfilled, so the
/// result can be shorter than `limit` or empty.
pub fn retrieve(
    store: &dyn VectorStore,
    vector: &[f32],
    limit: usize,
) -> Result<Vec<Article>, PipelineError> {
    if limit == 0 {
        return Err(PipelineError::InvalidQuestion(
            "result limit must be at least 1".into(),
        ));
    }
    if let Some(expected) = store.index_dimensions() {
        if vector.len() != expected {
            return Err(PipelineError::Retrieval(format!(
                "query vector has {} dimensions but the {} index expects {}",
                vector.len(),
                store.backend(),
                expected
            )));
        }
    }
    let mut candidates = store
        .nearest(vector, limit)
        .map_err(|err| PipelineError::from_service(Stage::Retrieval, err))?;
    let returned = candidates.len();
    candidates.truncate(limit);
    let articles = without_law_metadata(candidates);
    debug!(
        backend = store.backend(),
        limit,
        returned,
        kept = articles.len(),
        "retrieved articles"
    );
    Ok(articles)
}

/// Removes whole-law summary records, preserving order.
pub fn without_law_metadata(articles: Vec<Article>) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|article| !article.is_law_metadata())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    struct FixedStore {
        rows: Vec<Article>,
        dims: Option<usize>,
    }

    impl VectorStore for FixedStore {
        fn nearest(&self, _vector: &[f32], _limit: usize) -> Result<Vec<Article>, ServiceError> {
            // ignores the limit on purpose to check truncation
            Ok(self.rows.clone())
        }

        fn index_dimensions(&self) -> Option<usize> {
            self.dims
        }

        fn backend(&self) -> &'static str {
            "fixed"
        }
    }

    fn row(n: u32) -> Article {
        Article::new(format!("body {n}")).with_number(n.to_string())
    }

    #[test]
    fn truncates_before_filtering() {
        let store = FixedStore {
            rows: vec![
                row(1),
                Article::new("summary").with_title("LAW METADATA"),
                row(2),
                row(3),
            ],
            dims: None,
        };
        let articles = retrieve(&store, &[0.0; 4], 3).unwrap();
        let numbers: Vec<_> = articles.iter().map(Article::number).collect();
        assert_eq!(numbers, ["1", "2"]);
    }

    #[test]
    fn all_metadata_yields_empty_result() {
        let store = FixedStore {
            rows: vec![Article::new("summary").with_title("LAW METADATA")],
            dims: None,
        };
        assert!(retrieve(&store, &[0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_is_a_retrieval_failure() {
        let store = FixedStore {
            rows: vec![row(1)],
            dims: Some(3072),
        };
        let err = retrieve(&store, &[0.0; 1536], 5).unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(ref msg) if msg.contains("1536")));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let store = FixedStore {
            rows: vec![row(1)],
            dims: None,
        };
        assert!(matches!(
            retrieve(&store, &[0.0], 0),
            Err(PipelineError::InvalidQuestion(_))
        ));
    }
}
