//! Qdrant point search over the REST API.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CollectionName, VectorStore};
use crate::article::Article;
use crate::error::ServiceError;

/// How the collection's metric reports `score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScoreKind {
    /// Higher is closer (`Cosine`, `Dot`); distance is `1 - score`.
    Similarity,
    /// Score is already a distance (`Euclid`, `Manhattan`).
    Distance,
}

impl ScoreKind {
    fn to_distance(self, score: f32) -> f32 {
        match self {
            ScoreKind::Similarity => 1.0 - score,
            ScoreKind::Distance => score,
        }
    }
}

/// Blocking Qdrant client scoped to one article collection.
#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    endpoint: String,
    dimensions: Option<usize>,
    score_kind: ScoreKind,
}

impl QdrantStore {
    /// Builds a new Qdrant search client.
    ///
    /// # Arguments
    /// * `base_url` - Cluster URL, e.g. `https://cluster-id.cloud.qdrant.io:6333`
    /// * `api_key` - Value for the `api-key` header (usually from `QDRANT_API_KEY`); may be empty for local clusters
    /// * `collection` - Collection holding article points
    ///
    /// Scores are read as cosine similarities; see [`QdrantStore::with_score_kind`].
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        collection: CollectionName,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "Qdrant endpoint must be an http(s) URL"
        );
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).context("invalid Qdrant API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;
        let endpoint = format!(
            "{}/collections/{}/points/search",
            base_url.trim_end_matches('/'),
            collection.as_str()
        );
        Ok(Self {
            client,
            endpoint,
            dimensions,
            score_kind: ScoreKind::Similarity,
        })
    }

    /// Sets how returned scores convert to article distances.
    pub fn with_score_kind(mut self, score_kind: ScoreKind) -> Self {
        self.score_kind = score_kind;
        self
    }
}

impl VectorStore for QdrantStore {
    fn nearest(&self, vector: &[f32], limit: usize) -> Result<Vec<Article>, ServiceError> {
        let request = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let resp = self.client.post(&self.endpoint).json(&request).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ServiceError::Status { status, body });
        }
        let payload: SearchResponse = resp.json()?;
        payload
            .result
            .into_iter()
            .map(|point| point.into_article(self.score_kind))
            .collect()
    }

    fn index_dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl ScoredPoint {
    fn into_article(self, score_kind: ScoreKind) -> Result<Article, ServiceError> {
        let payload = self
            .payload
            .ok_or_else(|| ServiceError::Malformed("Qdrant point missing payload".into()))?;
        let mut article: Article = serde_json::from_value(payload)?;
        article.distance = Some(score_kind.to_distance(self.score));
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scored_points_become_articles() {
        let response: SearchResponse = serde_json::from_value(json!({
            "result": [
                { "id": 1, "score": 0.9, "payload": {
                    "article_number": 8, "article_title": "Evidence",
                    "law_title": "Evidence Law", "text": "Testimony alone..." } },
                { "id": 2, "score": 0.5, "payload": { "text": "Body only" } }
            ],
            "status": "ok",
            "time": 0.001
        }))
        .unwrap();
        let articles: Vec<Article> = response
            .result
            .into_iter()
            .map(|point| point.into_article(ScoreKind::Similarity))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(articles[0].number(), "8");
        assert!((articles[0].distance.unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(articles[1].article_title, None);
    }

    #[test]
    fn distance_metrics_keep_the_score() {
        let point = ScoredPoint {
            score: 2.5,
            payload: Some(json!({ "article_number": "3", "text": "Body" })),
        };
        let article = point.into_article(ScoreKind::Distance).unwrap();
        assert_eq!(article.distance, Some(2.5));
    }

    #[test]
    fn missing_payload_is_malformed() {
        let point = ScoredPoint {
            score: 0.3,
            payload: None,
        };
        assert!(matches!(
            point.into_article(ScoreKind::Similarity),
            Err(ServiceError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_http_endpoints() {
        let name = CollectionName::new("LawArticle").unwrap();
        assert!(QdrantStore::new("localhost:6333", None, name, None, Duration::from_secs(1)).is_err());
    }
}
