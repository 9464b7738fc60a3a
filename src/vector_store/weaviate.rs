//! Weaviate near-vector search over the GraphQL endpoint.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CollectionName, VectorStore};
use crate::article::Article;
use crate::error::ServiceError;

const RETURNED_FIELDS: &str =
    "article_number article_title law_title text _additional { distance }";

/// Blocking Weaviate client scoped to one article collection.
#[derive(Clone)]
pub struct WeaviateStore {
    client: Client,
    endpoint: String,
    class: String,
    dimensions: Option<usize>,
}

impl WeaviateStore {
    /// Builds a new Weaviate client.
    ///
    /// # Arguments
    /// * `cluster_url` - Cluster endpoint (usually from `WEAVIATE_URL`); a bare host gets `https://`
    /// * `api_key` - Cluster API key (usually from `WEAVIATE_API_KEY`)
    /// * `collection` - Article collection to search
    /// * `dimensions` - Expected index dimensionality, checked before each search
    pub fn new(
        cluster_url: &str,
        api_key: String,
        collection: CollectionName,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Weaviate API key");
        let endpoint = graphql_endpoint(cluster_url)?;
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid Weaviate API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Weaviate HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            class: collection.weaviate_class(),
            dimensions,
        })
    }
}

impl VectorStore for WeaviateStore {
    fn nearest(&self, vector: &[f32], limit: usize) -> Result<Vec<Article>, ServiceError> {
        let query = near_vector_query(&self.class, vector, limit)?;
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query: &query })
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ServiceError::Status { status, body });
        }
        let payload: GraphQlResponse = resp.json()?;
        payload.into_articles(&self.class)
    }

    fn index_dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn backend(&self) -> &'static str {
        "weaviate"
    }
}

fn graphql_endpoint(cluster_url: &str) -> Result<String> {
    let trimmed = cluster_url.trim();
    anyhow::ensure!(!trimmed.is_empty(), "missing Weaviate cluster URL");
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let mut url = Url::parse(&with_scheme)
        .with_context(|| format!("invalid Weaviate cluster URL {trimmed}"))?;
    anyhow::ensure!(url.host_str().is_some(), "Weaviate cluster URL has no host");
    let path = format!("{}/v1/graphql", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    Ok(url.to_string())
}

fn near_vector_query(class: &str, vector: &[f32], limit: usize) -> Result<String, ServiceError> {
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(ServiceError::Malformed(
            "query vector contains non-finite values".into(),
        ));
    }
    let vector = serde_json::to_string(vector)?;
    Ok(format!(
        "{{ Get {{ {class}(nearVector: {{vector: {vector}}}, limit: {limit}) {{ {RETURNED_FIELDS} }} }} }}"
    ))
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    #[serde(rename = "Get", default)]
    get: HashMap<String, Option<Vec<WeaviateObject>>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct WeaviateObject {
    #[serde(flatten)]
    article: Article,
    #[serde(rename = "_additional", default)]
    additional: Option<Additional>,
}

#[derive(Debug, Deserialize)]
struct Additional {
    #[serde(default)]
    distance: Option<f32>,
}

impl GraphQlResponse {
    fn into_articles(self, class: &str) -> Result<Vec<Article>, ServiceError> {
        if !self.errors.is_empty() {
            let messages = self
                .errors
                .into_iter()
                .map(|err| err.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ServiceError::Malformed(format!(
                "Weaviate GraphQL error: {messages}"
            )));
        }
        let mut data = self
            .data
            .ok_or_else(|| ServiceError::Malformed("Weaviate response missing data".into()))?;
        let objects = data.get.remove(class).ok_or_else(|| {
            ServiceError::Malformed(format!("Weaviate response missing collection {class}"))
        })?;
        Ok(objects
            .unwrap_or_default()
            .into_iter()
            .map(|obj| {
                let mut article = obj.article;
                article.distance = obj.additional.and_then(|extra| extra.distance);
                article
            })
            .collect())
    }
}
