//! HTTP client for the external read-only catalog service.
//!
//! Provides title/author search and full-record fetch, behind a trait so
//! tests and the verification orchestrator can inject fakes. Caching is an
//! injected capability owned by the caller, never global state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::models::CatalogCandidate;

/// Errors from the catalog client, classified for retry decisions.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Catalog returned HTTP {0}")]
    Http(u16),

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Connectivity-shaped errors (including 5xx) are worth retrying;
    /// client-side errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Connection(_) | CatalogError::Timeout(_) => true,
            CatalogError::Http(status) => *status >= 500,
            CatalogError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CatalogError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() {
            CatalogError::Connection(e.to_string())
        } else if e.is_decode() {
            CatalogError::Parse(e.to_string())
        } else {
            CatalogError::Connection(e.to_string())
        }
    }
}

/// Client interface for the external catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search catalog entries by title and optional author.
    async fn search_by_title_author(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError>;

    /// Fetch the full record for a catalog item.
    async fn fetch_by_id(&self, id: &str) -> Result<CatalogCandidate, CatalogError>;
}

/// Reqwest-backed catalog client with bearer-token auth.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<CatalogCandidate>,
}

impl HttpCatalogClient {
    /// Create a new HttpCatalogClient.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the catalog service (e.g., "http://localhost:13378")
    /// * `token` - API token for the catalog's read-only endpoints
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: String, token: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the catalog service is reachable.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/ping", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search_by_title_author(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let query = match author {
            Some(author) => format!("{} {}", title, author),
            None => title.to_string(),
        };
        let url = format!(
            "{}/api/search?q={}",
            self.base_url,
            urlencoding::encode(&query)
        );
        debug!("Catalog search: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Http(response.status().as_u16()));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(search.results)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<CatalogCandidate, CatalogError> {
        let url = format!("{}/api/items/{}", self.base_url, urlencoding::encode(id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Http(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

/// Injected cache capability for search results. Keying and TTL policy
/// belong to the implementor.
pub trait CandidateCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<CatalogCandidate>>;
    fn put(&self, key: &str, candidates: &[CatalogCandidate]);
}

/// Catalog client wrapper that consults an injected cache before searching.
///
/// Only successful searches are cached; `fetch_by_id` always goes through,
/// since enrichment wants the freshest record.
pub struct CachingCatalogClient {
    inner: Arc<dyn CatalogClient>,
    cache: Arc<dyn CandidateCache>,
}

impl CachingCatalogClient {
    pub fn new(inner: Arc<dyn CatalogClient>, cache: Arc<dyn CandidateCache>) -> Self {
        Self { inner, cache }
    }

    fn cache_key(title: &str, author: Option<&str>) -> String {
        format!("{}\u{1f}{}", title, author.unwrap_or(""))
    }
}

#[async_trait]
impl CatalogClient for CachingCatalogClient {
    async fn search_by_title_author(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let key = Self::cache_key(title, author);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Catalog search cache hit for {:?}", title);
            return Ok(cached);
        }
        let results = self.inner.search_by_title_author(title, author).await?;
        self.cache.put(&key, &results);
        Ok(results)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<CatalogCandidate, CatalogError> {
        self.inner.fetch_by_id(id).await
    }
}
