//! Sitemap document fetching
//!
//! The resolver only needs "give me the body at this location"; this module
//! defines that seam and the reqwest-backed implementation used in production.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors from fetching a sitemap document
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with HTTP {status}")]
    Status { status: u16 },
}

/// Capability to fetch the raw text of a sitemap document
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetches the document body at `location`
    async fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

/// Fetches sitemap documents over HTTP(S) with reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher with its own client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identity string sent with every sitemap request
    /// * `timeout` - Total timeout for a single request
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, timeout)?))
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        tracing::debug!("Fetching sitemap document {}", location);

        let response = self.client.get(location).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Builds an HTTP client for sitemap requests
///
/// Redirects are followed (sitemaps commonly move between http/https and
/// `www` hosts) and compressed bodies are decoded transparently.
///
/// # Example
///
/// ```no_run
/// use sitemap_walker::sitemap::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("Mozilla/5.0", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
