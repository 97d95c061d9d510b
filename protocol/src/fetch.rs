//! # URL Fetching
//!
//! The generic "fetch bytes from a URL" collaborator used by the immutable
//! URL-hint path. Kept behind a trait so tests can serve canned bytes and
//! deployments can swap in a client with their own proxy/TLS policy.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the response could not be read.
    #[error("fetch failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),
}

/// Fetches the raw bytes behind a URL.
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    /// Fetch the resource. The router hash-checks whatever comes back, so
    /// implementations do not need to care about integrity, only transport.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Production fetcher over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UrlFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Http(e.to_string()))
    }
}
