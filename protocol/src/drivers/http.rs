//! # HTTP Storage Driver
//!
//! A read-only driver for data hosted behind plain `http(s)://` URLs:
//! profiles published to a web host, gateways, mirrors. It deliberately
//! implements only the read side of the interface; the write capabilities
//! stay absent, which also makes this the production exercise of the
//! router's partial-capability handling.
//!
//! Immutable lookups need a way to turn a hash into a URL, so they are
//! only available when the driver is configured with an index base URL
//! (`<base>/<hash>`). Mutable lookups take the URL as given.

use async_trait::async_trait;

use crate::storage::driver::{Capability, DriverError, RequestHints, StorageDriver};

const DRIVER_NAME: &str = "http";

/// Read-only driver for `http(s)://` URLs.
pub struct HttpDriver {
    client: reqwest::Client,
    immutable_base: Option<String>,
    capabilities: Vec<Capability>,
}

impl HttpDriver {
    /// A driver serving mutable reads for any `http(s)://` URL.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            immutable_base: None,
            capabilities: vec![Capability::HandlesUrl, Capability::GetMutable],
        }
    }

    /// A driver that can additionally resolve immutable hashes against an
    /// index: `GET <base>/<hash>`.
    pub fn with_immutable_base(base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            immutable_base: Some(base.trim_end_matches('/').to_string()),
            capabilities: vec![
                Capability::HandlesUrl,
                Capability::GetImmutable,
                Capability::GetMutable,
            ],
        }
    }

    async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, DriverError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(DriverError::Backend(format!(
                "server returned status {}",
                response.status().as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }
}

impl Default for HttpDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[async_trait]
impl StorageDriver for HttpDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn handles_url(&self, url: &str) -> Result<bool, DriverError> {
        Ok(is_http_url(url))
    }

    async fn get_immutable(
        &self,
        data_hash: &str,
        _hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        let base = self
            .immutable_base
            .as_deref()
            .ok_or(DriverError::Unsupported)?;
        self.fetch(&format!("{base}/{data_hash}")).await
    }

    async fn get_mutable(
        &self,
        url: &str,
        _hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        if !is_http_url(url) {
            return Err(DriverError::UnhandledUrl(url.to_string()));
        }
        self.fetch(url).await
    }
}
