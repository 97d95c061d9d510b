//! # Storage Router
//!
//! The orchestrator: every get, put, and delete in the storage layer is a
//! fan-out across the registered drivers, and this module owns the fan-out
//! policy.
//!
//! ## Policy, in one place
//!
//! - **Gets are first-success.** Candidates are tried in order (URL hint
//!   first for immutable data, then drivers in registration order); the
//!   first candidate whose data passes verification wins. Verification is
//!   non-negotiable: immutable bytes must hash to the requested address,
//!   mutable bytes must carry a valid signed envelope. Unverifiable data
//!   is discarded and the next candidate is tried.
//! - **Puts are best-effort broadcast.** Every eligible driver is offered
//!   the data; the operation succeeds if at least one accepted it. Drivers
//!   named in the caller's `required` set are hard dependencies: any
//!   failure there vetoes the whole operation immediately.
//! - **Deletes are all-or-nothing.** A partial delete leaves stale replicas
//!   visible, so any driver fault aborts with failure.
//! - **Required-driver enforcement is a put-only construct.** Reads stay
//!   best-effort; a read satisfied by any honest replica is verified by
//!   hash or signature anyway.
//!
//! Every driver call runs under a per-driver deadline so one slow backend
//! cannot starve the whole fan-out, and every driver fault is caught and
//! classified at this boundary. Callers see `None`/`Err`, never a
//! transport exception.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::config;
use crate::crypto::hash::ContentHash;
use crate::crypto::{data_hash, keys, signing};
use crate::data_id;
use crate::envelope;
use crate::fetch::{HttpFetcher, UrlFetcher};

use super::driver::{Capability, DriverError, RequestHints, StorageDriver};
use super::error::StorageError;
use super::registry::DriverRegistry;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the router's fan-out behavior.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Deadline applied to each individual driver call.
    pub driver_timeout: std::time::Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            driver_timeout: config::DEFAULT_DRIVER_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation Options
// ---------------------------------------------------------------------------

/// Options for immutable-data reads.
#[derive(Debug, Clone, Default)]
pub struct GetImmutableOptions {
    /// A URL to try before any driver, fetched over generic transport.
    /// Data from it is verified exactly like driver data.
    pub url_hint: Option<String>,
    /// Which hash function keys the datum. Ordinary data uses the content
    /// hash; zonefiles and announcements use the chain hash.
    pub hash_func: ContentHash,
    /// Hints passed through to drivers.
    pub hints: RequestHints,
    /// When set, only drivers with these names are tried, in registration
    /// order.
    pub driver_whitelist: Option<Vec<String>>,
}

/// Options for mutable-data reads.
#[derive(Debug, Clone, Default)]
pub struct GetMutableOptions {
    /// The public key the envelope is expected to be signed with.
    pub public_key: Option<String>,
    /// Candidate URLs for the datum. When given, each driver only tries
    /// the URLs it claims via `handles_url`; when absent, each driver
    /// synthesizes its own URL.
    pub urls: Option<Vec<String>>,
    /// Address the signer is expected to hash to; tried when `public_key`
    /// is absent or fails.
    pub data_address: Option<String>,
    /// Fallback authorization: the record owner's address, tried when the
    /// data address fails. Supports delegated-write setups.
    pub owner_address: Option<String>,
    /// When set, only drivers with these names are tried.
    pub driver_whitelist: Option<Vec<String>>,
}

/// Options for mutable-data writes.
#[derive(Debug, Clone, Default)]
pub struct PutMutableOptions {
    /// Wrap the payload in the legacy profile token format instead of a
    /// v2 envelope.
    pub as_profile: bool,
    /// Drivers that must accept the write; any failure among them vetoes
    /// the operation.
    pub required: Vec<String>,
    /// When non-empty, only these drivers are offered the write.
    pub use_only: Vec<String>,
}

/// What to store as immutable data: either a payload the router will
/// serialize and hash itself, or pre-serialized text with a pre-computed
/// hash (announcements and zonefiles arrive this way).
#[derive(Debug, Clone, Copy)]
pub enum ImmutableContent<'a> {
    /// A JSON payload; must be an object or an array. The router
    /// canonicalizes it and computes the content hash.
    Payload(&'a Value),
    /// Pre-serialized text with its already-computed hash.
    Prehashed {
        /// The content address of the text.
        hash: &'a str,
        /// The serialized text exactly as it should be stored.
        text: &'a str,
    },
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes storage operations across the registered drivers.
///
/// Cheap to construct and to share: all state lives in the registry and
/// the fetcher, both held by `Arc`.
pub struct StorageRouter {
    registry: Arc<DriverRegistry>,
    fetcher: Arc<dyn UrlFetcher>,
    config: RouterConfig,
}

impl StorageRouter {
    /// Create a router over a registry, fetching URL hints over HTTP.
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self::with_fetcher(registry, Arc::new(HttpFetcher::new()))
    }

    /// Create a router with a custom URL fetcher.
    pub fn with_fetcher(registry: Arc<DriverRegistry>, fetcher: Arc<dyn UrlFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            config: RouterConfig::default(),
        }
    }

    /// Replace the router configuration.
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry this router fans out over.
    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    // -- Immutable data -----------------------------------------------------

    /// Fetch immutable data by content hash and parse it as JSON.
    ///
    /// Candidates are tried in order: the URL hint (if any), then each
    /// selected driver. Bytes that do not hash to `data_hash` are
    /// discarded; bytes that are not valid JSON are discarded. Returns
    /// `None` only after every candidate is exhausted.
    pub async fn get_immutable(
        &self,
        data_hash: &str,
        opts: &GetImmutableOptions,
    ) -> Option<Value> {
        self.immutable_lookup(data_hash, opts, |bytes| serde_json::from_slice(&bytes).ok())
            .await
    }

    /// Fetch immutable data by content hash, without deserializing.
    ///
    /// Same trial order and hash verification as [`get_immutable`]
    /// (Self::get_immutable); the verified bytes are returned as-is.
    pub async fn get_immutable_raw(
        &self,
        data_hash: &str,
        opts: &GetImmutableOptions,
    ) -> Option<Vec<u8>> {
        self.immutable_lookup(data_hash, opts, Some).await
    }

    async fn immutable_lookup<T>(
        &self,
        data_hash: &str,
        opts: &GetImmutableOptions,
        finish: impl Fn(Vec<u8>) -> Option<T>,
    ) -> Option<T> {
        debug!(hash = data_hash, "get_immutable");

        if let Some(url) = &opts.url_hint {
            match self.fetcher.fetch(url).await {
                Ok(bytes) => match check_hash(&bytes, data_hash, opts.hash_func) {
                    Ok(()) => match finish(bytes) {
                        Some(value) => {
                            debug!(hash = data_hash, %url, "loaded from URL hint");
                            return Some(value);
                        }
                        None => error!(%url, "unusable data from URL hint"),
                    },
                    Err(err) => error!(%url, %err, "rejecting URL-hint data"),
                },
                Err(err) => error!(%url, %err, "failed to fetch from URL hint"),
            }
        }

        for driver in self.select(opts.driver_whitelist.as_deref()) {
            let name = driver.name().to_string();
            match self
                .bounded(driver.get_immutable(data_hash, &opts.hints))
                .await
            {
                Err(DriverError::Unsupported) => {
                    debug!(driver = %name, "driver cannot fetch immutable data");
                }
                Err(err) => {
                    debug!(driver = %name, %err, "immutable fetch failed");
                }
                Ok(None) => {
                    debug!(driver = %name, hash = data_hash, "no data");
                }
                Ok(Some(bytes)) => match check_hash(&bytes, data_hash, opts.hash_func) {
                    Err(err) => error!(driver = %name, %err, "rejecting driver data"),
                    Ok(()) => match finish(bytes) {
                        Some(value) => {
                            debug!(driver = %name, hash = data_hash, "loaded");
                            return Some(value);
                        }
                        None => error!(driver = %name, hash = data_hash, "unusable data"),
                    },
                },
            }
        }

        None
    }

    /// Store immutable data on every driver that can take it.
    ///
    /// Best-effort broadcast: returns the content hash if at least one
    /// driver accepted the write. Drivers named in `required` veto the
    /// operation on any failure, including a missing put capability.
    pub async fn put_immutable(
        &self,
        content: ImmutableContent<'_>,
        txid: &str,
        required: &[String],
    ) -> Result<String, StorageError> {
        let (hash, text) = match content {
            ImmutableContent::Payload(payload) => {
                let text = serialize_immutable_payload(payload)?;
                let hash = data_hash(text.as_bytes());
                (hash, text)
            }
            ImmutableContent::Prehashed { hash, text } => (hash.to_string(), text.to_string()),
        };

        debug!(hash = %hash, ?required, "put_immutable");

        let mut successes = 0usize;
        for driver in self.registry.list() {
            let name = driver.name().to_string();
            let is_required = required.iter().any(|n| n == &name);

            if !driver.capabilities().contains(&Capability::PutImmutable) {
                if is_required {
                    let gap = StorageError::CapabilityMissing {
                        driver: name.clone(),
                        operation: Capability::PutImmutable.method_name(),
                    };
                    error!(%gap, "required driver cannot store immutable data");
                    return Err(StorageError::ReplicationFailed { driver: name });
                }
                continue;
            }

            match self
                .bounded(driver.put_immutable(&hash, text.as_bytes(), txid))
                .await
            {
                Ok(true) => {
                    debug!(driver = %name, hash = %hash, "replicated");
                    successes += 1;
                }
                Ok(false) => {
                    if is_required {
                        error!(driver = %name, "required driver rejected the write");
                        return Err(StorageError::ReplicationFailed { driver: name });
                    }
                    debug!(driver = %name, "driver rejected the write");
                }
                Err(err) => {
                    if is_required {
                        error!(driver = %name, %err, "required driver failed");
                        return Err(StorageError::ReplicationFailed { driver: name });
                    }
                    debug!(driver = %name, %err, "driver failed");
                }
            }
        }

        if successes == 0 {
            return Err(StorageError::AllDriversFailed);
        }
        Ok(hash)
    }

    /// Delete immutable data from every driver that supports deletion.
    ///
    /// The deletion request is authenticated by a signature over
    /// `"delete:" + hash + txid`. Unlike puts, any driver fault aborts
    /// the whole operation: a partial delete leaves replicas visible on
    /// some backends and not others.
    pub async fn delete_immutable(
        &self,
        data_hash: &str,
        txid: &str,
        private_key: &str,
    ) -> Result<(), StorageError> {
        if !keys::is_singlesig(private_key) {
            error!("only single-signature data private keys are supported");
            return Err(StorageError::UnsupportedKey);
        }

        let message = format!("{}{}{}", config::DELETE_SIGIL, data_hash, txid);
        let signature = signing::sign_data(message.as_bytes(), private_key)
            .map_err(|_| StorageError::UnsupportedKey)?;

        for driver in self.registry.list() {
            if !driver.capabilities().contains(&Capability::DeleteImmutable) {
                continue;
            }
            let name = driver.name().to_string();
            if let Err(err) = self
                .bounded(driver.delete_immutable(data_hash, txid, &signature))
                .await
            {
                error!(driver = %name, %err, "delete failed, aborting");
                return Err(StorageError::DriverFailed {
                    driver: name,
                    message: err.to_string(),
                });
            }
            debug!(driver = %name, hash = data_hash, "deleted");
        }

        Ok(())
    }

    // -- Mutable data -------------------------------------------------------

    /// Fetch mutable data by fully-qualified data ID, verifying and
    /// decoding its envelope.
    ///
    /// Decoding tries the caller's expected public key and data address
    /// first; if that fails and an owner address was supplied, decoding is
    /// retried against the owner address. Returns `None` after every
    /// driver/URL pair is exhausted.
    pub async fn get_mutable(&self, fq_data_id: &str, opts: &GetMutableOptions) -> Option<Value> {
        self.mutable_lookup(fq_data_id, opts, |bytes| self.decode_mutable(&bytes, opts))
            .await
    }

    /// Fetch mutable data without decoding the envelope. The caller gets
    /// the serialized envelope exactly as the driver returned it.
    pub async fn get_mutable_raw(
        &self,
        fq_data_id: &str,
        opts: &GetMutableOptions,
    ) -> Option<Vec<u8>> {
        self.mutable_lookup(fq_data_id, opts, Some).await
    }

    async fn mutable_lookup<T>(
        &self,
        fq_data_id: &str,
        opts: &GetMutableOptions,
        finish: impl Fn(Vec<u8>) -> Option<T>,
    ) -> Option<T> {
        let hints = hints_for(fq_data_id);
        debug!(fq_data_id, "get_mutable");

        for driver in self.select(opts.driver_whitelist.as_deref()) {
            let name = driver.name().to_string();
            if !driver.capabilities().contains(&Capability::GetMutable) {
                continue;
            }

            // Which URLs to attempt with this driver?
            let try_urls: Vec<String> = match &opts.urls {
                None => match driver.make_mutable_url(fq_data_id) {
                    Ok(url) => vec![url],
                    Err(DriverError::Unsupported) => {
                        debug!(driver = %name, "driver cannot make mutable URLs");
                        continue;
                    }
                    Err(err) => {
                        debug!(driver = %name, %err, "failed to make mutable URL");
                        continue;
                    }
                },
                Some(urls) => urls
                    .iter()
                    .filter(|url| driver.handles_url(url).unwrap_or(false))
                    .cloned()
                    .collect(),
            };

            for url in try_urls {
                match self.bounded(driver.get_mutable(&url, &hints)).await {
                    Err(DriverError::UnhandledUrl(unhandled)) => {
                        debug!(driver = %name, url = %unhandled, "URL not handled");
                    }
                    Err(err) => {
                        debug!(driver = %name, %url, %err, "mutable fetch failed");
                    }
                    Ok(None) => {
                        debug!(driver = %name, %url, "no data");
                    }
                    Ok(Some(bytes)) => match finish(bytes) {
                        Some(value) => {
                            debug!(driver = %name, %url, "loaded");
                            return Some(value);
                        }
                        None => error!(driver = %name, %url, "unusable data"),
                    },
                }
            }
        }

        None
    }

    fn decode_mutable(&self, bytes: &[u8], opts: &GetMutableOptions) -> Option<Value> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                debug!("mutable data is not UTF-8");
                return None;
            }
        };

        match envelope::open(
            text,
            opts.public_key.as_deref(),
            opts.data_address.as_deref(),
        ) {
            Ok(payload) => Some(payload),
            Err(err) => {
                debug!(%err, "envelope rejected with data address");
                let owner = opts.owner_address.as_deref()?;
                match envelope::open(text, opts.public_key.as_deref(), Some(owner)) {
                    Ok(payload) => Some(payload),
                    Err(err) => {
                        debug!(%err, "envelope rejected with owner address");
                        None
                    }
                }
            }
        }
    }

    /// Sign and store a mutable-data payload.
    ///
    /// The private key must be single-signature; multi-signature bundles
    /// are rejected before any driver is contacted. The envelope is sealed
    /// once and the identical bytes are broadcast to every selected
    /// driver. Same best-effort / required-veto policy as
    /// [`put_immutable`](Self::put_immutable).
    pub async fn put_mutable(
        &self,
        fq_data_id: &str,
        payload: &Value,
        private_key: &str,
        opts: &PutMutableOptions,
    ) -> Result<(), StorageError> {
        if !keys::is_singlesig(private_key) {
            error!("only single-signature data private keys are supported");
            return Err(StorageError::UnsupportedKey);
        }
        let public_key =
            keys::public_key_hex(private_key).map_err(|_| StorageError::UnsupportedKey)?;

        let hints = hints_for(fq_data_id);
        let serialized = envelope::seal(payload, private_key, &public_key, opts.as_profile)?;

        debug!(fq_data_id, required = ?opts.required, "put_mutable");

        let mut successes = 0usize;
        for driver in self.registry.list() {
            let name = driver.name().to_string();
            let is_required = opts.required.iter().any(|n| n == &name);

            if !driver.capabilities().contains(&Capability::PutMutable) {
                if is_required {
                    let gap = StorageError::CapabilityMissing {
                        driver: name.clone(),
                        operation: Capability::PutMutable.method_name(),
                    };
                    error!(%gap, "required driver cannot store mutable data");
                    return Err(StorageError::ReplicationFailed { driver: name });
                }
                continue;
            }

            if !opts.use_only.is_empty() && !opts.use_only.iter().any(|n| n == &name) {
                debug!(driver = %name, "skipping driver");
                continue;
            }

            match self
                .bounded(driver.put_mutable(fq_data_id, serialized.as_bytes(), &hints))
                .await
            {
                Ok(true) => {
                    debug!(driver = %name, bytes = serialized.len(), "replicated");
                    successes += 1;
                }
                Ok(false) => {
                    if is_required {
                        error!(driver = %name, "required driver rejected the write");
                        return Err(StorageError::ReplicationFailed { driver: name });
                    }
                    debug!(driver = %name, "driver rejected the write");
                }
                Err(err) => {
                    if is_required {
                        error!(driver = %name, %err, "required driver failed");
                        return Err(StorageError::ReplicationFailed { driver: name });
                    }
                    debug!(driver = %name, %err, "driver failed");
                }
            }
        }

        if successes == 0 {
            return Err(StorageError::AllDriversFailed);
        }
        Ok(())
    }

    /// Delete mutable data from the selected drivers.
    ///
    /// The deletion request is authenticated by a signature over
    /// `"delete:" + fq_data_id`. All-or-nothing, like
    /// [`delete_immutable`](Self::delete_immutable).
    pub async fn delete_mutable(
        &self,
        fq_data_id: &str,
        private_key: &str,
        driver_whitelist: Option<&[String]>,
    ) -> Result<(), StorageError> {
        if !keys::is_singlesig(private_key) {
            error!("only single-signature data private keys are supported");
            return Err(StorageError::UnsupportedKey);
        }

        let message = format!("{}{}", config::DELETE_SIGIL, fq_data_id);
        let signature = signing::sign_data(message.as_bytes(), private_key)
            .map_err(|_| StorageError::UnsupportedKey)?;

        for driver in self.select(driver_whitelist) {
            if !driver.capabilities().contains(&Capability::DeleteMutable) {
                continue;
            }
            let name = driver.name().to_string();
            if let Err(err) = self
                .bounded(driver.delete_mutable(fq_data_id, &signature))
                .await
            {
                error!(driver = %name, %err, "delete failed, aborting");
                return Err(StorageError::DriverFailed {
                    driver: name,
                    message: err.to_string(),
                });
            }
            debug!(driver = %name, fq_data_id, "deleted");
        }

        Ok(())
    }

    // -- Internals ----------------------------------------------------------

    /// The drivers to try, in registration order, optionally filtered to a
    /// whitelist.
    fn select(&self, whitelist: Option<&[String]>) -> Vec<Arc<dyn StorageDriver>> {
        let all = self.registry.list();
        match whitelist {
            None => all,
            Some(names) => all
                .into_iter()
                .filter(|d| names.iter().any(|n| n == d.name()))
                .collect(),
        }
    }

    /// Run a driver call under the per-driver deadline.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, DriverError>>,
    ) -> Result<T, DriverError> {
        match tokio::time::timeout(self.config.driver_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Backend("driver call timed out".into())),
        }
    }
}

/// Derive the driver hints for a mutable data ID.
fn hints_for(fq_data_id: &str) -> RequestHints {
    RequestHints {
        fqu: data_id::name_hint(fq_data_id).map(str::to_string),
        data_id: fq_data_id
            .split_once(config::FQ_DATA_ID_SEPARATOR)
            .map(|(_, id)| id.to_string()),
        zonefile: false,
    }
}

/// Canonicalize an immutable JSON payload for hashing and storage.
fn serialize_immutable_payload(payload: &Value) -> Result<String, StorageError> {
    if !payload.is_object() && !payload.is_array() {
        return Err(StorageError::InvalidPayload(
            "immutable data must be a JSON object or array",
        ));
    }
    serde_json::to_string(payload)
        .map_err(|_| StorageError::InvalidPayload("payload is not serializable"))
}

fn check_hash(bytes: &[u8], expected: &str, hash_func: ContentHash) -> Result<(), StorageError> {
    let got = hash_func.compute(bytes);
    if got == expected {
        Ok(())
    } else {
        Err(StorageError::HashMismatch {
            expected: expected.to_string(),
            got,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{generate_private_key, public_key_hex};
    use crate::drivers::MemoryDriver;
    use crate::fetch::FetchError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    /// Serves canned bytes for canned URLs; everything else fails.
    struct StaticFetcher(HashMap<String, Vec<u8>>);

    #[async_trait]
    impl UrlFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Http("no such url".into()))
        }
    }

    fn router_with(drivers: Vec<MemoryDriver>) -> StorageRouter {
        let registry = Arc::new(DriverRegistry::new());
        for driver in drivers {
            registry.register(Arc::new(driver));
        }
        StorageRouter::with_fetcher(registry, Arc::new(StaticFetcher(HashMap::new())))
    }

    #[tokio::test]
    async fn immutable_roundtrip_through_one_driver() {
        let router = router_with(vec![MemoryDriver::new("mem")]);
        let payload = json!({"k": 1});

        let hash = router
            .put_immutable(ImmutableContent::Payload(&payload), "txid1", &[])
            .await
            .unwrap();

        let loaded = router
            .get_immutable(&hash, &GetImmutableOptions::default())
            .await;
        assert_eq!(loaded, Some(payload));
    }

    #[tokio::test]
    async fn immutable_get_with_no_drivers_is_none() {
        let router = router_with(vec![]);
        let got = router
            .get_immutable("deadbeef", &GetImmutableOptions::default())
            .await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn url_hint_is_tried_before_drivers() {
        let payload = json!({"from": "the url"});
        let text = serde_json::to_string(&payload).unwrap();
        let hash = data_hash(text.as_bytes());

        let mut canned = HashMap::new();
        canned.insert("https://hint.example/datum".to_string(), text.into_bytes());

        let registry = Arc::new(DriverRegistry::new());
        let router = StorageRouter::with_fetcher(registry, Arc::new(StaticFetcher(canned)));

        let opts = GetImmutableOptions {
            url_hint: Some("https://hint.example/datum".to_string()),
            ..Default::default()
        };
        assert_eq!(router.get_immutable(&hash, &opts).await, Some(payload));
    }

    #[tokio::test]
    async fn url_hint_data_is_hash_checked() {
        // The hint serves bytes that do not match the requested hash; the
        // driver has the real thing.
        let router = router_with(vec![MemoryDriver::new("mem")]);
        let payload = json!({"k": "real"});
        let hash = router
            .put_immutable(ImmutableContent::Payload(&payload), "txid1", &[])
            .await
            .unwrap();

        let mut canned = HashMap::new();
        canned.insert(
            "https://hint.example/poison".to_string(),
            b"{\"k\":\"poisoned\"}".to_vec(),
        );
        let router = StorageRouter::with_fetcher(
            Arc::clone(router.registry()),
            Arc::new(StaticFetcher(canned)),
        );

        let opts = GetImmutableOptions {
            url_hint: Some("https://hint.example/poison".to_string()),
            ..Default::default()
        };
        assert_eq!(router.get_immutable(&hash, &opts).await, Some(payload));
    }

    #[tokio::test]
    async fn required_driver_failure_vetoes_put() {
        let good = MemoryDriver::new("good");
        let bad = MemoryDriver::new("bad");
        bad.set_fail_writes(true);
        let router = router_with(vec![good, bad]);

        let result = router
            .put_immutable(
                ImmutableContent::Payload(&json!({"k": 1})),
                "txid1",
                &["bad".to_string()],
            )
            .await;

        assert!(matches!(
            result,
            Err(StorageError::ReplicationFailed { driver }) if driver == "bad"
        ));
    }

    #[tokio::test]
    async fn best_effort_put_succeeds_with_one_of_two() {
        let good = MemoryDriver::new("good");
        let bad = MemoryDriver::new("bad");
        bad.set_fail_writes(true);
        let router = router_with(vec![bad, good]);

        let hash = router
            .put_immutable(ImmutableContent::Payload(&json!({"k": 1})), "txid1", &[])
            .await
            .unwrap();
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn put_fails_when_every_driver_fails() {
        let a = MemoryDriver::new("a");
        let b = MemoryDriver::new("b");
        a.set_fail_writes(true);
        b.set_fail_writes(true);
        let router = router_with(vec![a, b]);

        let result = router
            .put_immutable(ImmutableContent::Payload(&json!({"k": 1})), "txid1", &[])
            .await;
        assert!(matches!(result, Err(StorageError::AllDriversFailed)));
    }

    #[tokio::test]
    async fn scalar_immutable_payload_is_a_contract_violation() {
        let router = router_with(vec![MemoryDriver::new("mem")]);
        let result = router
            .put_immutable(ImmutableContent::Payload(&json!(42)), "txid1", &[])
            .await;
        assert!(matches!(result, Err(StorageError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn mismatched_hash_is_never_surfaced() {
        let driver = Arc::new(MemoryDriver::new("mem"));
        let registry = Arc::new(DriverRegistry::new());
        registry.register(Arc::clone(&driver) as Arc<dyn StorageDriver>);
        let router =
            StorageRouter::with_fetcher(registry, Arc::new(StaticFetcher(HashMap::new())));

        let hash = router
            .put_immutable(ImmutableContent::Payload(&json!({"k": 1})), "txid1", &[])
            .await
            .unwrap();

        // From here on every read from the driver comes back corrupted, so
        // the hash check must reject it and the lookup must exhaust.
        driver.set_corrupt_reads(true);
        assert!(router
            .get_immutable(&hash, &GetImmutableOptions::default())
            .await
            .is_none());

        driver.set_corrupt_reads(false);
        assert!(router
            .get_immutable(&hash, &GetImmutableOptions::default())
            .await
            .is_some());
    }

    #[tokio::test]
    async fn driver_whitelist_limits_get() {
        let a = MemoryDriver::new("a");
        let b = MemoryDriver::new("b");
        let router = router_with(vec![a, b]);
        let hash = router
            .put_immutable(ImmutableContent::Payload(&json!({"k": 1})), "txid1", &[])
            .await
            .unwrap();

        // Both drivers hold the data; whitelisting a ghost name yields none.
        let opts = GetImmutableOptions {
            driver_whitelist: Some(vec!["ghost".to_string()]),
            ..Default::default()
        };
        assert!(router.get_immutable(&hash, &opts).await.is_none());

        let opts = GetImmutableOptions {
            driver_whitelist: Some(vec!["b".to_string()]),
            ..Default::default()
        };
        assert!(router.get_immutable(&hash, &opts).await.is_some());
    }

    #[tokio::test]
    async fn mutable_roundtrip_with_expected_key() {
        let router = router_with(vec![MemoryDriver::new("mem")]);
        let private = generate_private_key();
        let public = public_key_hex(&private).unwrap();
        let payload = json!({"status": "hello"});

        router
            .put_mutable(
                "alice.id:status",
                &payload,
                &private,
                &PutMutableOptions::default(),
            )
            .await
            .unwrap();

        let opts = GetMutableOptions {
            public_key: Some(public),
            ..Default::default()
        };
        assert_eq!(
            router.get_mutable("alice.id:status", &opts).await,
            Some(payload)
        );
    }

    #[tokio::test]
    async fn mutable_get_rejects_wrong_key() {
        let router = router_with(vec![MemoryDriver::new("mem")]);
        let private = generate_private_key();
        let stranger = public_key_hex(&generate_private_key()).unwrap();

        router
            .put_mutable(
                "alice.id:status",
                &json!({"s": 1}),
                &private,
                &PutMutableOptions::default(),
            )
            .await
            .unwrap();

        let opts = GetMutableOptions {
            public_key: Some(stranger),
            ..Default::default()
        };
        assert!(router.get_mutable("alice.id:status", &opts).await.is_none());
    }

    #[tokio::test]
    async fn multisig_key_is_rejected_before_io() {
        let driver = MemoryDriver::new("mem");
        let router = router_with(vec![driver]);
        let bundle = r#"{"redeem_script": "52ae", "private_keys": ["ab", "cd"]}"#;

        let result = router
            .put_mutable(
                "alice.id:status",
                &json!({"s": 1}),
                bundle,
                &PutMutableOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(StorageError::UnsupportedKey)));
        // Nothing reached the driver.
        let mem = router.registry().find("mem").unwrap();
        let url = mem.make_mutable_url("alice.id:status").unwrap();
        assert!(mem
            .get_mutable(&url, &RequestHints::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn use_only_filter_restricts_mutable_put() {
        let a = MemoryDriver::new("a");
        let b = MemoryDriver::new("b");
        let router = router_with(vec![a, b]);
        let private = generate_private_key();

        let opts = PutMutableOptions {
            use_only: vec!["b".to_string()],
            ..Default::default()
        };
        router
            .put_mutable("alice.id:status", &json!({"s": 1}), &private, &opts)
            .await
            .unwrap();

        let a = router.registry().find("a").unwrap();
        let b = router.registry().find("b").unwrap();
        let hints = RequestHints::default();
        assert!(a
            .get_mutable(&a.make_mutable_url("alice.id:status").unwrap(), &hints)
            .await
            .unwrap()
            .is_none());
        assert!(b
            .get_mutable(&b.make_mutable_url("alice.id:status").unwrap(), &hints)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn caller_urls_are_filtered_by_handles_url() {
        let a = MemoryDriver::new("a");
        let b = MemoryDriver::new("b");
        let router = router_with(vec![a, b]);
        let private = generate_private_key();
        let public = public_key_hex(&private).unwrap();

        router
            .put_mutable(
                "alice.id:status",
                &json!({"s": 1}),
                &private,
                &PutMutableOptions::default(),
            )
            .await
            .unwrap();

        // Only driver b's URL is offered; driver a must not claim it.
        let opts = GetMutableOptions {
            public_key: Some(public),
            urls: Some(vec!["memory://b/alice.id:status".to_string()]),
            ..Default::default()
        };
        assert!(router.get_mutable("alice.id:status", &opts).await.is_some());

        let opts = GetMutableOptions {
            urls: Some(vec!["ftp://nowhere/alice.id:status".to_string()]),
            ..opts
        };
        assert!(router.get_mutable("alice.id:status", &opts).await.is_none());
    }

    #[tokio::test]
    async fn delete_immutable_aborts_on_driver_fault() {
        let good = MemoryDriver::new("good");
        let bad = MemoryDriver::new("bad");
        bad.set_fail_writes(true);
        let router = router_with(vec![good, bad]);
        let private = generate_private_key();

        let hash = router
            .put_immutable(ImmutableContent::Payload(&json!({"k": 1})), "txid1", &[])
            .await
            .unwrap();

        let result = router.delete_immutable(&hash, "txid1", &private).await;
        assert!(matches!(result, Err(StorageError::DriverFailed { .. })));
    }

    #[tokio::test]
    async fn delete_mutable_removes_the_record() {
        let router = router_with(vec![MemoryDriver::new("mem")]);
        let private = generate_private_key();
        let public = public_key_hex(&private).unwrap();

        router
            .put_mutable(
                "alice.id:status",
                &json!({"s": 1}),
                &private,
                &PutMutableOptions::default(),
            )
            .await
            .unwrap();
        router
            .delete_mutable("alice.id:status", &private, None)
            .await
            .unwrap();

        let opts = GetMutableOptions {
            public_key: Some(public),
            ..Default::default()
        };
        assert!(router.get_mutable("alice.id:status", &opts).await.is_none());
    }

    #[tokio::test]
    async fn slow_driver_is_timed_out() {
        use std::time::Duration;

        /// Sleeps forever on reads.
        struct StallDriver;

        #[async_trait]
        impl StorageDriver for StallDriver {
            fn name(&self) -> &str {
                "stall"
            }
            fn capabilities(&self) -> &[Capability] {
                &[Capability::GetImmutable]
            }
            async fn get_immutable(
                &self,
                _data_hash: &str,
                _hints: &RequestHints,
            ) -> Result<Option<Vec<u8>>, DriverError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }

        let registry = Arc::new(DriverRegistry::new());
        registry.register(Arc::new(StallDriver));
        let router = StorageRouter::new(registry).with_config(RouterConfig {
            driver_timeout: Duration::from_millis(20),
        });

        // The per-driver deadline must cut the stalled driver off.
        let result = router
            .get_immutable("deadbeef", &GetImmutableOptions::default())
            .await;
        assert!(result.is_none());
    }
}
