//! # Local Storage Driver
//!
//! Persistent local storage on sled's embedded key-value store. The
//! default driver for single-node deployments and the CLI.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees", each an independent B+ tree
//! with its own keyspace:
//!
//! | Tree        | Key                  | Value              |
//! |-------------|----------------------|--------------------|
//! | `immutable` | content hash (hex)   | serialized bytes   |
//! | `mutable`   | fq data ID (UTF-8)   | envelope bytes     |
//!
//! Immutable values are verified by hash and mutable values by signature
//! at the router boundary, so the trees store bytes verbatim with no
//! further framing.
//!
//! Mutable URLs use the `polaris://` scheme: `polaris://<fq_data_id>`.

use std::path::Path;

use async_trait::async_trait;
use sled::{Db, Tree};

use crate::storage::driver::{Capability, DriverError, RequestHints, StorageDriver};

/// URL scheme under which this driver serves mutable data.
pub const LOCAL_URL_SCHEME: &str = "polaris://";

/// The driver's registry name.
const DRIVER_NAME: &str = "local";

impl From<sled::Error> for DriverError {
    fn from(err: sled::Error) -> Self {
        DriverError::Backend(err.to_string())
    }
}

/// Persistent local storage driver.
///
/// sled is thread-safe (lock-free concurrent reads, serialized writes),
/// so the driver needs no interior locking of its own and can be shared
/// via `Arc` like every other driver.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    db: Db,
    immutable: Tree,
    mutable: Tree,
}

impl LocalDriver {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is cleaned up on drop. For tests.
    pub fn open_temporary() -> Result<Self, DriverError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    /// Internal constructor: opens the named trees from an existing `Db`.
    fn from_db(db: Db) -> Result<Self, DriverError> {
        let immutable = db.open_tree("immutable")?;
        let mutable = db.open_tree("mutable")?;
        Ok(Self {
            db,
            immutable,
            mutable,
        })
    }

    /// Number of immutable data items held.
    pub fn immutable_count(&self) -> usize {
        self.immutable.len()
    }

    /// Number of mutable records held.
    pub fn mutable_count(&self) -> usize {
        self.mutable.len()
    }

    /// Block until all pending writes are durable on disk.
    pub fn flush(&self) -> Result<(), DriverError> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for LocalDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn capabilities(&self) -> &[Capability] {
        &Capability::ALL
    }

    fn make_mutable_url(&self, fq_data_id: &str) -> Result<String, DriverError> {
        Ok(format!("{LOCAL_URL_SCHEME}{fq_data_id}"))
    }

    fn handles_url(&self, url: &str) -> Result<bool, DriverError> {
        Ok(url.starts_with(LOCAL_URL_SCHEME))
    }

    async fn get_immutable(
        &self,
        data_hash: &str,
        _hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        Ok(self.immutable.get(data_hash)?.map(|v| v.to_vec()))
    }

    async fn put_immutable(
        &self,
        data_hash: &str,
        data: &[u8],
        _txid: &str,
    ) -> Result<bool, DriverError> {
        self.immutable.insert(data_hash, data)?;
        self.db.flush()?;
        Ok(true)
    }

    async fn delete_immutable(
        &self,
        data_hash: &str,
        _txid: &str,
        _signature: &str,
    ) -> Result<(), DriverError> {
        self.immutable.remove(data_hash)?;
        self.db.flush()?;
        Ok(())
    }

    async fn get_mutable(
        &self,
        url: &str,
        _hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        let fq_data_id = url
            .strip_prefix(LOCAL_URL_SCHEME)
            .ok_or_else(|| DriverError::UnhandledUrl(url.to_string()))?;
        Ok(self.mutable.get(fq_data_id)?.map(|v| v.to_vec()))
    }

    async fn put_mutable(
        &self,
        fq_data_id: &str,
        data: &[u8],
        _hints: &RequestHints,
    ) -> Result<bool, DriverError> {
        self.mutable.insert(fq_data_id, data)?;
        self.db.flush()?;
        Ok(true)
    }

    async fn delete_mutable(&self, fq_data_id: &str, _signature: &str) -> Result<(), DriverError> {
        self.mutable.remove(fq_data_id)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_temporary_database() {
        let driver = LocalDriver::open_temporary().expect("should create temp db");
        assert_eq!(driver.immutable_count(), 0);
        assert_eq!(driver.mutable_count(), 0);
    }

    #[tokio::test]
    async fn immutable_data_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hints = RequestHints::default();

        {
            let driver = LocalDriver::open(dir.path()).expect("should open db");
            driver
                .put_immutable("abc123", b"persistent bytes", "txid")
                .await
                .unwrap();
        }

        let driver = LocalDriver::open(dir.path()).expect("should reopen db");
        assert_eq!(
            driver
                .get_immutable("abc123", &hints)
                .await
                .unwrap()
                .unwrap(),
            b"persistent bytes"
        );
    }

    #[tokio::test]
    async fn mutable_roundtrip_by_url() {
        let driver = LocalDriver::open_temporary().unwrap();
        let hints = RequestHints::default();

        let url = driver.make_mutable_url("alice.id:profile").unwrap();
        assert_eq!(url, "polaris://alice.id:profile");
        assert!(driver.handles_url(&url).unwrap());
        assert!(!driver.handles_url("https://example.com").unwrap());

        driver
            .put_mutable("alice.id:profile", b"envelope", &hints)
            .await
            .unwrap();
        assert_eq!(
            driver.get_mutable(&url, &hints).await.unwrap().unwrap(),
            b"envelope"
        );

        driver.delete_mutable("alice.id:profile", "sig").await.unwrap();
        assert!(driver.get_mutable(&url, &hints).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_url_is_unhandled() {
        let driver = LocalDriver::open_temporary().unwrap();
        let result = driver
            .get_mutable("https://example.com/profile", &RequestHints::default())
            .await;
        assert!(matches!(result, Err(DriverError::UnhandledUrl(_))));
    }

    #[tokio::test]
    async fn delete_immutable_removes_data() {
        let driver = LocalDriver::open_temporary().unwrap();
        let hints = RequestHints::default();

        driver.put_immutable("abc", b"data", "txid").await.unwrap();
        driver.delete_immutable("abc", "txid", "sig").await.unwrap();
        assert!(driver.get_immutable("abc", &hints).await.unwrap().is_none());
    }
}
