//! # In-Memory Storage Driver
//!
//! The reference driver: full capability set, everything in process
//! memory. Unit and integration tests build driver fleets out of these,
//! and the fault-injection switches exercise the router's failure paths
//! (write faults, corrupted reads) without a misbehaving backend.
//!
//! Mutable URLs look like `memory://<driver-name>/<fq_data_id>`, so two
//! instances with different names never claim each other's URLs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::storage::driver::{Capability, DriverError, RequestHints, StorageDriver};

/// An in-process storage driver.
pub struct MemoryDriver {
    name: String,
    capabilities: Vec<Capability>,
    immutable: RwLock<HashMap<String, Vec<u8>>>,
    mutable: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    corrupt_reads: AtomicBool,
}

impl MemoryDriver {
    /// A driver with the full capability set.
    pub fn new(name: &str) -> Self {
        Self::with_capabilities(name, &Capability::ALL)
    }

    /// A driver that only advertises (and implements) a subset of the
    /// capability set. Everything outside the subset reports
    /// [`DriverError::Unsupported`], exactly like a real partial backend.
    pub fn with_capabilities(name: &str, capabilities: &[Capability]) -> Self {
        Self {
            name: name.to_string(),
            capabilities: capabilities.to_vec(),
            immutable: RwLock::new(HashMap::new()),
            mutable: RwLock::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            corrupt_reads: AtomicBool::new(false),
        }
    }

    /// Fault injection: make every write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Fault injection: flip a byte in everything read back, so fetched
    /// data fails hash and signature checks.
    pub fn set_corrupt_reads(&self, corrupt: bool) {
        self.corrupt_reads.store(corrupt, Ordering::Relaxed);
    }

    /// Number of immutable data items held.
    pub fn immutable_count(&self) -> usize {
        self.immutable.read().len()
    }

    /// Number of mutable records held.
    pub fn mutable_count(&self) -> usize {
        self.mutable.read().len()
    }

    fn url_prefix(&self) -> String {
        format!("memory://{}/", self.name)
    }

    fn supported(&self, capability: Capability) -> Result<(), DriverError> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            Err(DriverError::Unsupported)
        }
    }

    fn writable(&self) -> Result<(), DriverError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            Err(DriverError::Backend("injected write failure".into()))
        } else {
            Ok(())
        }
    }

    fn maybe_corrupt(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        if self.corrupt_reads.load(Ordering::Relaxed) {
            if let Some(byte) = bytes.first_mut() {
                *byte ^= 0xFF;
            }
        }
        bytes
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn make_mutable_url(&self, fq_data_id: &str) -> Result<String, DriverError> {
        self.supported(Capability::MakeMutableUrl)?;
        Ok(format!("{}{}", self.url_prefix(), fq_data_id))
    }

    fn handles_url(&self, url: &str) -> Result<bool, DriverError> {
        self.supported(Capability::HandlesUrl)?;
        Ok(url.starts_with(&self.url_prefix()))
    }

    async fn get_immutable(
        &self,
        data_hash: &str,
        _hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        self.supported(Capability::GetImmutable)?;
        let bytes = self.immutable.read().get(data_hash).cloned();
        Ok(bytes.map(|b| self.maybe_corrupt(b)))
    }

    async fn put_immutable(
        &self,
        data_hash: &str,
        data: &[u8],
        _txid: &str,
    ) -> Result<bool, DriverError> {
        self.supported(Capability::PutImmutable)?;
        self.writable()?;
        self.immutable
            .write()
            .insert(data_hash.to_string(), data.to_vec());
        Ok(true)
    }

    async fn delete_immutable(
        &self,
        data_hash: &str,
        _txid: &str,
        _signature: &str,
    ) -> Result<(), DriverError> {
        self.supported(Capability::DeleteImmutable)?;
        self.writable()?;
        self.immutable.write().remove(data_hash);
        Ok(())
    }

    async fn get_mutable(
        &self,
        url: &str,
        _hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        self.supported(Capability::GetMutable)?;
        let fq_data_id = url
            .strip_prefix(&self.url_prefix())
            .ok_or_else(|| DriverError::UnhandledUrl(url.to_string()))?;
        let bytes = self.mutable.read().get(fq_data_id).cloned();
        Ok(bytes.map(|b| self.maybe_corrupt(b)))
    }

    async fn put_mutable(
        &self,
        fq_data_id: &str,
        data: &[u8],
        _hints: &RequestHints,
    ) -> Result<bool, DriverError> {
        self.supported(Capability::PutMutable)?;
        self.writable()?;
        self.mutable
            .write()
            .insert(fq_data_id.to_string(), data.to_vec());
        Ok(true)
    }

    async fn delete_mutable(&self, fq_data_id: &str, _signature: &str) -> Result<(), DriverError> {
        self.supported(Capability::DeleteMutable)?;
        self.writable()?;
        self.mutable.write().remove(fq_data_id);
        Ok(())
    }
}
