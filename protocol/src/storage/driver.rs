//! # Storage Driver Interface
//!
//! A storage driver is a named capability bundle: a backend (disk, an HTTP
//! gateway, a cloud bucket, a peer) that can serve some subset of the eight
//! storage operations. Drivers advertise what they support; the router
//! treats everything else as "skip this driver", never as an error, unless
//! the caller explicitly marked the driver as required.
//!
//! Every method on [`StorageDriver`] has a default body returning
//! [`DriverError::Unsupported`], so a driver implements exactly the
//! operations its backend can express and nothing more. A read-only HTTP
//! gateway implements two methods; a full-service disk store implements all
//! eight.
//!
//! Identity is the driver's [`name`](StorageDriver::name); the registry
//! de-duplicates by it. Drivers are registered once and live for the life
//! of the process, so implementations must be `Send + Sync` and interior-
//! mutable where they need state.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a driver can report to the router.
///
/// The router classifies these at its boundary; none of them propagate to
/// the router's callers directly.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver does not implement this operation. Soft unless the
    /// driver is in the caller's required set.
    #[error("operation not supported by this driver")]
    Unsupported,

    /// The driver was handed a URL it cannot serve. A routing mismatch,
    /// not a data problem; the router moves on to the next candidate.
    #[error("driver does not handle URL: {0}")]
    UnhandledUrl(String),

    /// Anything that went wrong in the backend itself: transport faults,
    /// storage corruption, timeouts.
    #[error("backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// The eight operations a driver may support.
///
/// Used for registration-time sanity warnings and by the router to skip
/// drivers without calling into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Can synthesize a URL for a mutable datum.
    MakeMutableUrl,
    /// Can say whether a given URL belongs to this driver.
    HandlesUrl,
    /// Can fetch immutable data by hash.
    GetImmutable,
    /// Can store immutable data under its hash.
    PutImmutable,
    /// Can delete immutable data.
    DeleteImmutable,
    /// Can fetch mutable data by URL.
    GetMutable,
    /// Can store mutable data under a fully-qualified data ID.
    PutMutable,
    /// Can delete mutable data.
    DeleteMutable,
}

impl Capability {
    /// Every capability, in interface order.
    pub const ALL: [Capability; 8] = [
        Capability::MakeMutableUrl,
        Capability::HandlesUrl,
        Capability::GetImmutable,
        Capability::PutImmutable,
        Capability::DeleteImmutable,
        Capability::GetMutable,
        Capability::PutMutable,
        Capability::DeleteMutable,
    ];

    /// The driver method this capability corresponds to, for log messages.
    pub fn method_name(&self) -> &'static str {
        match self {
            Capability::MakeMutableUrl => "make_mutable_url",
            Capability::HandlesUrl => "handles_url",
            Capability::GetImmutable => "get_immutable",
            Capability::PutImmutable => "put_immutable",
            Capability::DeleteImmutable => "delete_immutable",
            Capability::GetMutable => "get_mutable",
            Capability::PutMutable => "put_mutable",
            Capability::DeleteMutable => "delete_mutable",
        }
    }
}

// ---------------------------------------------------------------------------
// Request Hints
// ---------------------------------------------------------------------------

/// Optional context passed through to drivers on reads and writes.
///
/// Hints never change what data is addressed; they let a driver organize
/// or locate data more intelligently (e.g. group a user's records, or use
/// a dedicated zonefile index).
#[derive(Debug, Clone, Default)]
pub struct RequestHints {
    /// Fully-qualified name of the owning user, when known.
    pub fqu: Option<String>,
    /// Human-readable identifier for the datum, when known.
    pub data_id: Option<String>,
    /// Whether the datum is a zonefile.
    pub zonefile: bool,
}

// ---------------------------------------------------------------------------
// Driver Trait
// ---------------------------------------------------------------------------

/// A pluggable storage backend.
///
/// Object-safe; the registry holds drivers as `Arc<dyn StorageDriver>`.
/// Implement the methods your backend supports and list them in
/// [`capabilities`](Self::capabilities); leave the rest to the defaults.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Unique driver name. This is the driver's identity: the registry
    /// de-duplicates by it, and callers reference drivers by it in
    /// whitelists and required sets.
    fn name(&self) -> &str;

    /// The operations this driver implements.
    fn capabilities(&self) -> &[Capability];

    /// Synthesize the URL under which a mutable datum would live in this
    /// driver's backend.
    fn make_mutable_url(&self, fq_data_id: &str) -> Result<String, DriverError> {
        let _ = fq_data_id;
        Err(DriverError::Unsupported)
    }

    /// Does this driver serve the given URL?
    fn handles_url(&self, url: &str) -> Result<bool, DriverError> {
        let _ = url;
        Err(DriverError::Unsupported)
    }

    /// Fetch immutable data by content hash. `Ok(None)` means the driver
    /// simply does not have the data; that is not an error.
    async fn get_immutable(
        &self,
        data_hash: &str,
        hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        let _ = (data_hash, hints);
        Err(DriverError::Unsupported)
    }

    /// Store immutable data under its content hash. `txid` is the
    /// blockchain transaction that anchors the hash. Returns whether the
    /// driver accepted the write.
    async fn put_immutable(
        &self,
        data_hash: &str,
        data: &[u8],
        txid: &str,
    ) -> Result<bool, DriverError> {
        let _ = (data_hash, data, txid);
        Err(DriverError::Unsupported)
    }

    /// Delete immutable data. `signature` authenticates the deletion
    /// request; it covers the hash and the anchoring transaction ID.
    async fn delete_immutable(
        &self,
        data_hash: &str,
        txid: &str,
        signature: &str,
    ) -> Result<(), DriverError> {
        let _ = (data_hash, txid, signature);
        Err(DriverError::Unsupported)
    }

    /// Fetch mutable data from one of this driver's URLs. A driver that
    /// is handed a URL it cannot serve returns
    /// [`DriverError::UnhandledUrl`] so the router can move on.
    async fn get_mutable(
        &self,
        url: &str,
        hints: &RequestHints,
    ) -> Result<Option<Vec<u8>>, DriverError> {
        let _ = (url, hints);
        Err(DriverError::Unsupported)
    }

    /// Store a serialized mutable-data envelope under a fully-qualified
    /// data ID. Returns whether the driver accepted the write.
    async fn put_mutable(
        &self,
        fq_data_id: &str,
        data: &[u8],
        hints: &RequestHints,
    ) -> Result<bool, DriverError> {
        let _ = (fq_data_id, data, hints);
        Err(DriverError::Unsupported)
    }

    /// Delete mutable data. `signature` covers the fully-qualified data ID.
    async fn delete_mutable(&self, fq_data_id: &str, signature: &str) -> Result<(), DriverError> {
        let _ = (fq_data_id, signature);
        Err(DriverError::Unsupported)
    }
}
