//! # Content Hashing
//!
//! The two hash functions that give immutable data its identity:
//!
//! - **SHA-256** (`data_hash`) — the generic content hash. The hex digest of
//!   a datum *is* its address and its integrity check; there is no second key.
//! - **hash160** (`chain_hash`) — RIPEMD-160 over SHA-256, the classic
//!   Bitcoin construction. Used where the hash must fit a fixed-width
//!   on-chain field: zonefiles and announcements.
//!
//! Both return lowercase hex strings, because every consumer of these values
//! (drivers, on-chain records, log lines) speaks hex.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Which hash function keys a piece of immutable data.
///
/// Callers fetching ordinary immutable data use [`ContentHash::Data`];
/// zonefiles and announcements are keyed on-chain and use
/// [`ContentHash::Chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentHash {
    /// SHA-256, hex-encoded. 64 hex characters.
    #[default]
    Data,
    /// hash160 (RIPEMD-160 over SHA-256), hex-encoded. 40 hex characters.
    Chain,
}

impl ContentHash {
    /// Hash `data` with the selected function and return the hex digest.
    pub fn compute(&self, data: &[u8]) -> String {
        match self {
            ContentHash::Data => data_hash(data),
            ContentHash::Chain => chain_hash(data),
        }
    }
}

/// Compute the generic content hash: SHA-256, hex-encoded.
///
/// This is the identity of ordinary immutable data. Any bytes fetched from a
/// driver are re-hashed with this function and compared against the requested
/// address before they are allowed anywhere near the caller.
///
/// # Example
///
/// ```
/// use polaris_protocol::crypto::data_hash;
///
/// let h = data_hash(b"hello");
/// assert_eq!(h.len(), 64);
/// ```
pub fn data_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compute the blockchain-compatible hash: RIPEMD-160 over SHA-256.
///
/// 20 bytes / 40 hex characters, short enough to embed in a fixed-width
/// on-chain field. Zonefiles and announcements are keyed with this.
pub fn chain_hash(data: &[u8]) -> String {
    let sha = Sha256::digest(data);
    hex::encode(Ripemd160::digest(sha))
}

/// Hash a serialized zonefile. Alias for [`chain_hash`] over the canonical
/// text; the textual zonefile grammar itself is handled by the caller.
pub fn zonefile_hash(zonefile_text: &str) -> String {
    chain_hash(zonefile_text.as_bytes())
}

/// Verify that a serialized zonefile hashes to the expected on-chain value.
///
/// `zonefile_text` must be the canonical serialization; re-serializing a
/// parsed zonefile through a different encoder will not reproduce the hash.
pub fn verify_zonefile(zonefile_text: &str, expected_hash: &str) -> bool {
    let got = zonefile_hash(zonefile_text);
    let ok = got == expected_hash;
    tracing::debug!(expected = expected_hash, %got, ok, "zonefile hash check");
    ok
}
