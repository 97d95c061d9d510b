//! # Cryptographic Primitives for POLARIS
//!
//! Everything authenticity-related in the storage layer flows through here:
//! the content hashes that address immutable data, the ECDSA signatures that
//! authenticate mutable data, and the key/address plumbing between them.
//!
//! The choices are fixed by the wire formats, not by fashion:
//!
//! - **SHA-256** for content addresses — the hash *is* the datum's identity.
//! - **hash160** (RIPEMD-160 ∘ SHA-256) where the digest must fit an
//!   on-chain field: zonefiles and announcements.
//! - **secp256k1 ECDSA**, low-S canonical, for every signature. Envelopes
//!   published years ago verify against exactly this scheme, so it stays.
//!
//! All of it is a thin, type-safe layer over audited RustCrypto
//! implementations. If you are tempted to hand-roll any of these
//! operations, go read about nonce-reuse attacks first and then don't.

pub mod hash;
pub mod keys;
pub mod signing;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use hash::{chain_hash, data_hash, verify_zonefile, zonefile_hash, ContentHash};
pub use keys::{
    address_from_public_key, decompress_public_key, generate_private_key, is_singlesig,
    normalize_address, public_key_hex, KeyError,
};
pub use signing::{sign_data, verify_data};
