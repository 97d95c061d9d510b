//! # Raw Signing & Verification
//!
//! ECDSA over secp256k1 with SHA-256 message digests: the signature scheme
//! every mutable envelope and every deletion request is authenticated with.
//!
//! Two properties are load-bearing here and covered by tests:
//!
//! 1. **Determinism.** Nonces come from RFC 6979, so the same key and
//!    message always produce the same signature. No RNG at signing time.
//! 2. **Low-S canonical form.** After signing, if `s > n/2` the signature
//!    is replaced with `(r, n - s)`. Verifiers that enforce canonical
//!    signatures (on-chain consumers do) reject the high-S twin.
//!
//! Signatures travel as base64 of the 64-byte big-endian `r || s` pair.
//! Verification takes the caller's bytes exactly as transmitted; it never
//! re-serializes, and it never faults. Malformed input is just `false`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::Signature;

use crate::config;
use crate::crypto::keys::{self, KeyError};

/// Sign a byte sequence with a hex private key.
///
/// Returns the base64-encoded 64-byte `r || s` signature, low-S normalized.
/// The private key may carry the trailing `01` compression flag; it is
/// stripped before signing.
pub fn sign_data(data: &[u8], private_key: &str) -> Result<String, KeyError> {
    let signing_key = keys::parse_private_key(private_key)?;
    let signature: Signature = signing_key.sign(data);

    // Canonicalize: a high-S signature is replaced by its low-S twin.
    let signature = signature.normalize_s().unwrap_or(signature);

    Ok(BASE64.encode(signature.to_bytes()))
}

/// Verify a base64 signature over a byte sequence.
///
/// The public key may be compressed or uncompressed hex. Returns `false`
/// for a bad signature, a malformed public key, malformed base64, or a
/// decoded signature that is not exactly 64 bytes. Callers get a boolean,
/// never a fault.
pub fn verify_data(data: &[u8], public_key_hex: &str, signature_b64: &str) -> bool {
    let verifying_key = match keys::parse_public_key(public_key_hex) {
        Ok(key) => key,
        Err(_) => {
            tracing::debug!("signature check failed: malformed public key");
            return false;
        }
    };

    let sig_bytes = match BASE64.decode(signature_b64) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::debug!("signature check failed: not base64");
            return false;
        }
    };

    if sig_bytes.len() != config::SIGNATURE_LENGTH {
        tracing::debug!(len = sig_bytes.len(), "signature check failed: wrong length");
        return false;
    }

    let signature = match Signature::from_slice(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    verifying_key.verify(data, &signature).is_ok()
}
