//! # Key Utilities
//!
//! secp256k1 key handling for the storage layer: parsing private keys from
//! hex, deriving and decompressing public keys, and turning public keys into
//! the base58check addresses that envelope verification compares against.
//!
//! Keys arrive as hex strings because that is how the wallet layer hands
//! them over. Some wallets append a trailing `01` byte to a private key to
//! flag that the corresponding public key should be treated as compressed;
//! that flag is stripped before the scalar is parsed.
//!
//! Key bytes are never logged. If you add logging to this module, you will
//! be asked to leave.

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config;

/// Errors during key parsing and address derivation.
///
/// Intentionally vague about the key material itself; the variants say what
/// shape was wrong, never what the bytes were.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key: not a hex-encoded secp256k1 scalar")]
    InvalidPrivateKey,

    #[error("invalid public key: not a hex-encoded SEC1 point")]
    InvalidPublicKey,

    #[error("invalid address: not base58check")]
    InvalidAddress,
}

/// Is this private key a single-signature key?
///
/// The storage layer only signs with bare secp256k1 scalars: 64 hex
/// characters, or 66 with the trailing compression flag. Anything else
/// (in particular a serialized multi-signature bundle) is unsupported and
/// must be rejected before any I/O happens.
pub fn is_singlesig(private_key: &str) -> bool {
    let len_ok = private_key.len() == config::PRIVATE_KEY_HEX_LENGTH
        || private_key.len() == config::PRIVATE_KEY_HEX_LENGTH + 2;
    len_ok && private_key.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a hex private key into a signing key.
///
/// Accepts the bare 64-character scalar or the 66-character form with a
/// trailing `01` compression flag, which is stripped. Any other shape is an
/// [`KeyError::InvalidPrivateKey`].
pub fn parse_private_key(private_key: &str) -> Result<SigningKey, KeyError> {
    let hex_scalar = if private_key.len() > config::PRIVATE_KEY_HEX_LENGTH {
        let (scalar, suffix) = private_key.split_at(config::PRIVATE_KEY_HEX_LENGTH);
        if suffix != config::COMPRESSION_FLAG_SUFFIX {
            return Err(KeyError::InvalidPrivateKey);
        }
        scalar
    } else {
        private_key
    };

    let bytes = hex::decode(hex_scalar).map_err(|_| KeyError::InvalidPrivateKey)?;
    SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)
}

/// Derive the uncompressed hex public key (130 characters) for a private key.
pub fn public_key_hex(private_key: &str) -> Result<String, KeyError> {
    let signing_key = parse_private_key(private_key)?;
    let point = signing_key.verifying_key().to_encoded_point(false);
    Ok(hex::encode(point.as_bytes()))
}

/// Parse a hex public key (compressed or uncompressed) into a verifying key.
pub fn parse_public_key(pubkey_hex: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| KeyError::InvalidPublicKey)?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Is this hex public key in compressed SEC1 form?
pub fn is_compressed(pubkey_hex: &str) -> bool {
    pubkey_hex.len() == config::COMPRESSED_PUBKEY_HEX_LENGTH
}

/// Decompress a hex public key to its 130-character uncompressed form.
///
/// Uncompressed input passes through unchanged (modulo hex case), so this is
/// safe to call unconditionally before comparing two keys for equality.
pub fn decompress_public_key(pubkey_hex: &str) -> Result<String, KeyError> {
    let key = parse_public_key(pubkey_hex)?;
    Ok(hex::encode(key.to_encoded_point(false).as_bytes()))
}

/// Derive the base58check address for a hex public key.
///
/// hash160 over the SEC1 bytes exactly as given, with the fixed version
/// byte 0. Compressed and uncompressed encodings of the same point yield
/// different addresses; callers comparing addresses must decompress first.
pub fn address_from_public_key(pubkey_hex: &str) -> Result<String, KeyError> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| KeyError::InvalidPublicKey)?;
    // Round-trip through the parser so garbage that happens to be hex is
    // still rejected as a public key.
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;

    let h160 = hash160_bytes(&bytes);
    Ok(bs58::encode(h160)
        .with_check_version(config::ADDRESS_VERSION_BYTE)
        .into_string())
}

/// Re-encode any base58check address with the fixed version byte 0.
///
/// Envelope verification always compares version-0 addresses, whatever
/// network prefix the caller's address carried.
pub fn normalize_address(address: &str) -> Result<String, KeyError> {
    let decoded = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| KeyError::InvalidAddress)?;
    // First byte is the version; the rest is the hash160 payload.
    if decoded.len() != 21 {
        return Err(KeyError::InvalidAddress);
    }
    Ok(bs58::encode(&decoded[1..])
        .with_check_version(config::ADDRESS_VERSION_BYTE)
        .into_string())
}

/// Generate a fresh private key as a bare hex scalar.
///
/// Uses the OS cryptographic RNG. Meant for the CLI and tests; production
/// deployments derive their data keys from the wallet layer.
pub fn generate_private_key() -> String {
    let signing_key = SigningKey::random(&mut OsRng);
    hex::encode(signing_key.to_bytes())
}

fn hash160_bytes(data: &[u8]) -> [u8; 20] {
    use ripemd::Ripemd160;
    use sha2::{Digest, Sha256};
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}
