//! # Mutable Data Envelopes
//!
//! Immutable data is authenticated by its hash; mutable data is
//! authenticated by a signature. This module is the codec for the signed
//! envelope that wraps every mutable datum on its way to and from storage.
//!
//! Two wire generations coexist and both must keep working forever, because
//! data already replicated to third-party storage providers cannot be
//! re-signed:
//!
//! - **v2** (current): `bsk2.<pubkey_hex>.<signature_base64>.<json_text>`.
//!   The signature covers the exact `json_text` byte sequence as it appears
//!   on the wire. The JSON is canonical: stable lexicographic key order,
//!   so re-signing the same payload yields the same text.
//! - **Legacy**: a JSON array of signed token records (ES256K JWTs), the
//!   original profile format. See [`token`].
//!
//! [`open`] sniffs the format by prefix and dispatches; both decoders share
//! the same `Result<Value, EnvelopeError>` contract. The security-relevant
//! rule, enforced in both: the signer embedded in the envelope must match
//! what the *caller* expects (a public key, or an address derived from one)
//! before the payload is trusted. An envelope that verifies against its own
//! embedded key proves nothing.

pub mod token;

use serde_json::Value;
use thiserror::Error;

use crate::config;
use crate::crypto::keys::{self, KeyError};
use crate::crypto::signing;

use token::{profile_from_tokens, sign_token_records, TokenVerifier};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an envelope failed to decode.
///
/// All of these are soft from the router's point of view: the caller tries
/// the next candidate source. The variants exist so that logs distinguish a
/// garbled envelope from a signer mismatch from a genuine bad signature.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope text does not have the expected shape.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The embedded signer does not match the expected public key or the
    /// address derived from the expected public key hash.
    #[error("signer does not match the expected key")]
    KeyMismatch,

    /// The signer matched, but the signature did not verify over the
    /// payload text.
    #[error("signature verification failed")]
    BadSignature,

    /// A key or address field could not be parsed at all.
    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize and sign a mutable-data payload.
///
/// With `as_profile`, the payload is wrapped in the legacy signed-token
/// format (a JSON array of token records); profiles published this way stay
/// readable by consumers that predate v2. The decoded copy each record
/// carries is stripped before serialization so unsigned data never reaches
/// the wire.
///
/// Otherwise the payload becomes a v2 envelope: the canonical JSON text is
/// signed with `private_key` and emitted as
/// `bsk2.<public_key>.<signature>.<json>`.
pub fn seal(
    payload: &Value,
    private_key: &str,
    public_key: &str,
    as_profile: bool,
) -> Result<String, EnvelopeError> {
    if as_profile {
        let mut records = sign_token_records(std::slice::from_ref(payload), private_key)?;
        for record in &mut records {
            if let Some(map) = record.as_object_mut() {
                map.remove("decodedToken");
            }
        }
        return serde_json::to_string(&records)
            .map_err(|e| EnvelopeError::Malformed(e.to_string()));
    }

    let data_txt =
        serde_json::to_string(payload).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    let signature = signing::sign_data(data_txt.as_bytes(), private_key)?;

    Ok(format!(
        "{}{}.{}.{}",
        config::ENVELOPE_PREFIX_V2,
        public_key,
        signature,
        data_txt
    ))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode and verify a mutable-data envelope.
///
/// Format is sniffed from the text: the `bsk2.` prefix selects the v2
/// decoder, anything else is treated as a legacy token record list.
///
/// `public_key` and `public_key_hash` are what the caller expects the
/// signer to be; the hash is a base58check address and is re-encoded with
/// the fixed version byte before comparison. The public key is tried
/// first, the hash second. At least one must be given.
pub fn open(
    text: &str,
    public_key: Option<&str>,
    public_key_hash: Option<&str>,
) -> Result<Value, EnvelopeError> {
    if let Some(body) = text.strip_prefix(config::ENVELOPE_PREFIX_V2) {
        return open_v2(body, public_key, public_key_hash);
    }
    open_legacy(text, public_key, public_key_hash)
}

/// v2 decoder: `<pubkey_hex>.<signature_base64>.<json_text>`.
fn open_v2(
    body: &str,
    public_key: Option<&str>,
    public_key_hash: Option<&str>,
) -> Result<Value, EnvelopeError> {
    // The JSON text may itself contain '.', so only the first two dots
    // delimit fields.
    let mut parts = body.splitn(config::ENVELOPE_V2_FIELDS, '.');
    let (pubkey_field, sig_b64, data_txt) = match (parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(s), Some(d)) => (p, s, d),
        _ => {
            return Err(EnvelopeError::Malformed(
                "expected three dot-separated fields".into(),
            ))
        }
    };

    if pubkey_field.is_empty() || !pubkey_field.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EnvelopeError::Malformed("public key field is not hex".into()));
    }
    if sig_b64.is_empty() || !is_base64_shaped(sig_b64) {
        return Err(EnvelopeError::Malformed(
            "signature field is not base64".into(),
        ));
    }

    let embedded_key = keys::decompress_public_key(pubkey_field)?;

    if public_key.is_none() && public_key_hash.is_none() {
        return Err(EnvelopeError::Malformed(
            "no expected public key or key hash to verify against".into(),
        ));
    }

    // First ladder rung: the caller's expected public key, compared after
    // decompressing both sides.
    let mut failure = EnvelopeError::KeyMismatch;
    if let Some(expected) = public_key {
        let expected = keys::decompress_public_key(expected)?;
        if expected == embedded_key {
            if signing::verify_data(data_txt.as_bytes(), &embedded_key, sig_b64) {
                return parse_payload(data_txt);
            }
            tracing::debug!("v2 envelope signature failed against expected public key");
            failure = EnvelopeError::BadSignature;
        } else {
            tracing::debug!("v2 envelope public key mismatch");
        }
    }

    // Second rung: the expected key hash, compared as version-0 addresses.
    if let Some(hash) = public_key_hash {
        let expected_address = keys::normalize_address(hash)?;
        let embedded_address = keys::address_from_public_key(&embedded_key)?;
        if expected_address == embedded_address {
            if signing::verify_data(data_txt.as_bytes(), &embedded_key, sig_b64) {
                return parse_payload(data_txt);
            }
            tracing::debug!("v2 envelope signature failed against expected key hash");
            return Err(EnvelopeError::BadSignature);
        }
        tracing::debug!("v2 envelope public key hash mismatch");
    }

    Err(failure)
}

/// Legacy decoder: a JSON list of signed token records.
fn open_legacy(
    text: &str,
    public_key: Option<&str>,
    public_key_hash: Option<&str>,
) -> Result<Value, EnvelopeError> {
    if public_key.is_none() && public_key_hash.is_none() {
        return Err(EnvelopeError::Malformed(
            "need a public key or a public key hash".into(),
        ));
    }

    let records: Value = serde_json::from_str(text)
        .map_err(|_| EnvelopeError::Malformed("legacy envelope is not JSON".into()))?;
    if !records.is_array() && !records.is_object() {
        return Err(EnvelopeError::Malformed(
            "legacy envelope must be a JSON object or array".into(),
        ));
    }

    if let Some(expected) = public_key {
        let verifier = TokenVerifier::PublicKey(expected.to_string());
        if let Some(payload) = profile_from_tokens(&records, &verifier) {
            return Ok(payload);
        }
        tracing::debug!("no token record verified against expected public key");
    }

    if let Some(hash) = public_key_hash {
        let address = keys::normalize_address(hash)?;
        let verifier = TokenVerifier::Address(address);
        if let Some(payload) = profile_from_tokens(&records, &verifier) {
            return Ok(payload);
        }
        tracing::debug!("no token record verified against expected key hash");
    }

    Err(EnvelopeError::BadSignature)
}

fn parse_payload(data_txt: &str) -> Result<Value, EnvelopeError> {
    serde_json::from_str(data_txt)
        .map_err(|_| EnvelopeError::Malformed("envelope payload is not JSON".into()))
}

/// Cheap shape check before the signature is base64-decoded for real.
fn is_base64_shaped(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{address_from_public_key, generate_private_key, public_key_hex};
    use serde_json::json;

    fn keypair() -> (String, String) {
        let private = generate_private_key();
        let public = public_key_hex(&private).unwrap();
        (private, public)
    }

    #[test]
    fn v2_roundtrip_by_public_key() {
        let (private, public) = keypair();
        let payload = json!({"name": "alice", "apps": {"chat": "https://example.com"}});

        let sealed = seal(&payload, &private, &public, false).unwrap();
        assert!(sealed.starts_with("bsk2."));

        let opened = open(&sealed, Some(&public), None).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn v2_roundtrip_by_key_hash() {
        let (private, public) = keypair();
        let address = address_from_public_key(&public).unwrap();
        let payload = json!({"k": 1});

        let sealed = seal(&payload, &private, &public, false).unwrap();
        let opened = open(&sealed, None, Some(&address)).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn v2_canonical_json_is_stable() {
        let (private, public) = keypair();
        let payload = json!({"z": 1, "a": 2, "m": {"y": 3, "b": 4}});

        let first = seal(&payload, &private, &public, false).unwrap();
        let second = seal(&payload, &private, &public, false).unwrap();
        assert_eq!(first, second);

        // Keys come out lexicographically ordered.
        let json_part = first.splitn(4, '.').nth(3).unwrap();
        assert_eq!(json_part, r#"{"a":2,"m":{"b":4,"y":3},"z":1}"#);
    }

    #[test]
    fn v2_tampered_payload_is_rejected() {
        let (private, public) = keypair();
        let sealed = seal(&json!({"balance": 10}), &private, &public, false).unwrap();

        let tampered = sealed.replace("10", "99");
        assert!(matches!(
            open(&tampered, Some(&public), None),
            Err(EnvelopeError::BadSignature)
        ));
    }

    #[test]
    fn v2_wrong_expected_key_is_a_mismatch() {
        let (private, public) = keypair();
        let (_, other_public) = keypair();
        let sealed = seal(&json!({"k": 1}), &private, &public, false).unwrap();

        assert!(matches!(
            open(&sealed, Some(&other_public), None),
            Err(EnvelopeError::KeyMismatch)
        ));
    }

    #[test]
    fn v2_falls_back_from_key_to_hash() {
        // Wrong expected key, but the right key hash: the second ladder
        // rung must still verify the envelope.
        let (private, public) = keypair();
        let (_, other_public) = keypair();
        let address = address_from_public_key(&public).unwrap();

        let sealed = seal(&json!({"k": 1}), &private, &public, false).unwrap();
        let opened = open(&sealed, Some(&other_public), Some(&address)).unwrap();
        assert_eq!(opened, json!({"k": 1}));
    }

    #[test]
    fn v2_invalid_base64_signature_is_malformed_not_a_panic() {
        let (_, public) = keypair();
        let text = format!("bsk2.{}.@@not-base64@@.{{}}", public);
        assert!(matches!(
            open(&text, Some(&public), None),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn v2_non_hex_public_key_field_is_malformed() {
        let (_, public) = keypair();
        let text = "bsk2.zznothex.AAAA.{}";
        assert!(matches!(
            open(text, Some(&public), None),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn v2_missing_fields_are_malformed() {
        let (_, public) = keypair();
        assert!(matches!(
            open("bsk2.deadbeef", Some(&public), None),
            Err(EnvelopeError::Malformed(_))
        ));
        assert!(matches!(
            open("bsk2.", Some(&public), None),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn v2_compressed_embedded_key_is_decompressed() {
        use k256::elliptic_curve::sec1::ToEncodedPoint;

        let private = generate_private_key();
        let signing_key = crate::crypto::keys::parse_private_key(&private).unwrap();
        let compressed = hex::encode(signing_key.verifying_key().to_encoded_point(true).as_bytes());
        let uncompressed =
            hex::encode(signing_key.verifying_key().to_encoded_point(false).as_bytes());

        // Seal with the compressed key embedded; open with the uncompressed
        // expectation. Both sides decompress before comparing.
        let sealed = seal(&json!({"k": 1}), &private, &compressed, false).unwrap();
        let opened = open(&sealed, Some(&uncompressed), None).unwrap();
        assert_eq!(opened, json!({"k": 1}));
    }

    #[test]
    fn profile_roundtrip() {
        let (private, public) = keypair();
        let payload = json!({"@type": "Person", "name": "Alice"});

        let sealed = seal(&payload, &private, &public, true).unwrap();
        assert!(!sealed.starts_with("bsk2."));
        // The decoded copy must not leak onto the wire.
        assert!(!sealed.contains("decodedToken"));

        let opened = open(&sealed, Some(&public), None).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn profile_verifies_by_address_too() {
        let (private, public) = keypair();
        let address = address_from_public_key(&public).unwrap();
        let payload = json!({"name": "Bob"});

        let sealed = seal(&payload, &private, &public, true).unwrap();
        let opened = open(&sealed, None, Some(&address)).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn legacy_requires_some_expectation() {
        assert!(matches!(
            open("[]", None, None),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn legacy_non_json_is_malformed() {
        let (_, public) = keypair();
        assert!(matches!(
            open("not json at all", Some(&public), None),
            Err(EnvelopeError::Malformed(_))
        ));
        // A JSON scalar is not a token record list either.
        assert!(matches!(
            open("42", Some(&public), None),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn legacy_unverifiable_records_fail_closed() {
        let (private, public) = keypair();
        let (_, stranger) = keypair();
        let sealed = seal(&json!({"k": 1}), &private, &public, true).unwrap();

        assert!(matches!(
            open(&sealed, Some(&stranger), None),
            Err(EnvelopeError::BadSignature)
        ));
    }
}
