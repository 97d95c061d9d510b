//! # Legacy Signed Token Records
//!
//! The first generation of mutable-data envelopes wrapped the payload in a
//! list of signed token records: ES256K JWTs (`header.payload.signature`,
//! base64url) carrying the payload under a `claim` field and the signer
//! under `issuer.publicKey`. Profiles published before the v2 format are
//! still stored this way, so the codec keeps both directions alive.
//!
//! A serialized record looks like:
//!
//! ```json
//! {
//!   "token": "eyJ0eXAi....eyJjbGFp....MEQCIB...",
//!   "parentPublicKey": "04ab...",
//!   "encrypted": false
//! }
//! ```
//!
//! The signature is computed over the literal `header.payload` text of the
//! token, with the same secp256k1 scheme the rest of the crate uses.

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};

use crate::crypto::{keys, signing};

use super::EnvelopeError;

/// What a token record is verified against.
#[derive(Debug, Clone)]
pub enum TokenVerifier {
    /// Require the issuer's public key to equal this hex key (compressed or
    /// uncompressed; both sides are decompressed before comparison).
    PublicKey(String),
    /// Require the issuer's public key to hash to this base58check address.
    Address(String),
}

/// Sign each payload into a token record.
///
/// Every record carries the token itself, the signer's public key as
/// `parentPublicKey`, and a decoded copy of the token under `decodedToken`.
/// The decoded copy exists for callers that want to inspect the claim
/// without re-parsing the JWT; the envelope serializer strips it before
/// anything hits the wire.
pub fn sign_token_records(
    payloads: &[Value],
    private_key: &str,
) -> Result<Vec<Value>, EnvelopeError> {
    let public_key = keys::public_key_hex(private_key)?;

    payloads
        .iter()
        .map(|payload| {
            let header = json!({ "typ": "JWT", "alg": "ES256K" });
            let claims = json!({
                "claim": payload,
                "issuedAt": Utc::now().to_rfc3339(),
                "issuer": { "publicKey": public_key },
                "subject": { "publicKey": public_key },
            });

            let header_b64 = BASE64_URL.encode(header.to_string());
            let claims_b64 = BASE64_URL.encode(claims.to_string());
            let signing_input = format!("{header_b64}.{claims_b64}");

            let sig_std = signing::sign_data(signing_input.as_bytes(), private_key)?;
            let sig_bytes = BASE64
                .decode(&sig_std)
                .map_err(|_| EnvelopeError::Malformed("signature encoding".into()))?;
            let sig_b64 = BASE64_URL.encode(sig_bytes);

            Ok(json!({
                "token": format!("{signing_input}.{sig_b64}"),
                "parentPublicKey": public_key,
                "encrypted": false,
                "decodedToken": {
                    "header": header,
                    "payload": claims,
                    "signature": sig_b64,
                },
            }))
        })
        .collect()
}

/// Extract the first verified payload from a list of token records.
///
/// Records that fail to parse or verify are skipped, not fatal; the caller
/// only learns whether *some* record checked out. Returns `None` when no
/// record verified.
pub fn profile_from_tokens(records: &Value, verifier: &TokenVerifier) -> Option<Value> {
    let records = records.as_array()?;

    for record in records {
        match verify_token_record(record, verifier) {
            Ok(claim) => return Some(claim),
            Err(err) => {
                tracing::debug!(%err, "token record rejected");
                continue;
            }
        }
    }

    None
}

/// Verify a single token record and return its claim.
fn verify_token_record(record: &Value, verifier: &TokenVerifier) -> Result<Value, EnvelopeError> {
    let token = record
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| EnvelopeError::Malformed("record has no token".into()))?;

    let mut parts = token.split('.');
    let (header_b64, claims_b64, sig_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(EnvelopeError::Malformed("token is not a three-part JWT".into())),
    };

    let claims_bytes = BASE64_URL
        .decode(claims_b64)
        .map_err(|_| EnvelopeError::Malformed("token payload is not base64url".into()))?;
    let claims: Value = serde_json::from_slice(&claims_bytes)
        .map_err(|_| EnvelopeError::Malformed("token payload is not JSON".into()))?;

    let issuer_key = claims
        .pointer("/issuer/publicKey")
        .and_then(Value::as_str)
        .ok_or_else(|| EnvelopeError::Malformed("token has no issuer key".into()))?;
    let issuer_key = keys::decompress_public_key(issuer_key)?;

    // The issuer must match what the caller expects before the signature
    // is even looked at.
    match verifier {
        TokenVerifier::PublicKey(expected) => {
            if keys::decompress_public_key(expected)? != issuer_key {
                return Err(EnvelopeError::KeyMismatch);
            }
        }
        TokenVerifier::Address(expected) => {
            if keys::address_from_public_key(&issuer_key)? != *expected {
                return Err(EnvelopeError::KeyMismatch);
            }
        }
    }

    let sig_bytes = BASE64_URL
        .decode(sig_b64)
        .map_err(|_| EnvelopeError::Malformed("token signature is not base64url".into()))?;
    let sig_std = BASE64.encode(sig_bytes);

    let signing_input = format!("{header_b64}.{claims_b64}");
    if !signing::verify_data(signing_input.as_bytes(), &issuer_key, &sig_std) {
        return Err(EnvelopeError::BadSignature);
    }

    claims
        .get("claim")
        .cloned()
        .ok_or_else(|| EnvelopeError::Malformed("token has no claim".into()))
}
