//! # Protocol Configuration & Constants
//!
//! Every magic number in POLARIS lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are fixed by the wire formats: the envelope prefix,
//! the address version byte, and the signature encoding cannot change without
//! breaking every datum already replicated to storage providers.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Envelope Wire Format
// ---------------------------------------------------------------------------

/// Prefix that marks a version-2 signed mutable-data envelope.
///
/// Everything after this prefix is `<pubkey_hex>.<signature_base64>.<json>`.
/// Data without the prefix is parsed with the legacy token-record decoder.
pub const ENVELOPE_PREFIX_V2: &str = "bsk2.";

/// Number of `.`-separated fields in a v2 envelope body (after the prefix).
pub const ENVELOPE_V2_FIELDS: usize = 3;

/// Prefix of the message signed when deleting a datum, immutable or mutable.
pub const DELETE_SIGIL: &str = "delete:";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// The signature curve. Fixed by the envelope format; every signature ever
/// published was made over secp256k1, so this is not negotiable.
pub const SIGNING_CURVE: &str = "secp256k1";

/// Raw signature length in bytes: the 64-byte big-endian `r || s` pair.
/// Base64-decoded signatures of any other length are rejected outright.
pub const SIGNATURE_LENGTH: usize = 64;

/// Hex length of a private key scalar.
pub const PRIVATE_KEY_HEX_LENGTH: usize = 64;

/// Trailing byte (hex) some wallets append to flag a compressed public key.
/// Stripped before the scalar is parsed.
pub const COMPRESSION_FLAG_SUFFIX: &str = "01";

/// Hex length of a compressed SEC1 public key (33 bytes).
pub const COMPRESSED_PUBKEY_HEX_LENGTH: usize = 66;

/// Hex length of an uncompressed SEC1 public key (65 bytes).
pub const UNCOMPRESSED_PUBKEY_HEX_LENGTH: usize = 130;

/// Version byte for base58check addresses derived during envelope
/// verification. Always 0, regardless of the network the caller lives on.
pub const ADDRESS_VERSION_BYTE: u8 = 0;

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Maximum length of a fully-qualified name (`name.namespace`).
pub const MAX_NAME_LENGTH: usize = 37;

/// Characters permitted in a name or namespace segment.
pub const NAME_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789-_+";

/// Separator between the name and the opaque data ID in a fully-qualified
/// data ID (`name:data_id`).
pub const FQ_DATA_ID_SEPARATOR: char = ':';

// ---------------------------------------------------------------------------
// Router Behavior
// ---------------------------------------------------------------------------

/// Deadline applied to each individual driver call so one slow storage
/// provider cannot starve the whole fan-out.
pub const DEFAULT_DRIVER_TIMEOUT: Duration = Duration::from_secs(30);
