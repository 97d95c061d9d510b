//! # Names & Fully-Qualified Data IDs
//!
//! Mutable data is addressed by a *fully-qualified data ID*: either a bare
//! name (`alice.id`) or a name plus an opaque datum identifier
//! (`alice.id:profile`). The name prefix is what keeps two users' records
//! under the same opaque ID from colliding in shared storage.
//!
//! Names follow the on-chain registrar's grammar: `name.namespace`, both
//! segments lowercase alphanumerics plus `-`, `_` and `+`, at most 37
//! characters in total. The namespace separator is the only dot allowed.

use crate::config;

/// Check a fully-qualified name against the registrar's grammar.
///
/// `name.namespace`, both segments non-empty, charset
/// `[a-z0-9\-_+]`, total length at most [`config::MAX_NAME_LENGTH`].
pub fn is_name_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > config::MAX_NAME_LENGTH {
        return false;
    }

    let mut parts = name.split('.');
    let (label, namespace) = match (parts.next(), parts.next(), parts.next()) {
        (Some(label), Some(namespace), None) => (label, namespace),
        _ => return false,
    };

    !label.is_empty()
        && !namespace.is_empty()
        && label.chars().all(|c| config::NAME_CHARSET.contains(c))
        && namespace.chars().all(|c| config::NAME_CHARSET.contains(c))
}

/// Build a fully-qualified data ID: `name:data_id`.
///
/// The `data_id` is opaque to the storage layer; only the name prefix is
/// ever interpreted.
pub fn make_fq_data_id(name: &str, data_id: &str) -> String {
    format!("{name}{}{data_id}", config::FQ_DATA_ID_SEPARATOR)
}

/// Is this data ID fully qualified?
///
/// True iff the string splits on `:` into a name and a (possibly
/// `:`-containing) remainder, and the name passes [`is_name_valid`].
pub fn is_fq_data_id(fq_data_id: &str) -> bool {
    match fq_data_id.split_once(config::FQ_DATA_ID_SEPARATOR) {
        Some((name, _)) => is_name_valid(name),
        None => false,
    }
}

/// Derive the name hint for a data ID.
///
/// A fully-qualified `name:data_id` yields its name part; a bare string
/// that is itself a valid name yields itself; anything else yields no hint.
/// Drivers use the hint to place a user's records together.
pub fn name_hint(fq_data_id: &str) -> Option<&str> {
    if let Some((name, _)) = fq_data_id.split_once(config::FQ_DATA_ID_SEPARATOR) {
        if is_name_valid(name) {
            return Some(name);
        }
        return None;
    }
    if is_name_valid(fq_data_id) {
        Some(fq_data_id)
    } else {
        None
    }
}
