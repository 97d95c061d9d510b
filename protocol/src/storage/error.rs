//! Error types for the storage router.
//!
//! The router's failure model is deliberately lopsided: almost everything
//! that can go wrong during a fan-out is *soft* (log it, try the next
//! candidate), and only a handful of conditions are allowed to terminate an
//! operation. [`StorageError`] covers both; which variants escalate is
//! decided by the router loops, not by the error type.
//!
//! Soft, folded into the fan-out: [`StorageError::HashMismatch`],
//! [`StorageError::Envelope`], [`StorageError::CapabilityMissing`],
//! [`StorageError::DriverFailed`].
//!
//! Hard, operation-terminating: [`StorageError::ReplicationFailed`],
//! [`StorageError::AllDriversFailed`], and the two caller-contract
//! violations [`StorageError::UnsupportedKey`] and
//! [`StorageError::InvalidPayload`], which are rejected before any I/O.

use thiserror::Error;

use crate::envelope::EnvelopeError;

/// Errors that can occur while routing data to and from storage drivers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Fetched bytes do not hash to the requested content address. The
    /// data is discarded and never surfaced to the caller.
    #[error("data hash mismatch: expected {expected}, got {got}")]
    HashMismatch {
        /// The content address that was requested.
        expected: String,
        /// What the fetched bytes actually hash to.
        got: String,
    },

    /// A mutable-data envelope failed to decode or verify.
    #[error("envelope rejected: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A driver does not implement the operation the caller needs.
    #[error("driver \"{driver}\" does not support {operation}")]
    CapabilityMissing {
        /// The driver's registered name.
        driver: String,
        /// The missing driver method.
        operation: &'static str,
    },

    /// A driver call failed or timed out.
    #[error("driver \"{driver}\" failed: {message}")]
    DriverFailed {
        /// The driver's registered name.
        driver: String,
        /// What the driver reported.
        message: String,
    },

    /// A driver in the caller's required set could not store the data.
    /// Required drivers veto the whole operation on any failure.
    #[error("replication failed: required driver \"{driver}\" did not accept the data")]
    ReplicationFailed {
        /// The required driver that failed.
        driver: String,
    },

    /// Every driver was tried and none accepted the data.
    #[error("replication failed: no storage driver accepted the data")]
    AllDriversFailed,

    /// A multi-signature private key was used where only single-signature
    /// keys are supported. Checked before any I/O happens.
    #[error("only single-signature data private keys are supported")]
    UnsupportedKey,

    /// The caller handed the router data that violates the contract.
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),
}
