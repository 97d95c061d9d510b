//! # Storage Module
//!
//! Content-addressed, multi-backend storage routing. This module is the
//! core of POLARIS: it decides where data goes, where it comes from, and
//! whether it can be trusted.
//!
//! ## Architecture
//!
//! ```text
//! driver.rs   — StorageDriver trait: the capability bundle a backend exposes
//! registry.rs — ordered, name-deduplicated set of registered drivers
//! router.rs   — get/put/delete fan-out with verification and escalation
//! announce.rs — chain-hash-keyed raw text on top of the immutable path
//! error.rs    — the soft/hard error taxonomy
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! caller → StorageRouter → DriverRegistry → driver I/O
//!                ↓                              ↓
//!          envelope/crypto  ←———  verify  ←———  bytes
//! ```
//!
//! Reads verify before they return: immutable bytes must hash to their
//! address, mutable bytes must carry a valid signed envelope. Writes are
//! best-effort broadcasts with per-driver "required" escalation. Drivers
//! are capability subsets; whatever a driver cannot do is simply skipped.

pub mod announce;
pub mod driver;
pub mod error;
pub mod registry;
pub mod router;

pub use driver::{Capability, DriverError, RequestHints, StorageDriver};
pub use error::StorageError;
pub use registry::DriverRegistry;
pub use router::{
    GetImmutableOptions, GetMutableOptions, ImmutableContent, PutMutableOptions, RouterConfig,
    StorageRouter,
};
