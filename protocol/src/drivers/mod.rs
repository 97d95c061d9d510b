//! # Built-in Storage Drivers
//!
//! Concrete [`StorageDriver`](crate::storage::StorageDriver)
//! implementations shipped with the crate:
//!
//! - [`MemoryDriver`] — in-process, full capability set, with fault
//!   injection; the reference implementation and the test workhorse.
//! - [`LocalDriver`] — persistent local storage on sled; the default for
//!   single-node deployments.
//! - [`HttpDriver`] — read-only access to data behind `http(s)://` URLs.
//!
//! Anything else (cloud buckets, peers, gateways) lives outside this crate
//! and plugs in through the same trait.

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpDriver;
pub use local::{LocalDriver, LOCAL_URL_SCHEME};
pub use memory::MemoryDriver;
