// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # POLARIS Protocol — Core Library
//!
//! POLARIS is a content-addressed, multi-backend storage router with
//! cryptographic authenticity guarantees. It stores and retrieves two
//! kinds of data — immutable blobs verified by their hash, and mutable
//! records verified by signature — across an arbitrary set of pluggable
//! storage backends, each of which may support only a subset of operations
//! and may independently fail.
//!
//! The design stance: storage is untrusted, verification is local.
//! A driver can lose data, serve stale data, or serve garbage; nothing it
//! returns reaches the caller until it has been checked against the
//! content hash (immutable) or a signed envelope (mutable). Replication is
//! best-effort across the fleet, with caller-named "required" drivers as
//! hard dependencies.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of the
//! storage path:
//!
//! - **crypto** — Content hashes, secp256k1 signing, key/address plumbing.
//! - **envelope** — The signed wire formats for mutable data, both
//!   generations.
//! - **data_id** — Names and fully-qualified data IDs.
//! - **storage** — The driver interface, registry, and routing core.
//! - **drivers** — Built-in driver implementations (memory, local disk,
//!   HTTP).
//! - **fetch** — The generic URL fetcher behind the immutable URL-hint
//!   path.
//! - **config** — Protocol constants and wire-format parameters.
//!
//! ## Design Philosophy
//!
//! 1. Verify everything fetched; trust nothing a backend says.
//! 2. One driver failing is routine, not an error. All of them failing is
//!    an error.
//! 3. Wire formats are forever. Old envelopes must keep verifying.
//! 4. No unsafe code in crypto paths — we sleep at night.

pub mod config;
pub mod crypto;
pub mod data_id;
pub mod drivers;
pub mod envelope;
pub mod fetch;
pub mod storage;
