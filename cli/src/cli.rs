//! # CLI Interface
//!
//! Defines the command-line argument structure for the `polaris` binary
//! using `clap` derive. One subcommand per storage operation, plus key
//! generation and version information.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// POLARIS storage client.
///
/// Stores and retrieves hash-verified immutable data and
/// signature-verified mutable records across the configured storage
/// drivers (local disk, plus read-only HTTP).
#[derive(Parser, Debug)]
#[command(
    name = "polaris",
    about = "POLARIS storage router client",
    version,
    propagate_version = true
)]
pub struct PolarisCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log format: "pretty" or "json".
    #[arg(long, env = "POLARIS_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,
}

/// Top-level subcommands for the polaris binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh data keypair and print it as JSON.
    Keygen,
    /// Store a JSON payload as immutable data, keyed by its hash.
    PutImmutable(PutImmutableArgs),
    /// Fetch immutable data by content hash.
    GetImmutable(GetImmutableArgs),
    /// Delete immutable data from every driver that supports deletion.
    DeleteImmutable(DeleteImmutableArgs),
    /// Sign a JSON payload and store it as mutable data.
    PutMutable(PutMutableArgs),
    /// Fetch and verify mutable data by fully-qualified data ID.
    GetMutable(GetMutableArgs),
    /// Delete mutable data from every driver that supports deletion.
    DeleteMutable(DeleteMutableArgs),
    /// Store announcement text, keyed by its chain-compatible hash.
    PutAnnouncement(PutAnnouncementArgs),
    /// Fetch announcement text by chain-compatible hash.
    GetAnnouncement(GetAnnouncementArgs),
    /// Print version information and exit.
    Version,
}

/// Where the local storage driver keeps its database.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Data directory for the local storage driver.
    #[arg(long, short = 'd', env = "POLARIS_DATA_DIR", default_value = "~/.polaris")]
    pub data_dir: PathBuf,
}

/// Arguments for `put-immutable`.
#[derive(Args, Debug)]
pub struct PutImmutableArgs {
    /// Path to the JSON payload to store ("-" for stdin).
    pub file: PathBuf,

    /// Transaction ID anchoring the data hash on-chain.
    #[arg(long)]
    pub txid: String,

    /// Driver names that must accept the write; any failure among them
    /// fails the whole operation.
    #[arg(long)]
    pub required: Vec<String>,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `get-immutable`.
#[derive(Args, Debug)]
pub struct GetImmutableArgs {
    /// Content hash of the data.
    pub hash: String,

    /// URL to try before any driver.
    #[arg(long)]
    pub url_hint: Option<String>,

    /// Key the lookup by the chain-compatible hash (zonefiles) instead of
    /// the content hash.
    #[arg(long)]
    pub chain_hash: bool,

    /// Print the verified bytes without parsing them as JSON.
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `delete-immutable`.
#[derive(Args, Debug)]
pub struct DeleteImmutableArgs {
    /// Content hash of the data to delete.
    pub hash: String,

    /// Transaction ID that removed the hash on-chain.
    #[arg(long)]
    pub txid: String,

    /// Hex data private key authorizing the deletion.
    #[arg(long, env = "POLARIS_DATA_KEY", hide_env_values = true)]
    pub key: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `put-mutable`.
#[derive(Args, Debug)]
pub struct PutMutableArgs {
    /// Fully-qualified data ID (`name` or `name:data_id`).
    pub fq_data_id: String,

    /// Path to the JSON payload to store ("-" for stdin).
    pub file: PathBuf,

    /// Hex data private key that signs the envelope.
    #[arg(long, env = "POLARIS_DATA_KEY", hide_env_values = true)]
    pub key: String,

    /// Wrap the payload in the legacy profile token format instead of a
    /// v2 envelope.
    #[arg(long)]
    pub profile: bool,

    /// Driver names that must accept the write.
    #[arg(long)]
    pub required: Vec<String>,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `get-mutable`.
#[derive(Args, Debug)]
pub struct GetMutableArgs {
    /// Fully-qualified data ID (`name` or `name:data_id`).
    pub fq_data_id: String,

    /// Hex public key the envelope is expected to be signed with.
    #[arg(long)]
    pub public_key: Option<String>,

    /// Address the signer is expected to hash to.
    #[arg(long)]
    pub address: Option<String>,

    /// Fallback authorization address (record owner).
    #[arg(long)]
    pub owner_address: Option<String>,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `delete-mutable`.
#[derive(Args, Debug)]
pub struct DeleteMutableArgs {
    /// Fully-qualified data ID to delete.
    pub fq_data_id: String,

    /// Hex data private key authorizing the deletion.
    #[arg(long, env = "POLARIS_DATA_KEY", hide_env_values = true)]
    pub key: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `put-announcement`.
#[derive(Args, Debug)]
pub struct PutAnnouncementArgs {
    /// Path to the announcement text ("-" for stdin).
    pub file: PathBuf,

    /// Transaction ID anchoring the announcement hash on-chain.
    #[arg(long)]
    pub txid: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for `get-announcement`.
#[derive(Args, Debug)]
pub struct GetAnnouncementArgs {
    /// Chain-compatible hash of the announcement.
    pub hash: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        PolarisCli::command().debug_assert();
    }
}
