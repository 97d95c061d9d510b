// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # POLARIS Storage Client
//!
//! Entry point for the `polaris` binary. Parses CLI arguments, initializes
//! logging, wires up the driver registry (local disk plus read-only HTTP),
//! and dispatches one storage operation per invocation.
//!
//! Results go to stdout; logs go to stderr. A lookup that comes up empty
//! exits nonzero so scripts can branch on it.

mod cli;
mod logging;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};

use polaris_protocol::crypto::keys::{address_from_public_key, generate_private_key, public_key_hex};
use polaris_protocol::crypto::hash::ContentHash;
use polaris_protocol::drivers::{HttpDriver, LocalDriver};
use polaris_protocol::storage::{
    DriverRegistry, GetImmutableOptions, GetMutableOptions, ImmutableContent, PutMutableOptions,
    StorageRouter,
};

use cli::{Commands, PolarisCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PolarisCli::parse();
    logging::init_logging(
        "polaris=info,polaris_protocol=info",
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Keygen => keygen(),
        Commands::PutImmutable(args) => put_immutable(args).await,
        Commands::GetImmutable(args) => get_immutable(args).await,
        Commands::DeleteImmutable(args) => delete_immutable(args).await,
        Commands::PutMutable(args) => put_mutable(args).await,
        Commands::GetMutable(args) => get_mutable(args).await,
        Commands::DeleteMutable(args) => delete_mutable(args).await,
        Commands::PutAnnouncement(args) => put_announcement(args).await,
        Commands::GetAnnouncement(args) => get_announcement(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Builds the router over the standard driver set: persistent local
/// storage under `<data_dir>/store`, plus read-only HTTP.
fn open_router(data_dir: &Path) -> Result<StorageRouter> {
    let data_dir = expand_home(data_dir);
    let store_path = data_dir.join("store");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let local = LocalDriver::open(&store_path)
        .map_err(|e| anyhow::anyhow!("failed to open local store at {}: {e}", store_path.display()))?;

    tracing::debug!(path = %store_path.display(), "local store opened");

    let registry = Arc::new(DriverRegistry::new());
    registry.register(Arc::new(local));
    registry.register(Arc::new(HttpDriver::new()));

    Ok(StorageRouter::new(registry))
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Reads a file argument, with "-" meaning stdin.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

fn read_json_input(path: &Path) -> Result<Value> {
    let text = read_input(path)?;
    serde_json::from_str(&text).context("input is not valid JSON")
}

/// Generates a fresh data keypair and prints it as JSON.
fn keygen() -> Result<()> {
    let private_key = generate_private_key();
    let public_key = public_key_hex(&private_key)?;
    let address = address_from_public_key(&public_key)?;

    let out = json!({
        "private_key": private_key,
        "public_key": public_key,
        "address": address,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn put_immutable(args: cli::PutImmutableArgs) -> Result<()> {
    let payload = read_json_input(&args.file)?;
    let router = open_router(&args.store.data_dir)?;

    let hash = router
        .put_immutable(ImmutableContent::Payload(&payload), &args.txid, &args.required)
        .await?;

    println!("{hash}");
    Ok(())
}

async fn get_immutable(args: cli::GetImmutableArgs) -> Result<()> {
    let router = open_router(&args.store.data_dir)?;
    let opts = GetImmutableOptions {
        url_hint: args.url_hint,
        hash_func: if args.chain_hash {
            ContentHash::Chain
        } else {
            ContentHash::Data
        },
        ..Default::default()
    };

    if args.raw {
        match router.get_immutable_raw(&args.hash, &opts).await {
            Some(bytes) => {
                use std::io::Write;
                std::io::stdout().write_all(&bytes)?;
                Ok(())
            }
            None => bail!("no driver returned verifiable data for {}", args.hash),
        }
    } else {
        match router.get_immutable(&args.hash, &opts).await {
            Some(payload) => {
                println!("{}", serde_json::to_string_pretty(&payload)?);
                Ok(())
            }
            None => bail!("no driver returned verifiable data for {}", args.hash),
        }
    }
}

async fn delete_immutable(args: cli::DeleteImmutableArgs) -> Result<()> {
    let router = open_router(&args.store.data_dir)?;
    router
        .delete_immutable(&args.hash, &args.txid, &args.key)
        .await?;
    println!("deleted {}", args.hash);
    Ok(())
}

async fn put_mutable(args: cli::PutMutableArgs) -> Result<()> {
    let payload = read_json_input(&args.file)?;
    let router = open_router(&args.store.data_dir)?;

    let opts = PutMutableOptions {
        as_profile: args.profile,
        required: args.required,
        ..Default::default()
    };
    router
        .put_mutable(&args.fq_data_id, &payload, &args.key, &opts)
        .await?;

    println!("stored {}", args.fq_data_id);
    Ok(())
}

async fn get_mutable(args: cli::GetMutableArgs) -> Result<()> {
    if args.public_key.is_none() && args.address.is_none() {
        bail!("need --public-key or --address to verify the record against");
    }

    let router = open_router(&args.store.data_dir)?;
    let opts = GetMutableOptions {
        public_key: args.public_key,
        data_address: args.address,
        owner_address: args.owner_address,
        ..Default::default()
    };

    match router.get_mutable(&args.fq_data_id, &opts).await {
        Some(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        None => bail!("no verifiable record found for {}", args.fq_data_id),
    }
}

async fn delete_mutable(args: cli::DeleteMutableArgs) -> Result<()> {
    let router = open_router(&args.store.data_dir)?;
    router.delete_mutable(&args.fq_data_id, &args.key, None).await?;
    println!("deleted {}", args.fq_data_id);
    Ok(())
}

async fn put_announcement(args: cli::PutAnnouncementArgs) -> Result<()> {
    let text = read_input(&args.file)?;
    let router = open_router(&args.store.data_dir)?;

    let hash = router.put_announcement(&text, &args.txid).await?;
    println!("{hash}");
    Ok(())
}

async fn get_announcement(args: cli::GetAnnouncementArgs) -> Result<()> {
    let router = open_router(&args.store.data_dir)?;
    match router.get_announcement(&args.hash).await {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => bail!("no announcement found for {}", args.hash),
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("polaris {}", env!("CARGO_PKG_VERSION"));
    println!("rustc   {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_substitutes_home_dir() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_home(Path::new("~/.polaris")),
            PathBuf::from("/home/tester/.polaris")
        );
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }

    #[tokio::test]
    async fn open_router_registers_local_and_http() {
        let dir = tempfile::tempdir().unwrap();
        let router = open_router(dir.path()).unwrap();
        assert!(router.registry().find("local").is_some());
        assert!(router.registry().find("http").is_some());
        assert_eq!(router.registry().len(), 2);
    }
}
