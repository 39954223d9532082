//! Standalone service catalog server.
//!
//! # Rust Learning Note
//!
//! A crate can ship both a library (`src/lib.rs`) and executables
//! (`src/bin/*.rs`). This binary is a thin shell: it parses flags, loads the
//! YAML config, and hands everything else to the library.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use catalog_registry::config::StorageBackend;
use catalog_registry::{Catalog, RegistryConfig, RegistryServer};

/// Service catalog registry server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long, value_name = "IP")]
    listen: Option<IpAddr>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Storage backend (overrides config)
    #[arg(short = 't', long = "db-type", value_enum)]
    db_type: Option<DbType>,

    /// Directory of the file backend (overrides config)
    #[arg(long, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Requests per minute per client address, 0 to disable (overrides config)
    #[arg(long, value_name = "N")]
    rate_limit: Option<u32>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DbType {
    File,
    Memory,
}

impl From<DbType> for StorageBackend {
    fn from(db_type: DbType) -> Self {
        match db_type {
            DbType::File => StorageBackend::File,
            DbType::Memory => StorageBackend::Memory,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RegistryConfig::load_from_file(path)?,
        None => RegistryConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    initialize_logging(&config.log_level)?;

    info!("Starting service catalog registry");
    if let Some(path) = &args.config {
        info!("Config file: {}", path.display());
    }

    let catalog = Arc::new(Catalog::new(config.build_store()?));
    let server =
        RegistryServer::new(catalog, config.transport()).with_rate_limit(config.rate_limit());

    info!("Press Ctrl+C to stop");
    server.run().await
}

fn apply_overrides(config: &mut RegistryConfig, args: &Args) {
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db_type) = args.db_type {
        config.storage.backend = db_type.into();
    }
    if let Some(path) = &args.path {
        config.storage.path = path.clone();
    }
    if let Some(per_minute) = args.rate_limit {
        config.server.rate_limit_per_minute = per_minute;
    }

    match (args.debug, args.verbose) {
        (_, v) if v >= 2 => config.log_level = "trace".to_string(),
        (true, _) | (_, 1) => config.log_level = "debug".to_string(),
        _ => {}
    }
}

fn initialize_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
