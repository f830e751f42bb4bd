//! NumVault Server Binary
//!
//! Starts the TCP server for NumVault.

use std::sync::Arc;

use clap::Parser;
use numvault::{Config, Engine, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// NumVault Server
#[derive(Parser, Debug)]
#[command(name = "numvault-server")]
#[command(about = "Binary-protocol variable store and RPC server")]
#[command(version)]
struct Args {
    /// Data directory (holds the persistence log)
    #[arg(short, long, default_value = "./numvault_data")]
    data_dir: String,

    /// Listen address (host:port, port >= 1025)
    #[arg(short, long, default_value = "localhost:8912")]
    listen: String,

    /// Worker-pool size
    #[arg(short = 'n', long, default_value = "4")]
    workers: usize,

    /// Hash-table bucket count for the variable store
    #[arg(short, long, default_value = "32")]
    buckets: usize,

    /// Maximum alias-resolution hops
    #[arg(short = 'i', long, default_value = "50")]
    max_hops: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,numvault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("NumVault Server v{}", numvault::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .workers(args.workers)
        .buckets(args.buckets)
        .max_hops(args.max_hops)
        .build();

    // Reject a bad listen address before opening anything
    if let Err(e) = config.parse_listen_addr() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    // Open engine (replays the persistence log)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    // Start server
    let server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
