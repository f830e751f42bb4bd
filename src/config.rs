//! Configuration for NumVault
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, VaultError};

/// Ports at or below this value are reserved and rejected.
pub const MIN_PORT: u16 = 1025;

/// Main configuration for a NumVault server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for server data. Internal structure:
    ///   {data_dir}/
    ///     └── log.txt          (persistence log)
    pub data_dir: PathBuf,

    /// Number of hash buckets in the variable store
    pub buckets: usize,

    /// Sync strategy: how often to flush the persistence log
    pub log_sync_strategy: LogSyncStrategy,

    // -------------------------------------------------------------------------
    // Resolution Configuration
    // -------------------------------------------------------------------------
    /// Maximum alias-chain hops before resolution fails
    pub max_hops: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (host:port, port >= 1025)
    pub listen_addr: String,

    /// Size of the fixed worker-thread pool
    pub workers: usize,
}

/// Persistence log sync strategy
#[derive(Debug, Clone, Copy)]
pub enum LogSyncStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNRecords { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./numvault_data"),
            buckets: 32,
            log_sync_strategy: LogSyncStrategy::EveryWrite,
            max_hops: 50,
            listen_addr: "localhost:8912".to_string(),
            workers: 4,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Split and validate the listen address.
    ///
    /// The port must parse and sit above the reserved range.
    pub fn parse_listen_addr(&self) -> Result<(String, u16)> {
        parse_listen_addr(&self.listen_addr)
    }
}

/// Parse a `host:port` string, enforcing the minimum port.
pub fn parse_listen_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port_str) = addr
        .rsplit_once(':')
        .ok_or_else(|| VaultError::Config(format!("listen address '{}' is missing a port", addr)))?;

    if host.is_empty() {
        return Err(VaultError::Config(format!(
            "listen address '{}' is missing a host",
            addr
        )));
    }

    let port: u16 = port_str
        .parse()
        .map_err(|_| VaultError::Config(format!("invalid port number '{}'", port_str)))?;

    if port < MIN_PORT {
        return Err(VaultError::Config(format!(
            "port {} is below the minimum of {}",
            port, MIN_PORT
        )));
    }

    Ok((host.to_string(), port))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (holds the persistence log)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of hash buckets in the variable store
    pub fn buckets(mut self, count: usize) -> Self {
        self.config.buckets = count;
        self
    }

    /// Set the persistence log sync strategy
    pub fn log_sync_strategy(mut self, strategy: LogSyncStrategy) -> Self {
        self.config.log_sync_strategy = strategy;
        self
    }

    /// Set the maximum alias-resolution hop count
    pub fn max_hops(mut self, hops: u64) -> Self {
        self.config.max_hops = hops;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the worker-pool size
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
