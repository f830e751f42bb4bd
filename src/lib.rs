//! # NumVault
//!
//! A binary-protocol RPC server exposing three services over a single
//! TCP port:
//! - a persistent named-variable store with integer and alias values
//! - overflow-checked 64-bit arithmetic on those variables
//! - remote positional file read/write
//!
//! Durability comes from an append-only persistence log replayed at
//! startup; concurrency from a fixed pool of worker threads fed by an
//! idle-worker queue behind a counting admission gate.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Connection Acceptor                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ admission gate + idle queue
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Dispatch Core                           │
//! │            (condvar handoff to fixed workers)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Worker → Protocol Decoder                    │
//! └──────┬──────────────────┬───────────────────────┬───────────┘
//!        │                  │                       │
//!        ▼                  ▼                       ▼
//! ┌─────────────┐   ┌───────────────┐       ┌─────────────┐
//! │ Arithmetic  │   │ Variable Store│       │File Service │
//! │   Engine    │   │ + Alias Chain │       │ (positional)│
//! └─────────────┘   └───────┬───────┘       └─────────────┘
//!                           │
//!                           ▼
//!                   ┌───────────────┐
//!                   │Persistence Log│
//!                   │   (append)    │
//!                   └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod files;
pub mod math;
pub mod network;
pub mod protocol;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{RequestError, Result, Status, VaultError};
pub use network::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of NumVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
