//! Network Module
//!
//! TCP acceptor, dispatch core, and the fixed worker pool.
//!
//! ## Architecture
//! - Acceptor thread in a blocking accept loop
//! - Counting admission gate bounding concurrently-busy workers
//! - Idle-worker queue + condition-variable handoff per connection
//! - Workers created once at startup and never torn down

mod dispatch;
mod server;
mod worker;

pub use dispatch::{AdmissionGate, Dispatcher, IdleQueue};
pub use server::Server;
pub use worker::Worker;
