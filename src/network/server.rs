//! TCP Server
//!
//! Binds the listen address, spawns the fixed worker pool, and feeds
//! accepted connections to the dispatch core.

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

use super::dispatch::Dispatcher;
use super::worker::Worker;

/// The NumVault TCP server.
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
}

impl Server {
    /// Create a new server with the given config and engine.
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self { config, engine }
    }

    /// Validate the listen address, bind, and serve forever.
    pub fn run(&self) -> Result<()> {
        let (host, port) = self.config.parse_listen_addr()?;
        let listener = TcpListener::bind((host.as_str(), port))?;
        self.serve(listener)
    }

    /// Serve connections on an already-bound listener (blocking; never
    /// returns in normal operation).
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                "listening on {} ({} workers, {} buckets)",
                addr,
                self.config.workers,
                self.config.buckets
            );
        }

        let dispatcher = Arc::new(Dispatcher::new(self.config.workers));

        for id in 0..self.config.workers {
            let worker = Worker::new(id, Arc::clone(&dispatcher), Arc::clone(&self.engine));
            thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker.run())?;
        }

        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!("accepted connection from {}", peer);
                    dispatcher.submit(stream);
                }
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                }
            }
        }
    }
}
