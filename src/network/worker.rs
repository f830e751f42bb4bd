//! Worker
//!
//! One long-lived thread owning one connection at a time. Cycles
//! Idle → Assigned → Idle for the process lifetime: waits on its wakeup
//! condition, serves the assigned connection's request loop until
//! disconnect, then re-enters the idle queue and releases its
//! admission permit.

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use crate::engine::Engine;
use crate::protocol::{handle_request, BUFFER_SIZE};

use super::dispatch::Dispatcher;

/// A pool worker. Owns its fixed I/O buffer; the buffer is never
/// shared.
pub struct Worker {
    id: usize,
    dispatcher: Arc<Dispatcher>,
    engine: Arc<Engine>,
    buf: Box<[u8; BUFFER_SIZE]>,
}

impl Worker {
    pub fn new(id: usize, dispatcher: Arc<Dispatcher>, engine: Arc<Engine>) -> Self {
        Self {
            id,
            dispatcher,
            engine,
            buf: Box::new([0u8; BUFFER_SIZE]),
        }
    }

    /// The worker loop; runs for the process lifetime.
    pub fn run(mut self) {
        loop {
            let conn = self.dispatcher.wait_for_connection(self.id);

            let peer = conn
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            tracing::debug!("worker {}: connection assigned from {}", self.id, peer);

            match self.serve(conn) {
                Ok(()) => tracing::debug!("worker {}: client {} disconnected", self.id, peer),
                Err(e) => {
                    tracing::debug!("worker {}: connection to {} closed: {}", self.id, peer, e)
                }
            }

            self.dispatcher.release(self.id);
        }
    }

    /// Request loop for one connection: read the 6-byte header, hand
    /// off to the protocol handler, repeat until disconnect.
    fn serve(&mut self, stream: TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(true)?;

        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let mut header = [0u8; 6];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                // A short read of the header is a disconnect, not an error.
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::UnexpectedEof
                            | ErrorKind::ConnectionReset
                            | ErrorKind::ConnectionAborted
                    ) =>
                {
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            let opcode = u16::from_be_bytes([header[0], header[1]]);
            let correlation = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
            tracing::trace!(
                "worker {}: request opcode {:#06x} correlation {}",
                self.id,
                opcode,
                correlation
            );

            handle_request(
                opcode,
                correlation,
                &mut reader,
                &mut writer,
                &self.engine,
                &mut self.buf,
            )?;
            writer.flush()?;
        }
    }
}
