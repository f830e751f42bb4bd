//! Blocking protocol client.
//!
//! Speaks the wire protocol over one TCP connection; used by the CLI
//! binary and the integration tests. Each method sends one request and
//! reads its response.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::{BufMut, BytesMut};

use crate::math::ArithOp;

use super::codec::request_header;
use super::opcode::{
    VarFunction, CLEAR_MAGIC, FLAG_A_IS_NAME, FLAG_B_IS_NAME, FLAG_RECURSIVE, FLAG_STORE_RESULT,
    OP_FILE_CREATE, OP_FILE_READ, OP_FILE_SIZE, OP_FILE_WRITE, OP_STORE_CLEAR, OP_STORE_DUMP,
    OP_STORE_LOAD,
};

/// Protocol-level reply: `Ok` on success, `Err(status)` with the wire
/// status byte on a server-reported failure.
pub type Reply<T> = std::result::Result<T, u8>;

/// One request operand as the client encodes it.
#[derive(Debug, Clone)]
pub enum Arg {
    Literal(i64),
    Name(String),
}

/// A connected protocol client.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    next_correlation: u32,
}

impl Client {
    /// Connect to a server.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Ok(Self {
            reader,
            writer,
            next_correlation: 1,
        })
    }

    fn correlation(&mut self) -> u32 {
        let id = self.next_correlation;
        self.next_correlation = self.next_correlation.wrapping_add(1);
        id
    }

    fn send(&mut self, opcode: u16, body: &[u8]) -> std::io::Result<u32> {
        let correlation = self.correlation();
        self.writer.write_all(&request_header(opcode, correlation))?;
        self.writer.write_all(body)?;
        self.writer.flush()?;
        Ok(correlation)
    }

    /// Read the 5-byte response header, checking the correlation id.
    fn read_status(&mut self, expected: u32) -> std::io::Result<u8> {
        let mut header = [0u8; 5];
        self.reader.read_exact(&mut header)?;

        let correlation = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if correlation != expected {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "correlation mismatch: sent {}, got {}",
                    expected, correlation
                ),
            ));
        }

        Ok(header[4])
    }

    fn read_i64_payload(&mut self) -> std::io::Result<i64> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    // =========================================================================
    // Variable Family
    // =========================================================================

    /// Arithmetic request; `store` adds a result-target name.
    pub fn arith(
        &mut self,
        op: ArithOp,
        a: Arg,
        b: Arg,
        store: Option<&str>,
        recursive: bool,
    ) -> std::io::Result<Reply<i64>> {
        let function = match op {
            ArithOp::Add => VarFunction::Add,
            ArithOp::Sub => VarFunction::Sub,
            ArithOp::Mul => VarFunction::Mul,
            ArithOp::Div => VarFunction::Div,
            ArithOp::Rem => VarFunction::Rem,
        };

        let mut low = function.nibble();
        let mut body = BytesMut::new();

        match &a {
            Arg::Literal(_) => {}
            Arg::Name(_) => low |= FLAG_A_IS_NAME,
        }
        match &b {
            Arg::Literal(_) => {}
            Arg::Name(_) => low |= FLAG_B_IS_NAME,
        }
        if store.is_some() {
            low |= FLAG_STORE_RESULT;
        }
        if recursive {
            low |= FLAG_RECURSIVE;
        }

        put_arg(&mut body, &a);
        put_arg(&mut body, &b);
        if let Some(name) = store {
            put_name(&mut body, name);
        }

        let correlation = self.send(0x0100 | low as u16, &body)?;
        let status = self.read_status(correlation)?;
        if status != 0 {
            return Ok(Err(status));
        }
        Ok(Ok(self.read_i64_payload()?))
    }

    /// Fetch a variable's numeric value (add of name and literal zero).
    pub fn get_value(&mut self, name: &str, recursive: bool) -> std::io::Result<Reply<i64>> {
        self.arith(
            ArithOp::Add,
            Arg::Name(name.to_string()),
            Arg::Literal(0),
            None,
            recursive,
        )
    }

    /// Store a numeric value under a name (add of literal and zero,
    /// stored to the name).
    pub fn set_value(&mut self, name: &str, value: i64) -> std::io::Result<Reply<i64>> {
        self.arith(
            ArithOp::Add,
            Arg::Literal(value),
            Arg::Literal(0),
            Some(name),
            false,
        )
    }

    /// Target name of an alias entry.
    pub fn get_alias(&mut self, name: &str) -> std::io::Result<Reply<String>> {
        let mut body = BytesMut::new();
        put_name(&mut body, name);

        let correlation = self.send(0x0108, &body)?;
        let status = self.read_status(correlation)?;
        if status != 0 {
            return Ok(Err(status));
        }

        let mut len = [0u8; 1];
        self.reader.read_exact(&mut len)?;
        let mut raw = vec![0u8; len[0] as usize];
        self.reader.read_exact(&mut raw)?;

        String::from_utf8(raw)
            .map(Ok)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF8 name"))
    }

    /// Point `key` at `target`.
    pub fn set_alias(&mut self, key: &str, target: &str) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        put_name(&mut body, key);
        put_name(&mut body, target);

        let correlation = self.send(0x0109, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }

    /// Delete an entry.
    pub fn delete(&mut self, name: &str) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        put_name(&mut body, name);

        let correlation = self.send(0x010F, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }

    // =========================================================================
    // File Family
    // =========================================================================

    /// Read `size` bytes of a file at `offset`.
    pub fn file_read(
        &mut self,
        filename: &str,
        offset: u64,
        size: u16,
    ) -> std::io::Result<Reply<Vec<u8>>> {
        let mut body = BytesMut::new();
        put_filename(&mut body, filename);
        body.put_u64(offset);
        body.put_u16(size);

        let correlation = self.send(OP_FILE_READ, &body)?;
        let status = self.read_status(correlation)?;
        if status != 0 {
            return Ok(Err(status));
        }

        let mut count = [0u8; 2];
        self.reader.read_exact(&mut count)?;
        let count = u16::from_be_bytes(count) as usize;

        let mut data = vec![0u8; count];
        self.reader.read_exact(&mut data)?;
        Ok(Ok(data))
    }

    /// Write bytes to a file at `offset`.
    pub fn file_write(
        &mut self,
        filename: &str,
        offset: u64,
        data: &[u8],
    ) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        put_filename(&mut body, filename);
        body.put_u64(offset);
        body.put_u16(data.len() as u16);
        body.put_slice(data);

        let correlation = self.send(OP_FILE_WRITE, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }

    /// Create a new empty file.
    pub fn file_create(&mut self, filename: &str) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        put_filename(&mut body, filename);

        let correlation = self.send(OP_FILE_CREATE, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }

    /// Size of a file in bytes.
    pub fn file_size(&mut self, filename: &str) -> std::io::Result<Reply<u64>> {
        let mut body = BytesMut::new();
        put_filename(&mut body, filename);

        let correlation = self.send(OP_FILE_SIZE, &body)?;
        let status = self.read_status(correlation)?;
        if status != 0 {
            return Ok(Err(status));
        }

        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf)?;
        Ok(Ok(u64::from_be_bytes(buf)))
    }

    // =========================================================================
    // Store Family
    // =========================================================================

    /// Dump the store to a new file.
    pub fn dump(&mut self, filename: &str) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        put_filename(&mut body, filename);

        let correlation = self.send(OP_STORE_DUMP, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }

    /// Load a dump file into the store.
    pub fn load(&mut self, filename: &str) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        put_filename(&mut body, filename);

        let correlation = self.send(OP_STORE_LOAD, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }

    /// Clear the store, passing the guard magic.
    pub fn clear(&mut self, magic: Option<u32>) -> std::io::Result<Reply<()>> {
        let mut body = BytesMut::new();
        body.put_u32(magic.unwrap_or(CLEAR_MAGIC));

        let correlation = self.send(OP_STORE_CLEAR, &body)?;
        let status = self.read_status(correlation)?;
        Ok(if status == 0 { Ok(()) } else { Err(status) })
    }
}

fn put_arg(body: &mut BytesMut, arg: &Arg) {
    match arg {
        Arg::Literal(v) => body.put_i64(*v),
        Arg::Name(name) => put_name(body, name),
    }
}

fn put_name(body: &mut BytesMut, name: &str) {
    body.put_u8(name.len() as u8);
    body.put_slice(name.as_bytes());
}

fn put_filename(body: &mut BytesMut, filename: &str) {
    body.put_u16(filename.len() as u16);
    body.put_slice(filename.as_bytes());
}
