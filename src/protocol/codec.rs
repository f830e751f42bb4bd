//! Protocol codec
//!
//! Fixed-width big-endian primitives over `Read`/`Write` streams, plus
//! the response-frame writers. Failures here are socket-level and end
//! the connection; validation failures (bad names, bad lengths) are
//! reported in-band so the stream stays framed.

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};

use crate::store::{is_valid_name, MAX_NAME_LEN};

// =============================================================================
// Read Primitives
// =============================================================================

pub fn read_u8<R: Read>(reader: &mut R) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read>(reader: &mut R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_u64<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub fn read_i64<R: Read>(reader: &mut R) -> std::io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

/// Read a `len:u8`-prefixed variable name.
///
/// The advertised bytes are always consumed so the stream stays framed;
/// `None` means the name failed validation (length out of 1–31, or bad
/// characters) and the request must fail with InvalidArgument.
pub fn read_name<R: Read>(reader: &mut R) -> std::io::Result<Option<String>> {
    let len = read_u8(reader)? as usize;

    let mut raw = vec![0u8; len];
    reader.read_exact(&mut raw)?;

    if len == 0 || len > MAX_NAME_LEN {
        return Ok(None);
    }

    match String::from_utf8(raw) {
        Ok(name) if is_valid_name(&name) => Ok(Some(name)),
        _ => Ok(None),
    }
}

/// Read a `len:u16`-prefixed filename.
///
/// `None` means the bytes were consumed but do not form a usable path
/// (empty or not UTF-8).
pub fn read_filename<R: Read>(reader: &mut R) -> std::io::Result<Option<String>> {
    let len = read_u16(reader)? as usize;

    let mut raw = vec![0u8; len];
    reader.read_exact(&mut raw)?;

    if len == 0 {
        return Ok(None);
    }

    Ok(String::from_utf8(raw).ok())
}

// =============================================================================
// Response Writers
// =============================================================================

/// The 6-byte request header (client side).
pub fn request_header(opcode: u16, correlation: u32) -> [u8; 6] {
    let mut header = [0u8; 6];
    header[0..2].copy_from_slice(&opcode.to_be_bytes());
    header[2..6].copy_from_slice(&correlation.to_be_bytes());
    header
}

/// Status-only response: correlation id + status byte (5 bytes).
pub fn write_status<W: Write>(writer: &mut W, correlation: u32, status: u8) -> std::io::Result<()> {
    let mut frame = BytesMut::with_capacity(5);
    frame.put_u32(correlation);
    frame.put_u8(status);
    writer.write_all(&frame)
}

/// Arithmetic success response: header + signed result (13 bytes).
pub fn write_result<W: Write>(writer: &mut W, correlation: u32, result: i64) -> std::io::Result<()> {
    let mut frame = BytesMut::with_capacity(13);
    frame.put_u32(correlation);
    frame.put_u8(0);
    frame.put_i64(result);
    writer.write_all(&frame)
}

/// get-alias success response: header + name length (6 bytes), then the
/// raw name bytes.
pub fn write_alias_name<W: Write>(
    writer: &mut W,
    correlation: u32,
    name: &str,
) -> std::io::Result<()> {
    let mut frame = BytesMut::with_capacity(6 + name.len());
    frame.put_u32(correlation);
    frame.put_u8(0);
    frame.put_u8(name.len() as u8);
    frame.put_slice(name.as_bytes());
    writer.write_all(&frame)
}

/// filesize success response: header + size (13 bytes).
pub fn write_filesize<W: Write>(
    writer: &mut W,
    correlation: u32,
    size: u64,
) -> std::io::Result<()> {
    let mut frame = BytesMut::with_capacity(13);
    frame.put_u32(correlation);
    frame.put_u8(0);
    frame.put_u64(size);
    writer.write_all(&frame)
}

/// read success header: header + byte count (7 bytes). Data frames
/// follow separately.
pub fn write_read_header<W: Write>(
    writer: &mut W,
    correlation: u32,
    count: u16,
) -> std::io::Result<()> {
    let mut frame = BytesMut::with_capacity(7);
    frame.put_u32(correlation);
    frame.put_u8(0);
    frame.put_u16(count);
    writer.write_all(&frame)
}
