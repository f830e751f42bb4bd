//! Request decoder and dispatcher.
//!
//! Takes the already-read 6-byte header, consumes the rest of the
//! request from the connection, executes it, and writes the response.
//! Request-level failures become status responses; only socket errors
//! propagate (and end the connection).

use std::io::{Read, Write};
use std::path::Path;

use crate::engine::{Engine, Operand};
use crate::error::{RequestError, Status};
use crate::files;
use crate::math;

use super::codec::{
    read_filename, read_i64, read_name, read_u16, read_u32, read_u64, write_alias_name,
    write_filesize, write_read_header, write_result, write_status,
};
use super::opcode::{
    VarFunction, VarOpcode, CLEAR_MAGIC, FAMILY_VAR, OP_FILE_CREATE, OP_FILE_READ, OP_FILE_SIZE,
    OP_FILE_WRITE, OP_STORE_CLEAR, OP_STORE_DUMP, OP_STORE_LOAD,
};
use super::BUFFER_SIZE;

/// Decode, execute, and answer a single request.
pub fn handle_request<R: Read, W: Write>(
    opcode: u16,
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    engine: &Engine,
    buf: &mut [u8; BUFFER_SIZE],
) -> std::io::Result<()> {
    if (opcode >> 8) as u8 == FAMILY_VAR {
        return handle_var_request(opcode, correlation, reader, writer, engine);
    }

    match opcode {
        OP_FILE_READ => handle_file_read(correlation, reader, writer, buf),
        OP_FILE_WRITE => handle_file_write(correlation, reader, writer, buf),
        OP_FILE_CREATE => handle_file_create(correlation, reader, writer),
        OP_FILE_SIZE => handle_file_size(correlation, reader, writer),
        OP_STORE_DUMP => handle_store_dump(correlation, reader, writer, engine),
        OP_STORE_LOAD => handle_store_load(correlation, reader, writer, engine),
        OP_STORE_CLEAR => handle_store_clear(correlation, reader, writer, engine),
        _ => {
            tracing::warn!("unknown opcode {:#06x}", opcode);
            write_status(writer, correlation, Status::InvalidArgument as u8)
        }
    }
}

// =============================================================================
// Variable Family
// =============================================================================

fn handle_var_request<R: Read, W: Write>(
    opcode: u16,
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    engine: &Engine,
) -> std::io::Result<()> {
    let Some(op) = VarOpcode::decode(opcode) else {
        tracing::warn!("unknown variable function in opcode {:#06x}", opcode);
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    };

    // Decode operands per the flag layout. A malformed name poisons the
    // request but decoding continues, so the stream stays framed for
    // the next request.
    let mut malformed = false;

    let a = if op.a_is_name {
        match read_name(reader)? {
            Some(name) => Operand::Name(name),
            None => {
                malformed = true;
                Operand::Literal(0)
            }
        }
    } else {
        Operand::Literal(read_i64(reader)?)
    };

    let b = if op.b_is_name {
        match read_name(reader)? {
            Some(name) => Operand::Name(name),
            None => {
                malformed = true;
                Operand::Literal(0)
            }
        }
    } else if op.wants_literal_b {
        Operand::Literal(read_i64(reader)?)
    } else {
        Operand::Literal(0)
    };

    let target = if op.store_result {
        match read_name(reader)? {
            Some(name) => Some(name),
            None => {
                malformed = true;
                None
            }
        }
    } else {
        None
    };

    if malformed {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    }

    match op.function {
        VarFunction::GetAlias => {
            let Operand::Name(ref name) = a else {
                return write_status(writer, correlation, Status::InvalidArgument as u8);
            };
            match engine.get_alias(name) {
                Ok(alias_target) => write_alias_name(writer, correlation, &alias_target),
                Err(e) => write_status(writer, correlation, e.status()),
            }
        }
        VarFunction::SetAlias => {
            let (Operand::Name(key), Operand::Name(alias_target)) = (&a, &b) else {
                return write_status(writer, correlation, Status::InvalidArgument as u8);
            };
            match engine.set_alias(key, alias_target) {
                Ok(()) => write_status(writer, correlation, Status::Ok as u8),
                Err(e) => write_status(writer, correlation, e.status()),
            }
        }
        VarFunction::Delete => {
            let Operand::Name(ref name) = a else {
                return write_status(writer, correlation, Status::InvalidArgument as u8);
            };
            match engine.delete(name) {
                Ok(()) => write_status(writer, correlation, Status::Ok as u8),
                Err(e) => write_status(writer, correlation, e.status()),
            }
        }
        compute => {
            let Some(arith) = compute.arith_op() else {
                return write_status(writer, correlation, Status::InvalidArgument as u8);
            };

            // Pure-literal arithmetic never touches the store lock.
            let result = match (&a, &b, &target) {
                (Operand::Literal(va), Operand::Literal(vb), None) => math::apply(arith, *va, *vb),
                _ => engine.arithmetic(arith, &a, &b, target.as_deref(), op.recursive),
            };

            match result {
                Ok(value) => write_result(writer, correlation, value),
                Err(e) => write_status(writer, correlation, e.status()),
            }
        }
    }
}

// =============================================================================
// File Family
// =============================================================================

fn handle_file_read<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8; BUFFER_SIZE],
) -> std::io::Result<()> {
    let filename = read_filename(reader)?;
    let mut offset = read_u64(reader)?;
    let size = read_u16(reader)?;

    let Some(filename) = filename else {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    };
    let path = Path::new(&filename);

    // Validate up front so failures stay a 5-byte status; once the
    // 7-byte read header is on the wire there is no error channel left.
    let file_size = match files::size(path) {
        Ok(s) => s,
        Err(e) => return write_status(writer, correlation, e.status()),
    };
    if size as u64 > file_size || offset > file_size {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    }

    write_read_header(writer, correlation, size)?;

    let mut remaining = size as usize;
    while remaining > 0 {
        let chunk = remaining.min(BUFFER_SIZE);
        let read = match files::read_at(path, offset, &mut buf[..chunk]) {
            Ok(n) => n,
            Err(e) => {
                // Header already sent; the client sees a short stream.
                tracing::warn!("read of {} failed mid-stream: {}", filename, e);
                return Ok(());
            }
        };

        writer.write_all(&buf[..read])?;

        if read < chunk {
            break;
        }
        offset += chunk as u64;
        remaining -= chunk;
    }

    Ok(())
}

fn handle_file_write<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8; BUFFER_SIZE],
) -> std::io::Result<()> {
    let filename = read_filename(reader)?;
    let mut offset = read_u64(reader)?;
    let size = read_u16(reader)?;

    let path = filename.as_deref().map(Path::new);
    let mut failure: Option<RequestError> = match path {
        Some(_) => None,
        None => Some(RequestError::InvalidArgument),
    };

    // The payload is always drained in buffer-sized chunks, even after
    // a write failure, so the next request header stays framed. A
    // zero-length payload still performs one (empty) write, surfacing a
    // missing file.
    let mut remaining = size as usize;
    loop {
        let chunk = remaining.min(BUFFER_SIZE);
        reader.read_exact(&mut buf[..chunk])?;

        if failure.is_none() {
            if let Some(path) = path {
                match files::write_at(path, offset, &buf[..chunk]) {
                    Ok(_) => offset += chunk as u64,
                    Err(e) => failure = Some(e),
                }
            }
        }

        remaining -= chunk;
        if remaining == 0 {
            break;
        }
    }

    let status = failure.map_or(Status::Ok as u8, |e| e.status());
    write_status(writer, correlation, status)
}

fn handle_file_create<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
) -> std::io::Result<()> {
    let Some(filename) = read_filename(reader)? else {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    };

    match files::create(Path::new(&filename)) {
        Ok(()) => write_status(writer, correlation, Status::Ok as u8),
        Err(e) => write_status(writer, correlation, e.status()),
    }
}

fn handle_file_size<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
) -> std::io::Result<()> {
    let Some(filename) = read_filename(reader)? else {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    };

    match files::size(Path::new(&filename)) {
        Ok(size) => write_filesize(writer, correlation, size),
        Err(e) => write_status(writer, correlation, e.status()),
    }
}

// =============================================================================
// Store Family
// =============================================================================

fn handle_store_dump<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    engine: &Engine,
) -> std::io::Result<()> {
    let Some(filename) = read_filename(reader)? else {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    };

    match engine.dump(Path::new(&filename)) {
        Ok(()) => write_status(writer, correlation, Status::Ok as u8),
        Err(e) => write_status(writer, correlation, e.status()),
    }
}

fn handle_store_load<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    engine: &Engine,
) -> std::io::Result<()> {
    let Some(filename) = read_filename(reader)? else {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    };

    match engine.load(Path::new(&filename)) {
        Ok(()) => write_status(writer, correlation, Status::Ok as u8),
        Err(e) => write_status(writer, correlation, e.status()),
    }
}

fn handle_store_clear<R: Read, W: Write>(
    correlation: u32,
    reader: &mut R,
    writer: &mut W,
    engine: &Engine,
) -> std::io::Result<()> {
    let magic = read_u32(reader)?;

    if magic != CLEAR_MAGIC {
        return write_status(writer, correlation, Status::InvalidArgument as u8);
    }

    match engine.clear() {
        Ok(()) => write_status(writer, correlation, Status::Ok as u8),
        Err(e) => write_status(writer, correlation, e.status()),
    }
}
