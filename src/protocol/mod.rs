//! Protocol Module
//!
//! Defines the binary wire protocol for client-server communication.
//! All integers are big-endian.
//!
//! ## Request Format
//!
//! Every request starts with a fixed 6-byte header:
//! ```text
//! ┌─────────────┬─────────────────────┐
//! │ opcode (2)  │ correlation id (4)  │
//! └─────────────┴─────────────────────┘
//! ```
//!
//! The opcode's high byte selects a family:
//! - `0x01` — variable/arithmetic family
//! - `0x02` — file operations
//! - `0x03` — store operations
//!
//! ### Variable family (`0x01`)
//!
//! The low nibble of the low byte selects the function:
//! `1`=add `2`=sub `3`=mul `4`=div `5`=mod `8`=get-alias `9`=set-alias
//! `F`=delete. The remaining low-byte bits are flags:
//!
//! | mask   | effect                                                    |
//! |--------|-----------------------------------------------------------|
//! | `0x10` | operand A is a variable name (always true for get-alias,  |
//! |        | set-alias, and delete, whose nibbles carry bit `0x08`)    |
//! | `0x20` | operand B is a variable name (implied by set-alias;       |
//! |        | get-alias and delete take no operand B at all)            |
//! | `0x40` | a result-target name follows the operands                 |
//! | `0x80` | alias chains may be resolved recursively                  |
//!
//! A literal operand is 8 bytes; a named operand is `len:u8` (1–31)
//! followed by that many name bytes (first byte alphabetic, the rest
//! alphanumeric or underscore).
//!
//! ### File family (`0x02`)
//!
//! `0x0201` read, `0x0202` write, `0x0210` create, `0x0220` filesize.
//! All take `filename_len:u16 + filename`; read and write additionally
//! take `offset:u64 + size:u16`, and write is followed by `size` raw
//! payload bytes.
//!
//! ### Store family (`0x03`)
//!
//! `0x0301` dump and `0x0302` load take `filename_len:u16 + filename`;
//! `0x0310` clear takes `magic:u32` which must equal `0x0BADBAD0`.
//!
//! ## Response Format
//!
//! Every response starts with `correlation_id:u32 + status:u8` (5
//! bytes, status 0 = success). On success:
//! - arithmetic appends `result:i64` (13 bytes total)
//! - get-alias appends `name_len:u8` (6 bytes) then the raw name bytes
//! - filesize appends `size:u64` (13 bytes total)
//! - read appends `count:u16` (7 bytes) then the data, chunked to the
//!   4096-byte worker buffer (only the first chunk carries the header)
//!
//! Failures are always the bare 5-byte header; the status byte values
//! are documented on [`crate::error::Status`].

mod client;
mod codec;
mod handler;
mod opcode;

pub use client::{Arg, Client, Reply};
pub use codec::{
    read_filename, read_i64, read_name, read_u16, read_u32, read_u64, read_u8, request_header,
    write_alias_name, write_filesize, write_read_header, write_result, write_status,
};
pub use handler::handle_request;
pub use opcode::{
    VarFunction, VarOpcode, CLEAR_MAGIC, FAMILY_FILE, FAMILY_STORE, FAMILY_VAR, FLAG_A_IS_NAME,
    FLAG_B_IS_NAME, FLAG_RECURSIVE, FLAG_STORE_RESULT, OP_FILE_CREATE, OP_FILE_READ,
    OP_FILE_SIZE, OP_FILE_WRITE, OP_STORE_CLEAR, OP_STORE_DUMP, OP_STORE_LOAD,
};

/// Fixed capacity of each worker's I/O buffer; bounds every file-op
/// chunk on the wire.
pub const BUFFER_SIZE: usize = 4096;
