//! Tests for the Protocol Decoder and Dispatcher
//!
//! These tests verify:
//! - Opcode family/function/flag decoding
//! - Name and filename framing (bytes always drained)
//! - Request handling over in-memory streams: responses, status codes,
//!   and stream framing after failures

use std::io::Cursor;

use numvault::engine::Engine;
use numvault::protocol::{
    handle_request, read_name, VarOpcode, BUFFER_SIZE, FLAG_A_IS_NAME, FLAG_B_IS_NAME,
    FLAG_RECURSIVE, FLAG_STORE_RESULT,
};
use numvault::Status;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    (temp_dir, engine)
}

/// Run one request body through the handler and return the response
/// bytes.
fn run_request(engine: &Engine, opcode: u16, correlation: u32, body: &[u8]) -> Vec<u8> {
    let mut reader = Cursor::new(body.to_vec());
    let mut response = Vec::new();
    let mut buf = Box::new([0u8; BUFFER_SIZE]);

    handle_request(
        opcode,
        correlation,
        &mut reader,
        &mut response,
        engine,
        &mut buf,
    )
    .unwrap();

    response
}

fn put_name(body: &mut Vec<u8>, name: &str) {
    body.push(name.len() as u8);
    body.extend_from_slice(name.as_bytes());
}

fn put_filename(body: &mut Vec<u8>, name: &str) {
    body.extend_from_slice(&(name.len() as u16).to_be_bytes());
    body.extend_from_slice(name.as_bytes());
}

fn response_status(response: &[u8]) -> u8 {
    assert!(response.len() >= 5);
    response[4]
}

fn response_correlation(response: &[u8]) -> u32 {
    u32::from_be_bytes([response[0], response[1], response[2], response[3]])
}

// =============================================================================
// Opcode Decoding
// =============================================================================

#[test]
fn test_decode_literal_add() {
    let op = VarOpcode::decode(0x0101).unwrap();
    assert!(!op.a_is_name);
    assert!(!op.b_is_name);
    assert!(op.wants_literal_b);
    assert!(!op.store_result);
    assert!(!op.recursive);
}

#[test]
fn test_decode_add_flags() {
    let op = VarOpcode::decode(
        0x0100
            | (0x01 | FLAG_A_IS_NAME | FLAG_B_IS_NAME | FLAG_STORE_RESULT | FLAG_RECURSIVE)
                as u16,
    )
    .unwrap();
    assert!(op.a_is_name);
    assert!(op.b_is_name);
    assert!(!op.wants_literal_b);
    assert!(op.store_result);
    assert!(op.recursive);
}

#[test]
fn test_decode_unary_functions_take_no_operand_b() {
    // get-alias and delete name operand A by function and skip B
    for low in [0x08u8, 0x0F] {
        let op = VarOpcode::decode(0x0100 | low as u16).unwrap();
        assert!(op.a_is_name);
        assert!(!op.b_is_name);
        assert!(!op.wants_literal_b);
    }
}

#[test]
fn test_decode_set_alias_names_both_operands() {
    let op = VarOpcode::decode(0x0109).unwrap();
    assert!(op.a_is_name);
    assert!(op.b_is_name);
    assert!(!op.wants_literal_b);
}

#[test]
fn test_decode_unknown_nibble() {
    assert!(VarOpcode::decode(0x0106).is_none());
    assert!(VarOpcode::decode(0x0100).is_none());
}

// =============================================================================
// Name Framing
// =============================================================================

#[test]
fn test_read_name_valid() {
    let mut data = Vec::new();
    put_name(&mut data, "counter");
    data.push(0xAA); // marker

    let mut reader = Cursor::new(data);
    assert_eq!(read_name(&mut reader).unwrap(), Some("counter".to_string()));
    assert_eq!(reader.position(), 8);
}

#[test]
fn test_read_name_invalid_chars_still_drained() {
    let mut data = Vec::new();
    put_name(&mut data, "9bad");
    data.push(0xAA);

    let mut reader = Cursor::new(data);
    assert_eq!(read_name(&mut reader).unwrap(), None);
    // Position sits on the marker: the bad name was fully consumed
    assert_eq!(reader.position(), 5);
}

#[test]
fn test_read_name_oversized_length_still_drained() {
    let mut data = vec![40u8]; // length above the 31-byte ceiling
    data.extend_from_slice(&[b'a'; 40]);
    data.push(0xAA);

    let mut reader = Cursor::new(data);
    assert_eq!(read_name(&mut reader).unwrap(), None);
    assert_eq!(reader.position(), 41);
}

// =============================================================================
// Variable-Family Requests
// =============================================================================

#[test]
fn test_literal_add_response() {
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    body.extend_from_slice(&40i64.to_be_bytes());
    body.extend_from_slice(&2i64.to_be_bytes());

    let response = run_request(&engine, 0x0101, 0xDEAD_BEEF, &body);

    assert_eq!(response.len(), 13);
    assert_eq!(response_correlation(&response), 0xDEAD_BEEF);
    assert_eq!(response_status(&response), 0);
    assert_eq!(
        i64::from_be_bytes(response[5..13].try_into().unwrap()),
        42
    );
}

#[test]
fn test_divide_by_zero_status() {
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    body.extend_from_slice(&1i64.to_be_bytes());
    body.extend_from_slice(&0i64.to_be_bytes());

    let response = run_request(&engine, 0x0104, 7, &body);

    assert_eq!(response.len(), 5);
    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
}

#[test]
fn test_add_overflow_status() {
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    body.extend_from_slice(&i64::MAX.to_be_bytes());
    body.extend_from_slice(&1i64.to_be_bytes());

    let response = run_request(&engine, 0x0101, 7, &body);

    assert_eq!(response.len(), 5);
    assert_eq!(response_status(&response), Status::Overflow as u8);
}

#[test]
fn test_store_result_persists() {
    let (_temp, engine) = setup_temp_engine();

    let low = (0x01 | FLAG_STORE_RESULT) as u16;
    let mut body = Vec::new();
    body.extend_from_slice(&20i64.to_be_bytes());
    body.extend_from_slice(&22i64.to_be_bytes());
    put_name(&mut body, "x");

    let response = run_request(&engine, 0x0100 | low, 1, &body);

    assert_eq!(response_status(&response), 0);
    assert_eq!(
        engine.get("x"),
        Some(numvault::store::Value::Number(42))
    );
}

#[test]
fn test_named_operand_reads_store() {
    let (_temp, engine) = setup_temp_engine();
    engine
        .arithmetic(
            numvault::math::ArithOp::Add,
            &numvault::engine::Operand::Literal(10),
            &numvault::engine::Operand::Literal(0),
            Some("a"),
            false,
        )
        .unwrap();

    let low = (0x01 | FLAG_A_IS_NAME) as u16;
    let mut body = Vec::new();
    put_name(&mut body, "a");
    body.extend_from_slice(&5i64.to_be_bytes());

    let response = run_request(&engine, 0x0100 | low, 1, &body);

    assert_eq!(response_status(&response), 0);
    assert_eq!(
        i64::from_be_bytes(response[5..13].try_into().unwrap()),
        15
    );
}

#[test]
fn test_malformed_name_is_invalid_argument() {
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    put_name(&mut body, "9bad");

    let response = run_request(&engine, 0x010F, 1, &body);

    assert_eq!(response.len(), 5);
    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
}

#[test]
fn test_malformed_name_leaves_stream_framed() {
    // A bad name poisons the request but every advertised byte is
    // consumed, so the next request header would be read correctly.
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    put_name(&mut body, "9bad");
    body.extend_from_slice(&11i64.to_be_bytes()); // literal operand B
    let body_len = body.len() as u64;
    body.push(0xAA); // next request's first byte

    let low = (0x01 | FLAG_A_IS_NAME) as u16;
    let mut reader = Cursor::new(body);
    let mut response = Vec::new();
    let mut buf = Box::new([0u8; BUFFER_SIZE]);
    handle_request(0x0100 | low, 1, &mut reader, &mut response, &engine, &mut buf).unwrap();

    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
    assert_eq!(reader.position(), body_len);
}

#[test]
fn test_get_alias_response_framing() {
    let (_temp, engine) = setup_temp_engine();
    engine.set_alias("x", "target_name").unwrap();

    let mut body = Vec::new();
    put_name(&mut body, "x");

    let response = run_request(&engine, 0x0108, 9, &body);

    assert_eq!(response_status(&response), 0);
    assert_eq!(response[5] as usize, "target_name".len());
    assert_eq!(&response[6..], b"target_name");
}

#[test]
fn test_get_alias_on_number_is_type_mismatch() {
    let (_temp, engine) = setup_temp_engine();
    let mut body = Vec::new();
    body.extend_from_slice(&1i64.to_be_bytes());
    body.extend_from_slice(&0i64.to_be_bytes());
    put_name(&mut body, "x");
    run_request(&engine, 0x0100 | (0x01 | FLAG_STORE_RESULT) as u16, 1, &body);

    let mut body = Vec::new();
    put_name(&mut body, "x");
    let response = run_request(&engine, 0x0108, 2, &body);

    assert_eq!(response_status(&response), Status::TypeMismatch as u8);
}

#[test]
fn test_set_alias_and_delete() {
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    put_name(&mut body, "x");
    put_name(&mut body, "y");
    let response = run_request(&engine, 0x0109, 1, &body);
    assert_eq!(response_status(&response), 0);
    assert_eq!(
        engine.get("x"),
        Some(numvault::store::Value::Alias("y".to_string()))
    );

    let mut body = Vec::new();
    put_name(&mut body, "x");
    let response = run_request(&engine, 0x010F, 2, &body);
    assert_eq!(response_status(&response), 0);
    assert_eq!(engine.get("x"), None);
}

#[test]
fn test_delete_missing_is_not_found() {
    let (_temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    put_name(&mut body, "ghost");
    let response = run_request(&engine, 0x010F, 2, &body);

    assert_eq!(response_status(&response), Status::NotFound as u8);
}

#[test]
fn test_unknown_opcode_is_invalid_argument() {
    let (_temp, engine) = setup_temp_engine();

    let response = run_request(&engine, 0x0999, 3, &[]);

    assert_eq!(response.len(), 5);
    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
}

#[test]
fn test_unknown_function_nibble_is_invalid_argument() {
    let (_temp, engine) = setup_temp_engine();

    let response = run_request(&engine, 0x0106, 3, &[]);

    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
}

// =============================================================================
// File-Family Requests
// =============================================================================

#[test]
fn test_file_create_write_read_size() {
    let (temp, engine) = setup_temp_engine();
    let file = temp.path().join("data.bin");
    let file = file.to_str().unwrap();

    // create
    let mut body = Vec::new();
    put_filename(&mut body, file);
    let response = run_request(&engine, 0x0210, 1, &body);
    assert_eq!(response_status(&response), 0);

    // create again -> already exists
    let mut body = Vec::new();
    put_filename(&mut body, file);
    let response = run_request(&engine, 0x0210, 2, &body);
    assert_eq!(response_status(&response), Status::AlreadyExists as u8);

    // write
    let payload = b"hello positional world";
    let mut body = Vec::new();
    put_filename(&mut body, file);
    body.extend_from_slice(&0u64.to_be_bytes());
    body.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    body.extend_from_slice(payload);
    let response = run_request(&engine, 0x0202, 3, &body);
    assert_eq!(response_status(&response), 0);

    // size
    let mut body = Vec::new();
    put_filename(&mut body, file);
    let response = run_request(&engine, 0x0220, 4, &body);
    assert_eq!(response.len(), 13);
    assert_eq!(response_status(&response), 0);
    assert_eq!(
        u64::from_be_bytes(response[5..13].try_into().unwrap()),
        payload.len() as u64
    );

    // read back a slice at an offset
    let mut body = Vec::new();
    put_filename(&mut body, file);
    body.extend_from_slice(&6u64.to_be_bytes());
    body.extend_from_slice(&10u16.to_be_bytes());
    let response = run_request(&engine, 0x0201, 5, &body);
    assert_eq!(response_status(&response), 0);
    assert_eq!(
        u16::from_be_bytes([response[5], response[6]]),
        10
    );
    assert_eq!(&response[7..], b"positional");
}

#[test]
fn test_file_read_larger_than_worker_buffer() {
    // Requests above the 4096-byte buffer stream in chunks; the
    // response still carries a single 7-byte header.
    let (temp, engine) = setup_temp_engine();
    let file = temp.path().join("big.bin");
    let contents: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&file, &contents).unwrap();

    let mut body = Vec::new();
    put_filename(&mut body, file.to_str().unwrap());
    body.extend_from_slice(&0u64.to_be_bytes());
    body.extend_from_slice(&(contents.len() as u16).to_be_bytes());

    let response = run_request(&engine, 0x0201, 6, &body);

    assert_eq!(response_status(&response), 0);
    assert_eq!(
        u16::from_be_bytes([response[5], response[6]]) as usize,
        contents.len()
    );
    assert_eq!(&response[7..], &contents[..]);
}

#[test]
fn test_file_read_missing_file_is_not_found() {
    let (temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    put_filename(&mut body, temp.path().join("missing").to_str().unwrap());
    body.extend_from_slice(&0u64.to_be_bytes());
    body.extend_from_slice(&4u16.to_be_bytes());

    let response = run_request(&engine, 0x0201, 7, &body);

    assert_eq!(response.len(), 5);
    assert_eq!(response_status(&response), Status::NotFound as u8);
}

#[test]
fn test_file_read_oversized_request_is_invalid_argument() {
    let (temp, engine) = setup_temp_engine();
    let file = temp.path().join("small.bin");
    std::fs::write(&file, b"tiny").unwrap();

    let mut body = Vec::new();
    put_filename(&mut body, file.to_str().unwrap());
    body.extend_from_slice(&0u64.to_be_bytes());
    body.extend_from_slice(&100u16.to_be_bytes());

    let response = run_request(&engine, 0x0201, 8, &body);

    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
}

#[test]
fn test_file_write_missing_file_drains_payload() {
    let (temp, engine) = setup_temp_engine();

    let mut body = Vec::new();
    put_filename(&mut body, temp.path().join("missing").to_str().unwrap());
    body.extend_from_slice(&0u64.to_be_bytes());
    body.extend_from_slice(&5u16.to_be_bytes());
    body.extend_from_slice(b"bytes");
    let body_len = body.len() as u64;
    body.push(0xAA); // next request's first byte

    let mut reader = Cursor::new(body);
    let mut response = Vec::new();
    let mut buf = Box::new([0u8; BUFFER_SIZE]);
    handle_request(0x0202, 9, &mut reader, &mut response, &engine, &mut buf).unwrap();

    assert_eq!(response_status(&response), Status::NotFound as u8);
    // Payload fully consumed despite the failure
    assert_eq!(reader.position(), body_len);
}

// =============================================================================
// Store-Family Requests
// =============================================================================

#[test]
fn test_clear_requires_magic() {
    let (_temp, engine) = setup_temp_engine();
    engine
        .arithmetic(
            numvault::math::ArithOp::Add,
            &numvault::engine::Operand::Literal(1),
            &numvault::engine::Operand::Literal(0),
            Some("x"),
            false,
        )
        .unwrap();

    // Wrong magic leaves the store untouched
    let response = run_request(&engine, 0x0310, 1, &0xDEAD_BEEFu32.to_be_bytes());
    assert_eq!(response_status(&response), Status::InvalidArgument as u8);
    assert_eq!(engine.entry_count(), 1);

    // Correct magic clears
    let response = run_request(&engine, 0x0310, 2, &0x0BAD_BAD0u32.to_be_bytes());
    assert_eq!(response_status(&response), 0);
    assert_eq!(engine.entry_count(), 0);
}

#[test]
fn test_dump_and_load_via_protocol() {
    let (temp, engine) = setup_temp_engine();
    engine
        .arithmetic(
            numvault::math::ArithOp::Add,
            &numvault::engine::Operand::Literal(5),
            &numvault::engine::Operand::Literal(0),
            Some("x"),
            false,
        )
        .unwrap();

    let dump_file = temp.path().join("dump.txt");
    let mut body = Vec::new();
    put_filename(&mut body, dump_file.to_str().unwrap());
    let response = run_request(&engine, 0x0301, 1, &body);
    assert_eq!(response_status(&response), 0);
    assert_eq!(std::fs::read_to_string(&dump_file).unwrap(), "x=5\n");

    // Dumping to the same path again fails
    let mut body = Vec::new();
    put_filename(&mut body, dump_file.to_str().unwrap());
    let response = run_request(&engine, 0x0301, 2, &body);
    assert_eq!(response_status(&response), Status::AlreadyExists as u8);

    // Clear, then load the dump back
    run_request(&engine, 0x0310, 3, &0x0BAD_BAD0u32.to_be_bytes());
    let mut body = Vec::new();
    put_filename(&mut body, dump_file.to_str().unwrap());
    let response = run_request(&engine, 0x0302, 4, &body);
    assert_eq!(response_status(&response), 0);
    assert_eq!(
        engine.get("x"),
        Some(numvault::store::Value::Number(5))
    );
}
