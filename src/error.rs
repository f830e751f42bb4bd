//! Error types for NumVault
//!
//! Two layers: `VaultError` for failures that abort startup or a whole
//! connection, and `RequestError` for failures that are reported back to
//! the client as a wire status byte and never leave the request boundary.

use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for server-level operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Persistence Log Errors
    // -------------------------------------------------------------------------
    #[error("log replay failed: {0}")]
    Replay(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("network error: {0}")]
    Network(String),
}

// =============================================================================
// Wire Status Codes
// =============================================================================

/// Status byte carried in every response header.
///
/// The discriminants are errno-flavored (ENOENT, EINVAL, ELOOP, ...) so
/// status bytes read naturally in packet captures and client logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    NotFound = 2,
    IoError = 5,
    TypeMismatch = 14,
    AlreadyExists = 17,
    InvalidArgument = 22,
    CycleLimitExceeded = 40,
    Overflow = 75,
}

impl Status {
    /// Human-readable name for a status byte, including raw errno values
    /// surfaced by IOError responses.
    pub fn describe(code: u8) -> &'static str {
        match code {
            0 => "ok",
            2 => "not found",
            14 => "type mismatch",
            17 => "already exists",
            22 => "invalid argument",
            40 => "cycle limit exceeded",
            75 => "overflow",
            _ => "i/o error",
        }
    }
}

// =============================================================================
// Request-Scoped Errors
// =============================================================================

/// A failure local to one request.
///
/// Every variant maps onto exactly one wire status; the connection and
/// all other in-flight requests are unaffected.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("referenced variable or file does not exist")]
    NotFound,

    #[error("operand holds an alias where a number was required, or vice versa")]
    TypeMismatch,

    #[error("alias chain exceeded the configured hop bound")]
    CycleLimitExceeded,

    #[error("arithmetic result exceeds the 64-bit signed range")]
    Overflow,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("target file already exists")]
    AlreadyExists,

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// The status byte this failure puts on the wire.
    ///
    /// I/O failures surface the underlying OS errno when one exists.
    pub fn status(&self) -> u8 {
        match self {
            RequestError::NotFound => Status::NotFound as u8,
            RequestError::TypeMismatch => Status::TypeMismatch as u8,
            RequestError::CycleLimitExceeded => Status::CycleLimitExceeded as u8,
            RequestError::Overflow => Status::Overflow as u8,
            RequestError::InvalidArgument => Status::InvalidArgument as u8,
            RequestError::AlreadyExists => Status::AlreadyExists as u8,
            RequestError::Io(e) => match e.raw_os_error() {
                Some(errno) if errno > 0 && errno < 256 => errno as u8,
                _ => Status::IoError as u8,
            },
        }
    }

    /// Map a filesystem error onto the request taxonomy.
    pub fn from_fs(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => RequestError::NotFound,
            std::io::ErrorKind::AlreadyExists => RequestError::AlreadyExists,
            _ => RequestError::Io(e),
        }
    }
}
