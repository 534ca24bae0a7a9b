//! Error types for carbuf

use std::io;
use thiserror::Error;

/// Result type for carbuf operations
pub type Result<T> = std::result::Result<T, CarbufError>;

/// Errors that can occur while encoding, decoding or storing records
#[derive(Debug, Error)]
pub enum CarbufError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Buffer too small to hold a root offset and a table header
    #[error("Malformed buffer: {len} bytes is below the minimum record size")]
    MalformedBuffer {
        /// Actual buffer length
        len: usize,
    },

    /// An offset or length points outside the buffer
    #[error("Offset out of range: {len} bytes at {offset} exceeds buffer of {buffer_len} bytes")]
    OffsetOutOfRange {
        /// Position the read would start at
        offset: usize,
        /// Number of bytes the read needed
        len: usize,
        /// Total buffer length
        buffer_len: usize,
    },

    /// A required field is absent from a table's vtable
    #[error("Missing required field {table}.{field}")]
    MissingRequiredField {
        /// Table name
        table: &'static str,
        /// Field name
        field: &'static str,
    },

    /// Text bytes are not valid UTF-8
    #[error("Invalid UTF-8 text at offset {offset}")]
    InvalidText {
        /// Position of the first text byte
        offset: usize,
    },

    /// Text longer than the length prefix (or configured limit) allows
    #[error("Field too large: {size} bytes exceeds limit of {limit} bytes")]
    FieldTooLarge {
        /// Actual size
        size: usize,
        /// Size limit
        limit: usize,
    },

    /// File identifier does not match the expected one
    #[error("File identifier mismatch: expected {expected:?}, found {found:?}")]
    IdentifierMismatch {
        /// Identifier the caller asked for
        expected: [u8; 4],
        /// Identifier present in the buffer
        found: [u8; 4],
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
