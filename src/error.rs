//! Error types for sxgeo.

use thiserror::Error;

/// Error type for sxgeo operations.
///
/// Lookup misses are never errors: every lookup returns `Option` and maps
/// `None` to "no data". Errors surface only while opening a database.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not start with the `SxG` prefix
    #[error("invalid file prefix: expected SxG, got {0:?}")]
    InvalidPrefix([u8; 3]),

    /// A required header field is zero or out of range
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// Charset code not in {0: UTF-8, 1: latin1, 2: cp1251}
    #[error("unknown charset code: {0}")]
    UnknownCharset(u8),

    /// A section is shorter than the header declares
    #[error("truncated {section}: expected {expected} bytes, got {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    /// First-octet index decreases at the given position
    #[error("first octet index is not monotonic at position {position}")]
    NonMonotonicIndex { position: usize },

    /// Pack format names a type letter outside the known vocabulary
    #[error("unknown pack format type '{ty}' for field '{field}'")]
    UnknownFieldType { ty: char, field: String },

    /// Pack format is syntactically broken
    #[error("invalid pack format: {0}")]
    InvalidPackFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for sxgeo operations.
pub type Result<T> = std::result::Result<T, Error>;
