//! Error types for the pcapstore engine.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in pcapstore operations.
///
/// Every failing operation surfaces one of these; nothing is retried or
/// swallowed internally. Variants that concern a specific file carry its
/// path, and the truncation variant carries the byte offset of the torn
/// write.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] pcapstore_storage::StorageError),

    /// Binary layout codec error.
    #[error("codec error: {0}")]
    Codec(#[from] pcapstore_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file failed magic or version validation.
    #[error("invalid format in {path}: {message}")]
    Format {
        /// Path of the rejected file.
        path: PathBuf,
        /// Description of the mismatch.
        message: String,
    },

    /// An argument was rejected before any write occurred.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the rejected argument.
        message: String,
    },

    /// A segment ends mid-packet: the declared payload length exceeds the
    /// bytes remaining in the file.
    #[error("truncated packet in {path} at offset {offset}")]
    Truncated {
        /// Path of the torn segment file.
        path: PathBuf,
        /// Byte offset of the packet header whose payload is incomplete.
        offset: u64,
    },

    /// A payload failed checksum verification.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the packet header.
        expected: u32,
        /// Checksum computed over the payload.
        actual: u32,
    },

    /// Operation on a closed or unopened handle. Always a programming error.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },
}

impl CoreError {
    /// Creates a format error for a file.
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a truncated-data error.
    pub fn truncated(path: &Path, offset: u64) -> Self {
        Self::Truncated {
            path: path.to_path_buf(),
            offset,
        }
    }

    /// Creates an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}
