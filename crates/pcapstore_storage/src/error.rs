//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Attempted to grow storage through `truncate`.
    #[error("cannot truncate from {size} to larger size {requested}")]
    TruncateBeyondEnd {
        /// The current storage size.
        size: u64,
        /// The requested (larger) size.
        requested: u64,
    },
}

impl StorageError {
    /// Returns true if the error maps to "file already exists".
    ///
    /// Used by callers that create segment files with create-new semantics.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::AlreadyExists)
    }
}
