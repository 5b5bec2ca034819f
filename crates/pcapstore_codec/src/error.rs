//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input buffer is shorter than the fixed layout requires.
    #[error("buffer too short: need {expected} bytes, got {actual}")]
    ShortBuffer {
        /// Bytes required by the layout.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The magic number does not match the expected format.
    #[error("bad magic number: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// The magic the format expects.
        expected: u32,
        /// The magic actually read.
        found: u32,
    },

    /// The file carries a version this engine does not understand.
    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version read from the header.
        major: u16,
        /// Minor version read from the header.
        minor: u16,
    },

    /// The nanosecond field exceeds 999,999,999.
    #[error("timestamp nanoseconds out of range: {nanos}")]
    NanosOutOfRange {
        /// The offending nanosecond value.
        nanos: u32,
    },

    /// The segment name field of an index entry is invalid.
    #[error("invalid segment name: {message}")]
    InvalidSegmentName {
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Creates a short-buffer error.
    #[must_use]
    pub fn short_buffer(expected: usize, actual: usize) -> Self {
        Self::ShortBuffer { expected, actual }
    }

    /// Creates an invalid segment name error.
    pub fn invalid_segment_name(message: impl Into<String>) -> Self {
        Self::InvalidSegmentName {
            message: message.into(),
        }
    }
}
