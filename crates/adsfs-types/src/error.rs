//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding requests or decoding responses.
///
/// All of these are contract violations: they are never retried and never
/// mean "not found".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Response buffer is shorter than the fixed record layout.
    #[error("find record too short: expected {expected} bytes, got {actual}")]
    ShortRecord {
        /// Bytes the layout requires.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// Path cannot be represented as 8-bit NUL-terminated text.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Name does not fit its fixed-width record field.
    #[error("name {name:?} does not fit a {width}-byte field")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Field width including the terminator.
        width: usize,
    },
}

impl CodecError {
    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }
}

/// Codec result type.
pub type CodecResult<T> = Result<T, CodecError>;
