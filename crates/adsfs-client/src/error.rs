//! Error taxonomy for remote file-system operations.

use std::io;

use adsfs_types::{CodecError, ErrorClass, IndexGroup};
use thiserror::Error;

use crate::transport::SubstrateError;

/// Remote file-system error type.
///
/// Every remote call is attempted exactly once; nothing in this layer retries.
/// Composite operations are not transactional, so a failure partway through
/// leaves partial remote state and the error names the failing call.
#[derive(Debug, Error)]
pub enum AdsFsError {
    /// Find response shorter than the record layout.
    #[error("find record too short: expected {expected} bytes, got {actual}")]
    ShortRecord { expected: usize, actual: usize },

    /// Open or find returned a missing or zero handle.
    #[error("invalid handle returned for {0}")]
    InvalidHandle(String),

    /// Remote side acknowledged fewer bytes than were sent.
    #[error("short write on {path}: sent {sent} bytes, acknowledged {acknowledged}")]
    ShortWrite {
        path: String,
        sent: usize,
        acknowledged: usize,
    },

    /// Path cannot be sent (empty where a name is required, NUL, non 8-bit).
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Remote file or directory does not exist. `service` names the call that
    /// reported it; `None` when a pre-check decided.
    #[error("not found: {path}{}", service_suffix(.service))]
    NotFound {
        path: String,
        service: Option<IndexGroup>,
    },

    /// Destination exists and overwrite was not requested.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Directory has content and recursive delete was not requested.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Source and destination extensions differ.
    #[error("extension mismatch: {from} -> {to}")]
    ExtensionMismatch { from: String, to: String },

    /// Any other failure reported by the substrate.
    #[error("{service} on {path:?} failed: {source}")]
    Substrate {
        service: IndexGroup,
        path: String,
        #[source]
        source: SubstrateError,
    },

    /// Cancellation was requested before the next round trip.
    #[error("operation cancelled")]
    Cancelled,

    /// Local file I/O (upload source or download sink).
    #[error("local I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of [`AdsFsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed response or protocol-contract violation; always fatal.
    Structural,
    /// Remote object absent; exists-checks turn this into `false`.
    NotFound,
    /// Conflicts with existing state; surfaced, never retried.
    StateConflict,
    /// Reported verbatim from the substrate.
    Substrate,
    /// Cooperative cancellation.
    Cancelled,
    /// Local file I/O.
    Io,
}

impl AdsFsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdsFsError::ShortRecord { .. }
            | AdsFsError::InvalidHandle(_)
            | AdsFsError::ShortWrite { .. }
            | AdsFsError::InvalidPath { .. } => ErrorKind::Structural,
            AdsFsError::NotFound { .. } => ErrorKind::NotFound,
            AdsFsError::AlreadyExists(_)
            | AdsFsError::DirectoryNotEmpty(_)
            | AdsFsError::ExtensionMismatch { .. } => ErrorKind::StateConflict,
            AdsFsError::Substrate { .. } => ErrorKind::Substrate,
            AdsFsError::Cancelled => ErrorKind::Cancelled,
            AdsFsError::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true for [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            service: None,
        }
    }

    /// The call that failed, when a remote call did.
    pub fn service(&self) -> Option<IndexGroup> {
        match self {
            AdsFsError::NotFound { service, .. } => *service,
            AdsFsError::Substrate { service, .. } => Some(*service),
            _ => None,
        }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create an InvalidHandle error.
    pub fn invalid_handle(path: impl Into<String>) -> Self {
        Self::InvalidHandle(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classify a substrate failure of `group` on `path`.
    ///
    /// DeviceNotFound becomes [`AdsFsError::NotFound`] and DeviceExists
    /// becomes [`AdsFsError::AlreadyExists`]; everything else is kept
    /// verbatim as [`AdsFsError::Substrate`].
    pub fn from_substrate(group: IndexGroup, path: &str, source: SubstrateError) -> Self {
        match source.code.class() {
            ErrorClass::NotFound => Self::NotFound {
                path: path.to_string(),
                service: Some(group),
            },
            ErrorClass::AlreadyExists => Self::AlreadyExists(path.to_string()),
            _ => Self::Substrate {
                service: group,
                path: path.to_string(),
                source,
            },
        }
    }
}

impl From<CodecError> for AdsFsError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::ShortRecord { expected, actual } => {
                AdsFsError::ShortRecord { expected, actual }
            }
            CodecError::InvalidPath { path, reason } => AdsFsError::InvalidPath {
                path,
                reason: reason.to_string(),
            },
            CodecError::NameTooLong { name, width } => AdsFsError::InvalidPath {
                path: name,
                reason: format!("longer than {width} bytes"),
            },
        }
    }
}

fn service_suffix(service: &Option<IndexGroup>) -> String {
    service.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Convert AdsFsError to std::io::Error for compatibility.
impl From<AdsFsError> for io::Error {
    fn from(e: AdsFsError) -> Self {
        match e {
            AdsFsError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            AdsFsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            AdsFsError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            AdsFsError::InvalidPath { .. } | AdsFsError::ExtensionMismatch { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            AdsFsError::ShortRecord { .. } | AdsFsError::InvalidHandle(_) => {
                io::Error::new(io::ErrorKind::InvalidData, e.to_string())
            }
            AdsFsError::ShortWrite { .. } => io::Error::new(io::ErrorKind::WriteZero, e.to_string()),
            AdsFsError::Cancelled => io::Error::new(io::ErrorKind::Interrupted, "operation cancelled"),
            AdsFsError::Io(e) => e,
            AdsFsError::Substrate { .. } => io::Error::other(e.to_string()),
        }
    }
}

/// Remote file-system result type.
pub type AdsFsResult<T> = Result<T, AdsFsError>;
