//! File-system client configuration.

use adsfs_types::path::MATCH_ALL;
use serde::{Deserialize, Serialize};

/// Default transfer chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Tunables for an [`AdsFs`](crate::AdsFs) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Bytes per read/write round trip. Values below 1 are treated as 1.
    pub chunk_size: usize,

    /// Deepest level a recursive scan descends to. `None` is unbounded;
    /// `Some(0)` behaves like a top-directory-only scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Pattern used when a scan is started with an empty one.
    pub search_pattern: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_depth: None,
            search_pattern: MATCH_ALL.to_string(),
        }
    }
}

impl FsConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transfer chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Bound recursive scans.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Set the default search pattern.
    pub fn with_search_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.search_pattern = pattern.into();
        self
    }

    /// Chunk size clamped to at least one byte.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// `pattern`, or the default one when empty.
    pub fn pattern_or_default<'a>(&'a self, pattern: &'a str) -> &'a str {
        if pattern.is_empty() {
            if self.search_pattern.is_empty() {
                MATCH_ALL
            } else {
                &self.search_pattern
            }
        } else {
            pattern
        }
    }
}

/// Options for uploads and whole-file writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Replace an existing destination instead of failing.
    pub overwrite: bool,
    /// Create missing parent directories on the remote side.
    pub ensure_directory: bool,
}

impl WriteOptions {
    /// Options with both flags off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow replacing an existing destination.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Create missing parent directories.
    pub fn with_ensure_directory(mut self, ensure_directory: bool) -> Self {
        self.ensure_directory = ensure_directory;
        self
    }
}
