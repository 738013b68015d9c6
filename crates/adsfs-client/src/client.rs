//! The [`AdsFs`] entry point.

use std::sync::Arc;

use adsfs_types::{LogicalRoot, OpenMode};
use tokio_util::sync::CancellationToken;

use crate::config::FsConfig;
use crate::cursor::{EntryCursor, SearchOption};
use crate::error::{AdsFsError, AdsFsResult};
use crate::file::RemoteFile;
use crate::transport::{AdsTransport, Link};

/// Remote file system of one target, reached through an [`AdsTransport`].
///
/// Cheap to clone; clones share the transport and the cancellation token.
/// Operations on distinct handles may run concurrently, each operation is
/// itself strictly sequential.
#[derive(Debug, Clone)]
pub struct AdsFs {
    pub(crate) link: Link,
    pub(crate) config: FsConfig,
}

impl AdsFs {
    /// Wrap a transport with default configuration.
    pub fn new<T: AdsTransport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Wrap a shared transport.
    pub fn from_arc(transport: Arc<dyn AdsTransport>) -> Self {
        Self {
            link: Link::new(transport, CancellationToken::new()),
            config: FsConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `token` for cooperative cancellation. It is checked before every
    /// round trip; closes still run after it fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.link = self.link.with_cancel(token);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Cancellation token checked by every operation.
    pub fn cancellation_token(&self) -> &CancellationToken {
        self.link.cancel_token()
    }

    /// Open a remote file.
    pub async fn open(&self, path: &str, mode: OpenMode, root: LogicalRoot) -> AdsFsResult<RemoteFile> {
        require_path(path)?;
        RemoteFile::open(
            self.link.clone(),
            path,
            mode,
            root,
            self.config.effective_chunk_size(),
        )
        .await
    }

    /// Start a lazy enumeration of `path` (empty names the root itself).
    /// An empty pattern matches everything.
    pub fn enumerate(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        root: LogicalRoot,
    ) -> EntryCursor {
        EntryCursor::new(
            self.link.clone(),
            path,
            self.config.pattern_or_default(pattern),
            option,
            self.config.max_depth,
            root,
        )
    }
}

/// Reject an empty path where an object must be named.
pub(crate) fn require_path(path: &str) -> AdsFsResult<()> {
    if path.is_empty() {
        return Err(AdsFsError::invalid_path(path, "path must not be empty"));
    }
    Ok(())
}
