//! Substrate seam.
//!
//! [`AdsTransport`] is the consumed collaborator: three indexed primitives
//! on raw byte buffers. Connection setup, addressing and framing live behind
//! it. [`Link`] wraps a transport with the behavior every round trip in this
//! crate shares: cancellation checks, tracing, and error classification.

use std::fmt;
use std::sync::Arc;

use adsfs_types::{AdsErrorCode, FileHandle, FindHandle, IndexGroup};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AdsFsError, AdsFsResult};

/// Failure reported by the substrate for one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstrateError {
    /// ADS status code.
    pub code: AdsErrorCode,
    /// Optional transport-specific detail.
    pub message: Option<String>,
}

impl SubstrateError {
    /// Error with a status code and no detail.
    pub fn new(code: AdsErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Attach a detail message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "ADS error {}: {message}", self.code),
            None => write!(f, "ADS error {}", self.code),
        }
    }
}

impl std::error::Error for SubstrateError {}

impl From<AdsErrorCode> for SubstrateError {
    fn from(code: AdsErrorCode) -> Self {
        Self::new(code)
    }
}

/// Indexed Read/Write/ReadWrite on an established ADS route.
///
/// Implementations address the system service of one target. `group` and
/// `offset` are opaque here; the file layer supplies them.
#[async_trait]
pub trait AdsTransport: Send + Sync {
    /// Read into `dest`; returns the number of bytes filled.
    async fn read(&self, group: u32, offset: u32, dest: &mut [u8]) -> Result<usize, SubstrateError>;

    /// Write `src`.
    async fn write(&self, group: u32, offset: u32, src: &[u8]) -> Result<(), SubstrateError>;

    /// Write `src` and read the reply into `dest` in one round trip; returns
    /// the number of bytes filled.
    async fn read_write(
        &self,
        group: u32,
        offset: u32,
        dest: &mut [u8],
        src: &[u8],
    ) -> Result<usize, SubstrateError>;
}

/// A transport plus the cancellation token of the owning [`AdsFs`](crate::AdsFs).
#[derive(Clone)]
pub(crate) struct Link {
    transport: Arc<dyn AdsTransport>,
    cancel: CancellationToken,
}

impl Link {
    pub(crate) fn new(transport: Arc<dyn AdsTransport>, cancel: CancellationToken) -> Self {
        Self { transport, cancel }
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            cancel,
        }
    }

    /// Fails with `Cancelled` once the token fires.
    pub(crate) fn check_cancelled(&self) -> AdsFsResult<()> {
        if self.cancel.is_cancelled() {
            Err(AdsFsError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// ReadWrite round trip. `path` only names the call in errors.
    pub(crate) async fn read_write(
        &self,
        group: IndexGroup,
        offset: u32,
        dest: &mut [u8],
        src: &[u8],
        path: &str,
    ) -> AdsFsResult<usize> {
        self.check_cancelled()?;
        tracing::trace!(%group, offset, read_len = dest.len(), write_len = src.len(), path, "read_write");
        let filled = self
            .transport
            .read_write(group.value(), offset, dest, src)
            .await
            .map_err(|e| AdsFsError::from_substrate(group, path, e))?;
        // Clamp: a substrate may over-report the fill count.
        Ok(filled.min(dest.len()))
    }

    /// Write round trip.
    pub(crate) async fn write(
        &self,
        group: IndexGroup,
        offset: u32,
        src: &[u8],
        path: &str,
    ) -> AdsFsResult<()> {
        self.check_cancelled()?;
        tracing::trace!(%group, offset, write_len = src.len(), path, "write");
        self.transport
            .write(group.value(), offset, src)
            .await
            .map_err(|e| AdsFsError::from_substrate(group, path, e))
    }

    /// Close a find handle. Not subject to cancellation.
    pub(crate) async fn close_find(&self, handle: FindHandle, path: &str) -> AdsFsResult<()> {
        tracing::trace!(%handle, path, "close find handle");
        self.transport
            .write(IndexGroup::CloseHandle.value(), 0, &handle.close_payload())
            .await
            .map_err(|e| AdsFsError::from_substrate(IndexGroup::CloseHandle, path, e))
    }

    /// Close a file handle. Not subject to cancellation.
    pub(crate) async fn close_file(&self, handle: FileHandle, path: &str) -> AdsFsResult<()> {
        tracing::trace!(%handle, path, "close file handle");
        self.transport
            .read_write(IndexGroup::FileClose.value(), handle.raw(), &mut [], &[])
            .await
            .map(|_| ())
            .map_err(|e| AdsFsError::from_substrate(IndexGroup::FileClose, path, e))
    }

    /// Close every find handle, logging failures. Returns nothing: this runs
    /// on error and cancellation paths where the first error already won.
    pub(crate) async fn close_finds_quietly(&self, handles: Vec<(FindHandle, String)>) {
        for (handle, path) in handles.into_iter().rev() {
            if let Err(e) = self.close_find(handle, &path).await {
                tracing::warn!(%handle, path = %path, error = %e, "failed to close find handle");
            }
        }
    }

    /// Schedule find-handle release from a synchronous context (drop).
    pub(crate) fn release_finds_in_background(&self, handles: Vec<(FindHandle, String)>) {
        if handles.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!(count = handles.len(), "cursor dropped with open find handles; releasing");
                let link = self.clone();
                runtime.spawn(async move { link.close_finds_quietly(handles).await });
            }
            Err(_) => {
                tracing::warn!(count = handles.len(), "cursor dropped outside a runtime; find handles leaked");
            }
        }
    }

    /// Schedule file-handle release from a synchronous context (drop).
    pub(crate) fn release_file_in_background(&self, handle: FileHandle, path: String) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!(%handle, path = %path, "remote file dropped while open; closing");
                let link = self.clone();
                runtime.spawn(async move {
                    if let Err(e) = link.close_file(handle, &path).await {
                        tracing::warn!(%handle, path = %path, error = %e, "background close failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(%handle, path = %path, "remote file dropped outside a runtime; handle leaked");
            }
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryTarget;

    #[test]
    fn test_substrate_error_display() {
        let plain = SubstrateError::new(AdsErrorCode::BUSY);
        assert_eq!(plain.to_string(), "ADS error 0x708 (device busy)");
        let detailed = SubstrateError::new(AdsErrorCode(0x745)).with_message("timeout");
        assert_eq!(detailed.to_string(), "ADS error 0x745: timeout");
    }

    #[tokio::test]
    async fn test_cancelled_link_skips_round_trip() {
        let target = Arc::new(MemoryTarget::new());
        let cancel = CancellationToken::new();
        let link = Link::new(target.clone(), cancel.clone());
        cancel.cancel();

        let err = link
            .write(IndexGroup::MakeDirectory, 1, b"x\0", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AdsFsError::Cancelled));
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_classified() {
        let target = Arc::new(MemoryTarget::new());
        let link = Link::new(target, CancellationToken::new());
        let mut handle = [0u8; 4];
        let err = link
            .read_write(IndexGroup::FileOpen, 0x10001, &mut handle, b"missing\0", "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
