//! Remote file handle lifecycle.
//!
//! `open` yields a [`RemoteFile`]; reads and writes go in chunks through the
//! handle; `close` consumes it. A handle that is dropped without being
//! closed is released in the background.

use adsfs_types::path::encode_path;
use adsfs_types::{FileHandle, IndexGroup, LogicalRoot, OpenMode, index_offset};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{AdsFsError, AdsFsResult};
use crate::transport::Link;

/// Width of the handle reply to an open and the acknowledgement of a write.
const REPLY_LEN: usize = 4;

/// An open remote file.
#[derive(Debug)]
pub struct RemoteFile {
    link: Link,
    handle: FileHandle,
    path: String,
    chunk_size: usize,
    open: bool,
}

impl RemoteFile {
    pub(crate) async fn open(
        link: Link,
        path: &str,
        mode: OpenMode,
        root: LogicalRoot,
        chunk_size: usize,
    ) -> AdsFsResult<Self> {
        let request = encode_path(path)?;
        let mut reply = [0u8; REPLY_LEN];
        let filled = link
            .read_write(
                IndexGroup::FileOpen,
                index_offset(mode, root),
                &mut reply,
                &request,
                path,
            )
            .await?;
        if filled < REPLY_LEN {
            return Err(AdsFsError::invalid_handle(path));
        }
        let handle = FileHandle::new(u32::from_le_bytes(reply))
            .ok_or_else(|| AdsFsError::invalid_handle(path))?;
        tracing::debug!(%handle, path, ?mode, %root, "opened remote file");
        Ok(Self {
            link,
            handle,
            path: path.to_string(),
            chunk_size: chunk_size.max(1),
            open: true,
        })
    }

    /// Remote handle.
    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    /// Path the file was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bytes per round trip used by `read_to`/`write_from`.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// One read round trip. Zero means end of file.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> AdsFsResult<usize> {
        self.link
            .read_write(IndexGroup::FileRead, self.handle.raw(), buf, &[], &self.path)
            .await
    }

    /// One write round trip.
    ///
    /// A four-byte reply is the acknowledged count and must match the chunk
    /// length; an empty reply acknowledges the whole chunk.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> AdsFsResult<()> {
        let mut ack = [0u8; REPLY_LEN];
        let filled = self
            .link
            .read_write(IndexGroup::FileWrite, self.handle.raw(), &mut ack, chunk, &self.path)
            .await?;
        let acknowledged = match filled {
            0 => chunk.len(),
            REPLY_LEN => u32::from_le_bytes(ack) as usize,
            _ => 0,
        };
        if acknowledged != chunk.len() {
            return Err(AdsFsError::ShortWrite {
                path: self.path.clone(),
                sent: chunk.len(),
                acknowledged,
            });
        }
        Ok(())
    }

    /// Read until end of file, forwarding each chunk to `sink` in order.
    /// Returns the byte count.
    pub async fn read_to<W>(&mut self, sink: &mut W) -> AdsFsResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; self.chunk_size];
        let mut total = 0u64;
        loop {
            let n = self.read_chunk(&mut buf).await?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n]).await?;
            total += n as u64;
        }
        sink.flush().await?;
        tracing::trace!(handle = %self.handle, total, "read complete");
        Ok(total)
    }

    /// Write everything `source` yields, one full chunk per round trip.
    /// Returns the byte count.
    pub async fn write_from<R>(&mut self, source: &mut R) -> AdsFsResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; self.chunk_size];
        let mut total = 0u64;
        loop {
            let n = fill_chunk(source, &mut buf).await?;
            if n == 0 {
                break;
            }
            self.write_chunk(&buf[..n]).await?;
            total += n as u64;
        }
        tracing::trace!(handle = %self.handle, total, "write complete");
        Ok(total)
    }

    /// Write a whole buffer in chunks.
    pub async fn write_all(&mut self, mut data: &[u8]) -> AdsFsResult<u64> {
        self.write_from(&mut data).await
    }

    /// Close the handle. Runs even after cancellation.
    pub async fn close(mut self) -> AdsFsResult<()> {
        self.open = false;
        self.link.close_file(self.handle, &self.path).await
    }

    /// Close the handle and merge the outcome with `result`.
    ///
    /// The first error wins: a close failure after an earlier error is only
    /// logged, a close failure after success is returned.
    pub async fn finish<T>(self, result: AdsFsResult<T>) -> AdsFsResult<T> {
        let handle = self.handle;
        let closed = self.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(%handle, error = %close_err, "close failed after earlier error");
                Err(e)
            }
        }
    }
}

impl Drop for RemoteFile {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.link
                .release_file_in_background(self.handle, std::mem::take(&mut self.path));
        }
    }
}

/// Read from `source` until `buf` is full or the source is exhausted.
async fn fill_chunk<R>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backends::{Fault, MemoryTarget};
    use tokio_util::sync::CancellationToken;

    fn link(target: &Arc<MemoryTarget>) -> Link {
        Link::new(target.clone(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_chunked_read_preserves_order() {
        let target = Arc::new(MemoryTarget::new());
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        target.put_file(LogicalRoot::Generic, "blob.bin", &data);

        let mut file = RemoteFile::open(link(&target), "blob.bin", OpenMode::read_binary(), LogicalRoot::Generic, 64)
            .await
            .unwrap();
        let mut sink = Vec::new();
        let total = file.read_to(&mut sink).await.unwrap();
        file.close().await.unwrap();

        assert_eq!(total, 1000);
        assert_eq!(sink, data);
        // 16 chunks carrying data, one empty read ending the loop.
        assert_eq!(target.calls_for(IndexGroup::FileRead), 17);
        assert_eq!(target.open_file_handles(), 0);
    }

    #[tokio::test]
    async fn test_chunked_write_sends_full_chunks() {
        let target = Arc::new(MemoryTarget::new());
        let data = vec![7u8; 100];
        let mut file = RemoteFile::open(link(&target), "out.bin", OpenMode::write_binary(), LogicalRoot::Generic, 32)
            .await
            .unwrap();
        file.write_all(&data).await.unwrap();
        file.close().await.unwrap();

        assert_eq!(target.calls_for(IndexGroup::FileWrite), 4);
        assert_eq!(target.file_contents(LogicalRoot::Generic, "out.bin").unwrap(), data);
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let target = Arc::new(MemoryTarget::new());
        let err = RemoteFile::open(link(&target), "missing", OpenMode::read_binary(), LogicalRoot::Generic, 16)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_zero_handle_is_structural() {
        let target = Arc::new(MemoryTarget::new());
        target.put_file(LogicalRoot::Generic, "a", b"x");
        target.inject(Fault::ZeroFileHandle);
        let err = RemoteFile::open(link(&target), "a", OpenMode::read_binary(), LogicalRoot::Generic, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, AdsFsError::InvalidHandle(_)));
    }

    #[tokio::test]
    async fn test_short_ack_is_rejected() {
        let target = Arc::new(MemoryTarget::new());
        target.inject(Fault::ShortAck);
        let mut file = RemoteFile::open(link(&target), "out.bin", OpenMode::write_binary(), LogicalRoot::Generic, 16)
            .await
            .unwrap();
        let result = file.write_chunk(b"0123456789").await;
        let err = file.finish(result).await.unwrap_err();
        assert!(matches!(err, AdsFsError::ShortWrite { sent: 10, acknowledged: 9, .. }));
        assert_eq!(target.open_file_handles(), 0);
    }

    #[tokio::test]
    async fn test_finish_keeps_first_error() {
        let target = Arc::new(MemoryTarget::new());
        target.put_file(LogicalRoot::Generic, "a", b"data");
        let file = RemoteFile::open(link(&target), "a", OpenMode::read_binary(), LogicalRoot::Generic, 16)
            .await
            .unwrap();
        target.fail_next(IndexGroup::FileClose, adsfs_types::AdsErrorCode::BUSY);
        let err = file
            .finish::<()>(Err(AdsFsError::not_found("earlier")))
            .await
            .unwrap_err();
        assert!(matches!(err, AdsFsError::NotFound { ref path, .. } if path == "earlier"));
    }

    #[tokio::test]
    async fn test_drop_closes_in_background() {
        let target = Arc::new(MemoryTarget::new());
        target.put_file(LogicalRoot::Generic, "a", b"data");
        let file = RemoteFile::open(link(&target), "a", OpenMode::read_binary(), LogicalRoot::Generic, 16)
            .await
            .unwrap();
        assert_eq!(target.open_file_handles(), 1);
        drop(file);
        for _ in 0..10 {
            if target.open_file_handles() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(target.open_file_handles(), 0);
    }
}
