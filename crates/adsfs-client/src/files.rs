//! File operations: existence, create, delete, rename, copy, whole-file I/O.

use adsfs_types::path::{encode_path, encode_rename, extension};
use adsfs_types::{IndexGroup, LogicalRoot, OpenMode, rename_offset};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::client::{AdsFs, require_path};
use crate::config::WriteOptions;
use crate::error::{AdsFsError, AdsFsResult};
use crate::file::RemoteFile;

/// Fails with `ExtensionMismatch` unless both paths share an extension.
pub(crate) fn check_extension(from: &str, to: &str) -> AdsFsResult<()> {
    if extension(from) != extension(to) {
        return Err(AdsFsError::ExtensionMismatch {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

impl AdsFs {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether `path` can be opened for reading.
    #[tracing::instrument(skip(self), name = "fs.file_exists")]
    pub async fn file_exists(&self, path: &str, root: LogicalRoot) -> AdsFsResult<bool> {
        match self.open(path, OpenMode::read_binary(), root).await {
            Ok(file) => {
                file.close().await?;
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `path` exists under the boot directory.
    pub async fn file_exists_in_boot_folder(&self, path: &str) -> AdsFsResult<bool> {
        self.file_exists(path, LogicalRoot::BootDir).await
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create (or truncate) a file.
    #[tracing::instrument(skip(self), name = "fs.create_file")]
    pub async fn create_file(
        &self,
        path: &str,
        ensure_directory: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<()> {
        let mut mode = OpenMode::WRITE;
        if ensure_directory {
            mode |= OpenMode::ENSURE_DIRECTORY;
        }
        self.open(path, mode, root).await?.close().await
    }

    /// Delete a file.
    #[tracing::instrument(skip(self), name = "fs.delete_file")]
    pub async fn delete_file(&self, path: &str, root: LogicalRoot) -> AdsFsResult<()> {
        require_path(path)?;
        let request = encode_path(path)?;
        self.link
            .read_write(IndexGroup::FileDelete, root.path_offset(), &mut [], &request, path)
            .await?;
        tracing::debug!(path, %root, "deleted file");
        Ok(())
    }

    /// Rename a file. `to` is a full path in the same root and must keep the
    /// extension of `from`.
    #[tracing::instrument(skip(self), name = "fs.rename_file")]
    pub async fn rename_file(
        &self,
        from: &str,
        to: &str,
        overwrite: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<()> {
        check_extension(from, to)?;
        self.rename_entry(from, to, overwrite, root).await
    }

    /// Shared rename call for files and directories.
    pub(crate) async fn rename_entry(
        &self,
        from: &str,
        to: &str,
        overwrite: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<()> {
        require_path(from)?;
        require_path(to)?;
        let request = encode_rename(from, to)?;
        self.link
            .read_write(
                IndexGroup::FileRename,
                rename_offset(overwrite, root),
                &mut [],
                &request,
                from,
            )
            .await?;
        Ok(())
    }

    /// Copy a file within `root`.
    ///
    /// Both handles are always closed, whichever step fails.
    #[tracing::instrument(skip(self), name = "fs.copy_file")]
    pub async fn copy_file(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<u64> {
        require_path(source)?;
        require_path(destination)?;
        check_extension(source, destination)?;

        if !self.file_exists(source, root).await? {
            return Err(AdsFsError::not_found(source));
        }
        if !overwrite && self.file_exists(destination, root).await? {
            return Err(AdsFsError::already_exists(destination));
        }

        let mut write_mode = OpenMode::write_binary();
        if overwrite {
            write_mode |= OpenMode::OVERWRITE;
        }

        let mut src = self.open(source, OpenMode::read_binary(), root).await?;
        let mut dst = match self.open(destination, write_mode, root).await {
            Ok(dst) => dst,
            Err(e) => return src.finish(Err(e)).await,
        };

        let pumped = pump(&mut src, &mut dst).await;
        let pumped = dst.finish(pumped).await;
        src.finish(pumped).await
    }

    /// Copy then delete the source. Not atomic: if the delete fails the
    /// copy stays in place.
    #[tracing::instrument(skip(self), name = "fs.move_file")]
    pub async fn move_file(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<u64> {
        let copied = self.copy_file(source, destination, overwrite, root).await?;
        self.delete_file(source, root).await?;
        Ok(copied)
    }

    // ========================================================================
    // Whole-file I/O
    // ========================================================================

    /// Download `path` into `sink`. Returns the byte count.
    #[tracing::instrument(skip(self, sink), name = "fs.read_file")]
    pub async fn read_file<W>(&self, path: &str, sink: &mut W, root: LogicalRoot) -> AdsFsResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut file = self.open(path, OpenMode::read_binary(), root).await?;
        let result = file.read_to(sink).await;
        file.finish(result).await
    }

    /// Download `path` into memory.
    pub async fn read_all_bytes(&self, path: &str, root: LogicalRoot) -> AdsFsResult<Vec<u8>> {
        let mut data = Vec::new();
        self.read_file(path, &mut data, root).await?;
        Ok(data)
    }

    /// Upload everything `source` yields to `path`.
    ///
    /// Unless `options.overwrite` is set an existing destination fails with
    /// `AlreadyExists` before anything is written.
    #[tracing::instrument(skip(self, source), name = "fs.write_file")]
    pub async fn write_file<R>(
        &self,
        path: &str,
        source: &mut R,
        options: WriteOptions,
        root: LogicalRoot,
    ) -> AdsFsResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        require_path(path)?;
        if !options.overwrite && self.file_exists(path, root).await? {
            return Err(AdsFsError::already_exists(path));
        }

        let mut mode = OpenMode::write_binary();
        if options.ensure_directory {
            mode |= OpenMode::ENSURE_DIRECTORY;
        }
        if options.overwrite {
            mode |= OpenMode::OVERWRITE;
        }

        let mut file = self.open(path, mode, root).await?;
        let result = file.write_from(source).await;
        file.finish(result).await
    }

    /// Replace the contents of `path` with `data`.
    pub async fn write_all_bytes(&self, path: &str, data: &[u8], root: LogicalRoot) -> AdsFsResult<()> {
        self.put_contents(path, data, OpenMode::write_binary(), root).await
    }

    /// Replace the contents of `path` with `text` (text mode).
    pub async fn write_all_text(&self, path: &str, text: &str, root: LogicalRoot) -> AdsFsResult<()> {
        self.put_contents(path, text.as_bytes(), OpenMode::WRITE | OpenMode::TEXT, root)
            .await
    }

    /// Append `data` to `path`.
    pub async fn append_all_bytes(&self, path: &str, data: &[u8], root: LogicalRoot) -> AdsFsResult<()> {
        self.put_contents(path, data, OpenMode::append_binary(), root).await
    }

    /// Append `text` to `path` (text mode).
    pub async fn append_all_text(&self, path: &str, text: &str, root: LogicalRoot) -> AdsFsResult<()> {
        self.put_contents(path, text.as_bytes(), OpenMode::APPEND | OpenMode::TEXT, root)
            .await
    }

    async fn put_contents(
        &self,
        path: &str,
        data: &[u8],
        mode: OpenMode,
        root: LogicalRoot,
    ) -> AdsFsResult<()> {
        let mut file = self.open(path, mode, root).await?;
        let result = file.write_all(data).await.map(|_| ());
        file.finish(result).await
    }
}

/// Move chunks from `src` to `dst` until `src` reports end of file.
async fn pump(src: &mut RemoteFile, dst: &mut RemoteFile) -> AdsFsResult<u64> {
    let mut buf = vec![0u8; src.chunk_size()];
    let mut total = 0u64;
    loop {
        let n = src.read_chunk(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        dst.write_chunk(&buf[..n]).await?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backends::MemoryTarget;

    #[test]
    fn test_extension_guard() {
        assert!(check_extension("a.txt", "dir/b.txt").is_ok());
        assert!(check_extension("a", "b").is_ok());
        let err = check_extension("a.txt", "a.bin").unwrap_err();
        assert!(matches!(err, AdsFsError::ExtensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_file_exists_closes_handle() {
        let target = Arc::new(MemoryTarget::new());
        target.put_file(LogicalRoot::BootDir, "CurrentConfig.xml", b"<x/>");
        let fs = AdsFs::from_arc(target.clone());

        assert!(fs.file_exists_in_boot_folder("CurrentConfig.xml").await.unwrap());
        assert!(!fs.file_exists("CurrentConfig.xml", LogicalRoot::Generic).await.unwrap());
        assert_eq!(target.open_file_handles(), 0);
    }

    #[tokio::test]
    async fn test_text_and_append() {
        let target = Arc::new(MemoryTarget::new());
        let fs = AdsFs::from_arc(target.clone());

        fs.write_all_text("log.txt", "one\n", LogicalRoot::Generic).await.unwrap();
        fs.append_all_text("log.txt", "two\n", LogicalRoot::Generic).await.unwrap();
        fs.append_all_bytes("log.txt", b"3", LogicalRoot::Generic).await.unwrap();

        let data = fs.read_all_bytes("log.txt", LogicalRoot::Generic).await.unwrap();
        assert_eq!(data, b"one\ntwo\n3");
    }

    #[tokio::test]
    async fn test_write_file_refuses_existing_without_overwrite() {
        let target = Arc::new(MemoryTarget::new());
        target.put_file(LogicalRoot::Generic, "a.bin", b"old");
        let fs = AdsFs::from_arc(target.clone());

        let mut source: &[u8] = b"new";
        let err = fs
            .write_file("a.bin", &mut source, WriteOptions::new(), LogicalRoot::Generic)
            .await
            .unwrap_err();
        assert!(matches!(err, AdsFsError::AlreadyExists(_)));
        assert_eq!(target.calls_for(IndexGroup::FileWrite), 0);

        let mut source: &[u8] = b"new";
        fs.write_file(
            "a.bin",
            &mut source,
            WriteOptions::new().with_overwrite(true),
            LogicalRoot::Generic,
        )
        .await
        .unwrap();
        assert_eq!(target.file_contents(LogicalRoot::Generic, "a.bin").unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_create_file_with_ensure_directory() {
        let target = Arc::new(MemoryTarget::new());
        let fs = AdsFs::from_arc(target.clone());
        fs.create_file("deep/er/new.txt", true, LogicalRoot::Generic)
            .await
            .unwrap();
        assert!(target.contains(LogicalRoot::Generic, "deep/er"));
        assert_eq!(target.file_contents(LogicalRoot::Generic, "deep/er/new.txt").unwrap(), b"");

        let err = fs
            .create_file("other/new.txt", false, LogicalRoot::Generic)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
