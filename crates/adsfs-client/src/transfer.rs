//! Transfers between local files and the remote file system.

use std::io;
use std::path::{Path, PathBuf};

use adsfs_types::LogicalRoot;
use adsfs_types::path::join_path;
use tokio::fs;

use crate::client::{AdsFs, require_path};
use crate::config::WriteOptions;
use crate::error::{AdsFsError, AdsFsResult};
use crate::files::check_extension;

/// Local tree collected for a directory upload.
#[derive(Debug, Default)]
struct LocalTree {
    /// Relative directory paths, parents before children.
    dirs: Vec<String>,
    /// Relative file paths with their local location.
    files: Vec<(String, PathBuf)>,
}

impl AdsFs {
    /// Upload a local file to `remote`.
    ///
    /// The local and remote extensions must match. Missing local files fail
    /// with an I/O NotFound error before any remote call.
    #[tracing::instrument(skip(self, local), fields(local = %local.as_ref().display()), name = "fs.upload_file")]
    pub async fn upload_file(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
        options: WriteOptions,
        root: LogicalRoot,
    ) -> AdsFsResult<u64> {
        let local = local.as_ref();
        require_path(remote)?;
        check_extension(&local.to_string_lossy(), remote)?;
        let mut source = fs::File::open(local).await?;
        let written = self.write_file(remote, &mut source, options, root).await?;
        tracing::debug!(remote, written, "uploaded file");
        Ok(written)
    }

    /// Download `remote` into a new local file.
    ///
    /// An existing local file fails with `AlreadyExists`. If the download
    /// fails the partial local file is removed.
    #[tracing::instrument(skip(self, local), fields(local = %local.as_ref().display()), name = "fs.download_file")]
    pub async fn download_file(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
        root: LogicalRoot,
    ) -> AdsFsResult<u64> {
        let local = local.as_ref();
        require_path(remote)?;
        let mut sink = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(local)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(AdsFsError::already_exists(local.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        match self.read_file(remote, &mut sink, root).await {
            Ok(read) => {
                sink.sync_all().await?;
                Ok(read)
            }
            Err(e) => {
                drop(sink);
                if let Err(rm) = fs::remove_file(local).await {
                    tracing::warn!(local = %local.display(), error = %rm, "failed to remove partial download");
                }
                Err(e)
            }
        }
    }

    /// Upload the contents of a local directory below `remote_dir`.
    ///
    /// Remote directories are created as needed, parents first; files keep
    /// their relative location. Returns the number of files uploaded.
    #[tracing::instrument(skip(self, local_dir), fields(local = %local_dir.as_ref().display()), name = "fs.upload_directory")]
    pub async fn upload_directory(
        &self,
        local_dir: impl AsRef<Path>,
        remote_dir: &str,
        options: WriteOptions,
        root: LogicalRoot,
    ) -> AdsFsResult<usize> {
        let local_dir = local_dir.as_ref();
        let meta = fs::metadata(local_dir).await?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", local_dir.display()),
            )
            .into());
        }

        let tree = collect_local_tree(local_dir).await?;

        if !remote_dir.is_empty() {
            self.ensure_directory(remote_dir, root).await?;
        }
        for dir in &tree.dirs {
            self.ensure_directory(&join_path(remote_dir, dir), root).await?;
        }
        for (relative, local) in &tree.files {
            self.upload_file(local, &join_path(remote_dir, relative), options, root)
                .await?;
        }
        Ok(tree.files.len())
    }

    async fn ensure_directory(&self, path: &str, root: LogicalRoot) -> AdsFsResult<()> {
        if !self.directory_exists(path, root).await? {
            self.create_directory(path, root).await?;
        }
        Ok(())
    }

    /// Upload a local file into the boot directory.
    pub async fn upload_file_to_boot_folder(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
        options: WriteOptions,
    ) -> AdsFsResult<u64> {
        self.upload_file(local, remote, options, LogicalRoot::BootDir)
            .await
    }

    /// Download a file from the boot directory.
    pub async fn download_file_from_boot_folder(
        &self,
        local: impl AsRef<Path>,
        remote: &str,
    ) -> AdsFsResult<u64> {
        self.download_file(local, remote, LogicalRoot::BootDir).await
    }
}

/// Walk `base` with an explicit stack. Entries are sorted by name so the
/// upload order is stable.
async fn collect_local_tree(base: &Path) -> io::Result<LocalTree> {
    let mut tree = LocalTree::default();
    let mut stack = vec![(base.to_path_buf(), String::new())];

    while let Some((dir, relative)) = stack.pop() {
        let mut entries = Vec::new();
        let mut reader = fs::read_dir(&dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push((name, entry.path(), is_dir));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut subdirs = Vec::new();
        for (name, path, is_dir) in entries {
            let child = if relative.is_empty() {
                name
            } else {
                format!("{relative}/{name}")
            };
            if is_dir {
                tree.dirs.push(child.clone());
                subdirs.push((path, child));
            } else {
                tree.files.push((child, path));
            }
        }
        // Reverse so the first subdirectory is popped first.
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(tree)
}
