//! Directory operations and enumeration views.

use adsfs_types::path::{MATCH_ALL, encode_path};
use adsfs_types::{
    DirectoryEntry, FIND_RESPONSE_LEN, FileEntry, FileSystemEntry, IndexGroup, LogicalRoot,
};

use crate::client::{AdsFs, require_path};
use crate::cursor::{SearchOption, find_first};
use crate::error::{AdsFsError, AdsFsResult};

/// Pending work of a recursive delete.
enum Step {
    /// Delete the files of a directory and queue its subdirectories.
    Clear(String),
    /// Remove a directory whose contents are gone.
    Remove(String),
}

impl AdsFs {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether `path` names a directory.
    ///
    /// Issues one find on `path/*.*` and looks at the first record (on a
    /// directory that is its `.` entry). The scan handle is closed again; a
    /// zero handle leaves nothing to close and the record still answers.
    #[tracing::instrument(skip(self), name = "fs.directory_exists")]
    pub async fn directory_exists(&self, path: &str, root: LogicalRoot) -> AdsFsResult<bool> {
        require_path(path)?;
        let mut buf = vec![0u8; FIND_RESPONSE_LEN];
        let record = match find_first(&self.link, path, MATCH_ALL, root, &mut buf).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        if let Some(handle) = record.handle {
            self.link.close_find(handle, path).await?;
        }
        Ok(record.entry.is_dir())
    }

    /// All entries below `path`, eagerly collected.
    pub async fn enumerate_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        root: LogicalRoot,
    ) -> AdsFsResult<Vec<FileSystemEntry>> {
        self.enumerate(path, pattern, option, root).collect().await
    }

    /// Full names of the files below `path`.
    pub async fn enumerate_files(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        root: LogicalRoot,
    ) -> AdsFsResult<Vec<String>> {
        Ok(self
            .enumerate_file_entries(path, pattern, option, root)
            .await?
            .into_iter()
            .map(|file| file.info.full_name)
            .collect())
    }

    /// File entries below `path`.
    pub async fn enumerate_file_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        root: LogicalRoot,
    ) -> AdsFsResult<Vec<FileEntry>> {
        Ok(self
            .enumerate_entries(path, pattern, option, root)
            .await?
            .into_iter()
            .filter_map(FileSystemEntry::into_file)
            .collect())
    }

    /// Full names of the directories below `path`.
    pub async fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        root: LogicalRoot,
    ) -> AdsFsResult<Vec<String>> {
        Ok(self
            .enumerate_directory_entries(path, pattern, option, root)
            .await?
            .into_iter()
            .map(|dir| dir.info.full_name)
            .collect())
    }

    /// Directory entries below `path`.
    pub async fn enumerate_directory_entries(
        &self,
        path: &str,
        pattern: &str,
        option: SearchOption,
        root: LogicalRoot,
    ) -> AdsFsResult<Vec<DirectoryEntry>> {
        Ok(self
            .enumerate_entries(path, pattern, option, root)
            .await?
            .into_iter()
            .filter_map(FileSystemEntry::into_directory)
            .collect())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a directory.
    #[tracing::instrument(skip(self), name = "fs.create_directory")]
    pub async fn create_directory(&self, path: &str, root: LogicalRoot) -> AdsFsResult<()> {
        require_path(path)?;
        let request = encode_path(path)?;
        self.link
            .write(IndexGroup::MakeDirectory, root.path_offset(), &request, path)
            .await
    }

    /// Delete a directory.
    ///
    /// Without `recursive` a directory that has any entry fails with
    /// `DirectoryNotEmpty` and nothing is removed. With it, files are deleted
    /// and subdirectories emptied and removed depth-first before `path`
    /// itself. Not transactional: a failure leaves whatever was already
    /// deleted deleted.
    #[tracing::instrument(skip(self), name = "fs.delete_directory")]
    pub async fn delete_directory(
        &self,
        path: &str,
        recursive: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<()> {
        require_path(path)?;
        if !self.directory_exists(path, root).await? {
            return Err(AdsFsError::not_found(path));
        }

        if recursive {
            self.clear_contents(path, root).await?;
        } else {
            let mut cursor = self.enumerate(path, MATCH_ALL, SearchOption::TopDirectoryOnly, root);
            if cursor.next().await?.is_some() {
                if let Err(e) = cursor.close().await {
                    tracing::warn!(path, error = %e, "failed to close scan of non-empty directory");
                }
                return Err(AdsFsError::directory_not_empty(path));
            }
        }

        self.remove_directory(path, root).await
    }

    /// Delete everything inside `path` but keep the directory. An empty path
    /// names the root itself.
    #[tracing::instrument(skip(self), name = "fs.clean_directory")]
    pub async fn clean_directory(&self, path: &str, root: LogicalRoot) -> AdsFsResult<()> {
        if !path.is_empty() && !self.directory_exists(path, root).await? {
            return Err(AdsFsError::not_found(path));
        }
        self.clear_contents(path, root).await
    }

    /// Rename (or move within `root`) a directory. `to` is a full path.
    #[tracing::instrument(skip(self), name = "fs.rename_directory")]
    pub async fn rename_directory(
        &self,
        from: &str,
        to: &str,
        overwrite: bool,
        root: LogicalRoot,
    ) -> AdsFsResult<()> {
        self.rename_entry(from, to, overwrite, root).await
    }

    /// Depth-first removal of everything below `path`.
    async fn clear_contents(&self, path: &str, root: LogicalRoot) -> AdsFsResult<()> {
        let mut stack = vec![Step::Clear(path.to_string())];
        while let Some(step) = stack.pop() {
            match step {
                Step::Clear(dir) => {
                    let entries = self
                        .enumerate(&dir, MATCH_ALL, SearchOption::TopDirectoryOnly, root)
                        .collect()
                        .await?;
                    let mut subdirs = Vec::new();
                    for entry in entries {
                        match entry {
                            FileSystemEntry::File(file) => {
                                self.delete_file(&file.info.full_name, root).await?;
                            }
                            FileSystemEntry::Directory(sub) => subdirs.push(sub.info.full_name),
                        }
                    }
                    for sub in subdirs.into_iter().rev() {
                        stack.push(Step::Remove(sub.clone()));
                        stack.push(Step::Clear(sub));
                    }
                }
                Step::Remove(dir) => self.remove_directory(&dir, root).await?,
            }
        }
        Ok(())
    }

    async fn remove_directory(&self, path: &str, root: LogicalRoot) -> AdsFsResult<()> {
        let request = encode_path(path)?;
        self.link
            .read_write(
                IndexGroup::RemoveDirectory,
                root.path_offset(),
                &mut [],
                &request,
                path,
            )
            .await?;
        tracing::debug!(path, %root, "removed directory");
        Ok(())
    }

    // ========================================================================
    // Boot folder
    // ========================================================================

    /// Create a directory under the boot directory.
    pub async fn create_directory_in_boot_folder(&self, path: &str) -> AdsFsResult<()> {
        self.create_directory(path, LogicalRoot::BootDir).await
    }

    /// Delete a directory under the boot directory.
    pub async fn delete_directory_in_boot_folder(
        &self,
        path: &str,
        recursive: bool,
    ) -> AdsFsResult<()> {
        self.delete_directory(path, recursive, LogicalRoot::BootDir).await
    }

    /// Delete everything in the boot directory.
    pub async fn clean_up_boot_folder(&self) -> AdsFsResult<()> {
        self.clean_directory("", LogicalRoot::BootDir).await
    }
}
