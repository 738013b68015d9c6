//! Directory enumeration cursor.
//!
//! A scan is a chain of find calls: the first call carries the search path
//! and returns a record plus a handle; every following call passes the
//! previous handle as the index offset. The remote side answers
//! DeviceNotFound when the scan is exhausted, after which the handle is
//! released with a close-handle write.
//!
//! Recursive enumeration keeps a stack of open scans. When a directory is
//! yielded its child scan is pushed, so the directory's contents follow it
//! before the parent scan continues (pre-order).

use adsfs_types::path::{MATCH_ALL, encode_search};
use adsfs_types::record::peek_handle;
use adsfs_types::{FIND_RESPONSE_LEN, FileSystemEntry, FindHandle, FindRecord, IndexGroup, LogicalRoot};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{AdsFsError, AdsFsResult};
use crate::transport::Link;

/// How far an enumeration descends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOption {
    /// Only the named directory.
    #[default]
    TopDirectoryOnly,
    /// The named directory and every directory below it.
    AllDirectories,
}

/// Issue the first find call of a scan of `path`.
///
/// The returned record's handle must be closed by the caller. A reply that
/// fails to decode has its handle closed here.
pub(crate) async fn find_first(
    link: &Link,
    path: &str,
    pattern: &str,
    root: LogicalRoot,
    buf: &mut [u8],
) -> AdsFsResult<FindRecord> {
    let request = encode_search(path, pattern)?;
    let filled = link
        .read_write(IndexGroup::FileFind, root.path_offset(), buf, &request, path)
        .await?;
    match FindRecord::decode(&buf[..filled], path) {
        Ok(record) => Ok(record),
        Err(e) => {
            if let Some(handle) = peek_handle(&buf[..filled]) {
                link.close_finds_quietly(vec![(handle, path.to_string())]).await;
            }
            Err(e.into())
        }
    }
}

fn matches_everything(pattern: &str) -> bool {
    pattern == MATCH_ALL || pattern == "*"
}

/// One open scan on the worklist.
#[derive(Debug)]
struct Scan {
    path: String,
    /// `None` until the first call has returned.
    handle: Option<FindHandle>,
    depth: usize,
}

/// Lazy, exclusively owned directory enumeration.
///
/// Pull entries with [`next`](Self::next) or adapt with
/// [`into_stream`](Self::into_stream). Any error ends the enumeration and
/// releases every find handle the cursor still holds. Dropping a cursor
/// early releases its handles in the background.
#[derive(Debug)]
pub struct EntryCursor {
    link: Link,
    root: LogicalRoot,
    pattern: String,
    recursive: bool,
    max_depth: Option<usize>,
    scans: Vec<Scan>,
    buf: Vec<u8>,
    done: bool,
}

impl EntryCursor {
    pub(crate) fn new(
        link: Link,
        path: &str,
        pattern: &str,
        option: SearchOption,
        max_depth: Option<usize>,
        root: LogicalRoot,
    ) -> Self {
        Self {
            link,
            root,
            pattern: pattern.to_string(),
            recursive: option == SearchOption::AllDirectories,
            max_depth,
            scans: vec![Scan {
                path: path.to_string(),
                handle: None,
                depth: 0,
            }],
            buf: vec![0u8; FIND_RESPONSE_LEN],
            done: false,
        }
    }

    /// Number of find handles currently held.
    pub fn open_handles(&self) -> usize {
        self.scans.iter().filter(|scan| scan.handle.is_some()).count()
    }

    /// Next entry, or `None` once every scan is exhausted.
    pub async fn next(&mut self) -> AdsFsResult<Option<FileSystemEntry>> {
        if self.done {
            return Ok(None);
        }
        match self.advance().await {
            Ok(Some(entry)) => Ok(Some(entry)),
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                let handles = self.take_open_handles();
                if !handles.is_empty() {
                    tracing::debug!(count = handles.len(), error = %e, "enumeration aborted; closing scans");
                }
                self.link.close_finds_quietly(handles).await;
                Err(e)
            }
        }
    }

    async fn advance(&mut self) -> AdsFsResult<Option<FileSystemEntry>> {
        loop {
            let Some(index) = self.scans.len().checked_sub(1) else {
                return Ok(None);
            };

            let (offset, request) = match self.scans[index].handle {
                None => (
                    self.root.path_offset(),
                    encode_search(&self.scans[index].path, &self.pattern)?,
                ),
                Some(handle) => (handle.offset(), Vec::new()),
            };

            let result = self
                .link
                .read_write(
                    IndexGroup::FileFind,
                    offset,
                    &mut self.buf,
                    &request,
                    &self.scans[index].path,
                )
                .await;

            let filled = match result {
                Ok(filled) => filled,
                Err(e) if e.is_not_found() => {
                    self.finish_scan(index, e).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let scan = &mut self.scans[index];
            let record = match FindRecord::decode(&self.buf[..filled], &scan.path) {
                Ok(record) => record,
                Err(e) => {
                    // A first call that was answered still opened a scan.
                    if scan.handle.is_none() {
                        scan.handle = peek_handle(&self.buf[..filled]);
                    }
                    return Err(e.into());
                }
            };
            let handle = record
                .handle
                .ok_or_else(|| AdsFsError::invalid_handle(scan.path.clone()))?;
            scan.handle = Some(handle);

            let entry = record.entry;
            if entry.is_dot_entry() {
                continue;
            }

            let child_depth = scan.depth + 1;
            if self.recursive
                && entry.is_dir()
                && self.max_depth.is_none_or(|max| child_depth <= max)
            {
                self.scans.push(Scan {
                    path: entry.full_name().to_string(),
                    handle: None,
                    depth: child_depth,
                });
            }
            return Ok(Some(entry));
        }
    }

    /// Pop a scan that answered DeviceNotFound.
    ///
    /// A scan whose first call answers DeviceNotFound has nothing matching
    /// the pattern. Nested directories were just observed to exist and count
    /// as empty. For the top-level path the answer is ambiguous under a
    /// narrowing pattern, so a match-all find decides between an empty
    /// listing and a missing directory.
    async fn finish_scan(&mut self, index: usize, not_found: AdsFsError) -> AdsFsResult<()> {
        let scan = self.scans.remove(index);
        match scan.handle {
            Some(handle) => self.link.close_find(handle, &scan.path).await,
            None if scan.depth == 0 => {
                if matches_everything(&self.pattern) {
                    return Err(not_found);
                }
                let record =
                    find_first(&self.link, &scan.path, MATCH_ALL, self.root, &mut self.buf).await?;
                if let Some(handle) = record.handle {
                    self.link.close_find(handle, &scan.path).await?;
                }
                tracing::trace!(path = %scan.path, pattern = %self.pattern, "no entries match");
                Ok(())
            }
            None => {
                tracing::trace!(path = %scan.path, "nested scan found nothing");
                Ok(())
            }
        }
    }

    fn take_open_handles(&mut self) -> Vec<(FindHandle, String)> {
        self.scans
            .drain(..)
            .filter_map(|scan| scan.handle.map(|handle| (handle, scan.path)))
            .collect()
    }

    /// Stop early and close every held handle.
    ///
    /// Returns the first close failure; the remaining handles are still
    /// attempted.
    pub async fn close(mut self) -> AdsFsResult<()> {
        self.done = true;
        let mut first_error = None;
        for (handle, path) in self.take_open_handles().into_iter().rev() {
            if let Err(e) = self.link.close_find(handle, &path).await {
                tracing::warn!(%handle, path = %path, error = %e, "failed to close find handle");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Drain the remaining entries.
    pub async fn collect(mut self) -> AdsFsResult<Vec<FileSystemEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Adapt into a stream. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = AdsFsResult<FileSystemEntry>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut cursor = state?;
            match cursor.next().await {
                Ok(Some(entry)) => Some((Ok(entry), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl Drop for EntryCursor {
    fn drop(&mut self) {
        let handles = self.take_open_handles();
        self.link.release_finds_in_background(handles);
    }
}
