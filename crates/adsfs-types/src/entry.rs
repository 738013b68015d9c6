//! Decoded file-system entries.
//!
//! Entries are immutable value objects built once from a find record. They
//! do not track remote state; a later existence check needs a fresh call.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Attribute bits reported by the remote side.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FileAttributes: u32 {
        const READ_ONLY = 0x0001;
        const HIDDEN = 0x0002;
        const SYSTEM = 0x0004;
        const DIRECTORY = 0x0010;
        const ARCHIVE = 0x0020;
        const DEVICE = 0x0040;
        const NORMAL = 0x0080;
        const TEMPORARY = 0x0100;
        const COMPRESSED = 0x0800;
    }
}

/// 100 ns ticks between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;

/// Convert a remote FILETIME (100 ns ticks since 1601 UTC) to `SystemTime`.
pub fn filetime_to_system_time(ticks: i64) -> SystemTime {
    let since_unix = i128::from(ticks) - i128::from(FILETIME_UNIX_OFFSET);
    let nanos = since_unix.unsigned_abs() * 100;
    let delta = Duration::new(
        (nanos / 1_000_000_000) as u64,
        (nanos % 1_000_000_000) as u32,
    );
    if since_unix >= 0 {
        UNIX_EPOCH + delta
    } else {
        UNIX_EPOCH - delta
    }
}

/// Convert a `SystemTime` to a remote FILETIME.
pub fn system_time_to_filetime(time: SystemTime) -> i64 {
    let ticks = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (after.as_nanos() / 100) as i64,
        Err(before) => -((before.duration().as_nanos() / 100) as i64),
    };
    ticks + FILETIME_UNIX_OFFSET
}

/// Fields shared by every entry variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Entry name (not full path).
    pub name: String,
    /// Scanned path joined with the name.
    pub full_name: String,
    /// Short (8.3) name, often empty.
    pub alternate_name: String,
    /// Attribute bits.
    pub attributes: FileAttributes,
    /// Creation time.
    pub created: SystemTime,
    /// Last access time.
    pub accessed: SystemTime,
    /// Last write time.
    pub modified: SystemTime,
}

impl EntryInfo {
    /// Creation time in the local calendar.
    pub fn created_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.created)
    }

    /// Last access time in the local calendar.
    pub fn accessed_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.accessed)
    }

    /// Last write time in the local calendar.
    pub fn modified_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.modified)
    }
}

/// A directory found by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub info: EntryInfo,
}

/// A file found by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub info: EntryInfo,
    /// Size in bytes.
    pub size: u64,
}

/// Entry produced by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSystemEntry {
    Directory(DirectoryEntry),
    File(FileEntry),
}

impl FileSystemEntry {
    /// Shared fields.
    pub fn info(&self) -> &EntryInfo {
        match self {
            FileSystemEntry::Directory(dir) => &dir.info,
            FileSystemEntry::File(file) => &file.info,
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Scanned path joined with the name.
    pub fn full_name(&self) -> &str {
        &self.info().full_name
    }

    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileSystemEntry::Directory(_))
    }

    /// Returns true for files.
    pub fn is_file(&self) -> bool {
        matches!(self, FileSystemEntry::File(_))
    }

    /// Size for files, `None` for directories.
    pub fn size(&self) -> Option<u64> {
        match self {
            FileSystemEntry::Directory(_) => None,
            FileSystemEntry::File(file) => Some(file.size),
        }
    }

    /// Returns the file variant, if this is one.
    pub fn into_file(self) -> Option<FileEntry> {
        match self {
            FileSystemEntry::File(file) => Some(file),
            FileSystemEntry::Directory(_) => None,
        }
    }

    /// Returns the directory variant, if this is one.
    pub fn into_directory(self) -> Option<DirectoryEntry> {
        match self {
            FileSystemEntry::Directory(dir) => Some(dir),
            FileSystemEntry::File(_) => None,
        }
    }

    /// True for the `.` and `..` pseudo entries.
    pub fn is_dot_entry(&self) -> bool {
        matches!(self.name(), "." | "..")
    }
}
