//! Remote file system over the ADS system service.
//!
//! This crate turns three indexed substrate primitives (Read, Write,
//! ReadWrite) into a file-system client for one target.
//! Key components:
//!
//! - [`AdsTransport`] - The consumed substrate (connection lives behind it)
//! - [`AdsFs`] - Entry point: files, directories, enumeration, transfers
//! - [`EntryCursor`] - Lazy directory enumeration holding find handles
//! - [`RemoteFile`] - Open file handle with chunked reads and writes
//! - [`MemoryTarget`] - In-memory target (for testing)
//!
//! ## Design Decisions
//!
//! - **Single-shot calls**: every round trip is attempted once. Nothing here
//!   retries; composites are not transactional.
//! - **Handles are always released**: success, error and cancellation paths
//!   close every find and file handle they opened. Dropped cursors and files
//!   release theirs in the background.
//! - **Cooperative cancellation**: a `CancellationToken` is checked before
//!   each round trip, never in the middle of one.
//! - **Root per call**: every operation names its [`LogicalRoot`]; paths are
//!   interpreted relative to it by the target.
//!
//! ```no_run
//! use adsfs_client::{AdsFs, LogicalRoot, MemoryTarget, SearchOption};
//!
//! # async fn demo() -> adsfs_client::AdsFsResult<()> {
//! let fs = AdsFs::new(MemoryTarget::new());
//! fs.write_all_bytes("Port_851.app", b"...", LogicalRoot::BootDir).await?;
//! for name in fs
//!     .enumerate_files("", "*.*", SearchOption::AllDirectories, LogicalRoot::BootDir)
//!     .await?
//! {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
mod client;
mod config;
mod cursor;
mod directory;
mod error;
mod file;
mod files;
mod transfer;
mod transport;

pub use backends::{Fault, MemoryTarget};
pub use client::AdsFs;
pub use config::{DEFAULT_CHUNK_SIZE, FsConfig, WriteOptions};
pub use cursor::{EntryCursor, SearchOption};
pub use error::{AdsFsError, AdsFsResult, ErrorKind};
pub use file::RemoteFile;
pub use transport::{AdsTransport, SubstrateError};

pub use adsfs_types::{
    AdsErrorCode, DirectoryEntry, EntryInfo, FileAttributes, FileEntry, FileHandle,
    FileSystemEntry, FindHandle, IndexGroup, LogicalRoot, OpenMode,
};
