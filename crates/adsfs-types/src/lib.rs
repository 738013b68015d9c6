//! Wire-level types for the ADS file service.
//!
//! This crate is the protocol foundation: logical roots, open modes, the
//! index-group table, ADS error codes, the path/mode encoder and the
//! fixed-layout find-record codec. It performs **no I/O** and has no async
//! dependencies. `adsfs-client` builds the request/response protocol on top.
//!
//! # Key Types
//!
//! |---------------------|------------------------------------------------|
//! | Type                | Purpose                                        |
//! |---------------------|------------------------------------------------|
//! | [`LogicalRoot`]     | Which predefined remote folder a path is under |
//! | [`OpenMode`]        | File open flags (lower 16 bits of the offset)  |
//! | [`IndexGroup`]      | Which system-service operation is addressed    |
//! | [`AdsErrorCode`]    | Raw status code reported by the substrate      |
//! | [`FileSystemEntry`] | Decoded directory or file entry                |
//! | [`FindRecord`]      | One find response: entry plus next handle      |
//! | [`FileHandle`]      | Handle from a file open                        |
//! | [`FindHandle`]      | Handle from a directory find                   |
//! |---------------------|------------------------------------------------|

mod entry;
mod error;
mod group;
mod handle;
mod mode;
pub mod path;
pub mod record;
mod root;
mod status;

pub use entry::{
    filetime_to_system_time, system_time_to_filetime, DirectoryEntry, EntryInfo, FileAttributes,
    FileEntry, FileSystemEntry,
};
pub use error::{CodecError, CodecResult};
pub use group::IndexGroup;
pub use handle::{FileHandle, FindHandle};
pub use mode::{index_offset, rename_offset, OpenMode, RENAME_NO_FLAGS};
pub use record::{FindRecord, FIND_RESPONSE_LEN, RECORD_LEN};
pub use root::LogicalRoot;
pub use status::{AdsErrorCode, ErrorClass};
