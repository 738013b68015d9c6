//! File open modes and index-offset composition.

use bitflags::bitflags;

use crate::root::LogicalRoot;

bitflags! {
    /// Flags sent in the lower 16 bits of an open or rename offset.
    ///
    /// `BINARY` and `TEXT` are mutually exclusive in intent; the encoding does
    /// not enforce it, so callers pick exactly one.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenMode: u32 {
        /// Open for reading.
        const READ = 0x0001;
        /// Open for writing (create or truncate).
        const WRITE = 0x0002;
        /// Open for appending (create if missing).
        const APPEND = 0x0004;
        /// Read and write (`r+`, `w+`, `a+`).
        const PLUS = 0x0008;
        /// Binary transfer.
        const BINARY = 0x0010;
        /// Text transfer.
        const TEXT = 0x0020;
        /// Create missing parent directories.
        const ENSURE_DIRECTORY = 0x0040;
        /// Allow opening directories.
        const ENABLE_DIRECTORY = 0x0080;
        /// Replace an existing destination.
        const OVERWRITE = 0x0100;
    }
}

/// Standard access flags; rename without overwrite sends their complement.
const STANDARD_FLAGS: u32 = OpenMode::READ.bits()
    | OpenMode::WRITE.bits()
    | OpenMode::APPEND.bits()
    | OpenMode::PLUS.bits()
    | OpenMode::BINARY.bits()
    | OpenMode::TEXT.bits();

/// "None of the standard flags" sentinel used by rename when not overwriting.
pub const RENAME_NO_FLAGS: u32 = !STANDARD_FLAGS & 0xFFFF;

impl OpenMode {
    /// `READ | BINARY`, used for downloads, copies and existence checks.
    pub fn read_binary() -> Self {
        Self::READ | Self::BINARY
    }

    /// `WRITE | BINARY`, used for uploads and copy destinations.
    pub fn write_binary() -> Self {
        Self::WRITE | Self::BINARY
    }

    /// `APPEND | BINARY`.
    pub fn append_binary() -> Self {
        Self::APPEND | Self::BINARY
    }
}

/// Compose `root << 16 | mode` for open-style calls.
pub fn index_offset(mode: OpenMode, root: LogicalRoot) -> u32 {
    root.mode_bits() | (mode.bits() & 0xFFFF)
}

/// Offset for a rename: `OVERWRITE` or the no-flags sentinel, OR the root.
pub fn rename_offset(overwrite: bool, root: LogicalRoot) -> u32 {
    let flags = if overwrite {
        OpenMode::OVERWRITE.bits()
    } else {
        RENAME_NO_FLAGS
    };
    root.mode_bits() | flags
}
