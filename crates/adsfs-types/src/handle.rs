//! Remote handle newtypes.
//!
//! File handles and find handles live in different remote handle spaces; the
//! distinct types keep them from being mixed up. Zero is never a valid handle.

use std::fmt;

/// Handle returned by a file open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle(u32);

impl FileHandle {
    /// Wrap a raw handle, rejecting zero.
    pub fn new(raw: u32) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Raw value, used as the index offset of read/write/close.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Handle carried in a find record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FindHandle(u16);

impl FindHandle {
    /// Wrap a raw handle, rejecting zero.
    pub fn new(raw: u16) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Raw value as stored in the record.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// Index offset for a find-next call.
    pub fn offset(self) -> u32 {
        u32::from(self.0)
    }

    /// Payload of the close-handle write: the handle as u32 little-endian.
    pub fn close_payload(self) -> [u8; 4] {
        u32::from(self.0).to_le_bytes()
    }
}

impl fmt::Display for FindHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "find#{}", self.0)
    }
}
