//! System-service index groups.
//!
//! The numeric values are a compatibility contract with existing endpoints
//! and must not change.

use strum::{Display, EnumIter};

/// Index group addressing one system-service file operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[repr(u32)]
pub enum IndexGroup {
    /// Open or create by name.
    OpenCreate = 100,
    /// Open for reading by name.
    OpenRead = 101,
    /// Open for writing by name.
    OpenWrite = 102,
    /// Create a file.
    CreateFile = 110,
    /// Release a find handle.
    CloseHandle = 111,
    /// Open a file, returning a handle.
    FileOpen = 120,
    /// Close a file handle.
    FileClose = 121,
    /// Read the next chunk from a file handle.
    FileRead = 122,
    /// Write a chunk to a file handle.
    FileWrite = 123,
    /// End-of-file query.
    FileEof = 130,
    /// Delete a file.
    FileDelete = 131,
    /// Rename a file or directory.
    FileRename = 132,
    /// Find first / find next directory entry.
    FileFind = 133,
    /// Create a directory.
    MakeDirectory = 138,
    /// Remove an empty directory.
    RemoveDirectory = 139,
}

impl IndexGroup {
    /// The raw group value sent to the substrate.
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Look up a group by its raw value.
    pub fn from_value(value: u32) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|group| group.value() == value)
    }
}

impl From<IndexGroup> for u32 {
    fn from(group: IndexGroup) -> Self {
        group.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(IndexGroup::CloseHandle.value(), 111);
        assert_eq!(IndexGroup::FileOpen.value(), 120);
        assert_eq!(IndexGroup::FileClose.value(), 121);
        assert_eq!(IndexGroup::FileRead.value(), 122);
        assert_eq!(IndexGroup::FileWrite.value(), 123);
        assert_eq!(IndexGroup::FileDelete.value(), 131);
        assert_eq!(IndexGroup::FileRename.value(), 132);
        assert_eq!(IndexGroup::FileFind.value(), 133);
        assert_eq!(IndexGroup::MakeDirectory.value(), 138);
        assert_eq!(IndexGroup::RemoveDirectory.value(), 139);
    }

    #[test]
    fn test_from_value() {
        assert_eq!(IndexGroup::from_value(133), Some(IndexGroup::FileFind));
        assert_eq!(IndexGroup::from_value(134), None);
        assert_eq!(IndexGroup::FileFind.to_string(), "file_find");
    }
}
