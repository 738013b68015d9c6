//! Fixed-layout find record codec.
//!
//! A find response is one little-endian record with no padding between
//! fields. The layout is an explicit offset table consumed by pure
//! `decode_record` / `encode_record` functions.
//!
//! | Field          | Offset | Width | Encoding            |
//! |----------------|--------|-------|---------------------|
//! | handle         | 0      | 2     | u16                 |
//! | reserved       | 2      | 2     | u16                 |
//! | attributes     | 4      | 4     | u32                 |
//! | creation time  | 8      | 8     | i64 FILETIME        |
//! | access time    | 16     | 8     | i64 FILETIME        |
//! | write time     | 24     | 8     | i64 FILETIME        |
//! | size           | 32     | 8     | u64                 |
//! | reserved0      | 40     | 4     | u32                 |
//! | reserved1      | 44     | 4     | u32                 |
//! | name           | 48     | 256   | NUL-terminated text |
//! | reserved2      | 304    | 4     | u32                 |
//! | alternate name | 308    | 14    | NUL-terminated text |
//! | reserved3      | 322    | 2     | u16                 |

use crate::entry::{
    filetime_to_system_time, DirectoryEntry, EntryInfo, FileAttributes, FileEntry,
    FileSystemEntry,
};
use crate::error::{CodecError, CodecResult};
use crate::handle::FindHandle;
use crate::path::{decode_latin1, join_path};

/// One field of the record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

const fn field(name: &'static str, offset: usize, width: usize) -> Field {
    Field {
        name,
        offset,
        width,
    }
}

pub const HANDLE: Field = field("handle", 0, 2);
pub const RESERVED: Field = field("reserved", 2, 2);
pub const ATTRIBUTES: Field = field("attributes", 4, 4);
pub const CREATION_TIME: Field = field("creation_time", 8, 8);
pub const ACCESS_TIME: Field = field("last_access_time", 16, 8);
pub const WRITE_TIME: Field = field("last_write_time", 24, 8);
pub const SIZE: Field = field("size", 32, 8);
pub const RESERVED0: Field = field("reserved0", 40, 4);
pub const RESERVED1: Field = field("reserved1", 44, 4);
pub const NAME: Field = field("name", 48, 256);
pub const RESERVED2: Field = field("reserved2", 304, 4);
pub const ALTERNATE_NAME: Field = field("alternate_name", 308, 14);
pub const RESERVED3: Field = field("reserved3", 322, 2);

/// Every field in wire order.
pub const LAYOUT: [Field; 13] = [
    HANDLE,
    RESERVED,
    ATTRIBUTES,
    CREATION_TIME,
    ACCESS_TIME,
    WRITE_TIME,
    SIZE,
    RESERVED0,
    RESERVED1,
    NAME,
    RESERVED2,
    ALTERNATE_NAME,
    RESERVED3,
];

/// Bytes covered by the layout.
pub const RECORD_LEN: usize = RESERVED3.offset + RESERVED3.width;

/// Read buffer requested for each find call.
///
/// The endpoint's native structure is 8-byte aligned, so it occupies the
/// record plus 4 trailing bytes.
pub const FIND_RESPONSE_LEN: usize = RECORD_LEN.next_multiple_of(8);

impl Field {
    fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.offset..self.offset + self.width]
    }

    fn slice_mut<'a>(&self, buf: &'a mut [u8]) -> &'a mut [u8] {
        &mut buf[self.offset..self.offset + self.width]
    }

    fn u16(&self, buf: &[u8]) -> u16 {
        u16::from_le_bytes([buf[self.offset], buf[self.offset + 1]])
    }

    fn u32(&self, buf: &[u8]) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.slice(buf));
        u32::from_le_bytes(bytes)
    }

    fn u64(&self, buf: &[u8]) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.slice(buf));
        u64::from_le_bytes(bytes)
    }

    fn i64(&self, buf: &[u8]) -> i64 {
        self.u64(buf) as i64
    }

    fn text(&self, buf: &[u8]) -> String {
        decode_latin1(self.slice(buf))
    }
}

/// Raw record contents, before the entry variant is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub handle: u16,
    pub attributes: u32,
    pub creation_time: i64,
    pub last_access_time: i64,
    pub last_write_time: i64,
    pub size: u64,
    pub name: String,
    pub alternate_name: String,
}

/// Decode the fields of one record. Rejects short buffers.
pub fn decode_raw(buf: &[u8]) -> CodecResult<RawRecord> {
    if buf.len() < RECORD_LEN {
        return Err(CodecError::ShortRecord {
            expected: RECORD_LEN,
            actual: buf.len(),
        });
    }
    Ok(RawRecord {
        handle: HANDLE.u16(buf),
        attributes: ATTRIBUTES.u32(buf),
        creation_time: CREATION_TIME.i64(buf),
        last_access_time: ACCESS_TIME.i64(buf),
        last_write_time: WRITE_TIME.i64(buf),
        size: SIZE.u64(buf),
        name: NAME.text(buf),
        alternate_name: ALTERNATE_NAME.text(buf),
    })
}

/// Encode a record into a `FIND_RESPONSE_LEN` buffer.
///
/// Reserved fields and padding are zero. Names must leave room for their
/// terminator and be representable as 8-bit text.
pub fn encode_record(record: &RawRecord) -> CodecResult<Vec<u8>> {
    let mut buf = vec![0u8; FIND_RESPONSE_LEN];
    HANDLE
        .slice_mut(&mut buf)
        .copy_from_slice(&record.handle.to_le_bytes());
    ATTRIBUTES
        .slice_mut(&mut buf)
        .copy_from_slice(&record.attributes.to_le_bytes());
    CREATION_TIME
        .slice_mut(&mut buf)
        .copy_from_slice(&record.creation_time.to_le_bytes());
    ACCESS_TIME
        .slice_mut(&mut buf)
        .copy_from_slice(&record.last_access_time.to_le_bytes());
    WRITE_TIME
        .slice_mut(&mut buf)
        .copy_from_slice(&record.last_write_time.to_le_bytes());
    SIZE.slice_mut(&mut buf)
        .copy_from_slice(&record.size.to_le_bytes());
    write_text(NAME, &mut buf, &record.name)?;
    write_text(ALTERNATE_NAME, &mut buf, &record.alternate_name)?;
    Ok(buf)
}

fn write_text(field: Field, buf: &mut [u8], text: &str) -> CodecResult<()> {
    let encoded = crate::path::encode_path(text)?;
    if encoded.len() > field.width {
        return Err(CodecError::NameTooLong {
            name: text.to_string(),
            width: field.width,
        });
    }
    field.slice_mut(buf)[..encoded.len()].copy_from_slice(&encoded);
    Ok(())
}

/// Handle carried by a find response, even one too short to decode.
///
/// A short reply still allocated a scan on the remote side; its handle has
/// to be released.
pub fn peek_handle(buf: &[u8]) -> Option<FindHandle> {
    if buf.len() < HANDLE.offset + HANDLE.width {
        return None;
    }
    FindHandle::new(HANDLE.u16(buf))
}

/// One decoded find response: the entry plus the handle for the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRecord {
    /// Handle to pass as the offset of the next find call. `None` if the
    /// remote side returned zero.
    pub handle: Option<FindHandle>,
    pub entry: FileSystemEntry,
}

impl FindRecord {
    /// Decode a find response scanned under `path`.
    ///
    /// The directory attribute bit selects the entry variant; only files keep
    /// the size field. The full name is `path` joined with the entry name.
    pub fn decode(buf: &[u8], path: &str) -> CodecResult<Self> {
        let raw = decode_raw(buf)?;
        let attributes = FileAttributes::from_bits_retain(raw.attributes);
        let info = EntryInfo {
            full_name: join_path(path, &raw.name),
            name: raw.name,
            alternate_name: raw.alternate_name,
            attributes,
            created: filetime_to_system_time(raw.creation_time),
            accessed: filetime_to_system_time(raw.last_access_time),
            modified: filetime_to_system_time(raw.last_write_time),
        };
        let entry = if attributes.contains(FileAttributes::DIRECTORY) {
            FileSystemEntry::Directory(DirectoryEntry { info })
        } else {
            FileSystemEntry::File(FileEntry {
                info,
                size: raw.size,
            })
        };
        Ok(Self {
            handle: FindHandle::new(raw.handle),
            entry,
        })
    }
}
