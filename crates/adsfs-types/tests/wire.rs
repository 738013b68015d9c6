//! Wire-level checks: what a request buffer carries is what a target decodes,
//! and what a target encodes is what a client decodes.

use adsfs_types::path::{decode_latin1, encode_path, encode_rename, encode_search, split_nul_terminated};
use adsfs_types::record::{RawRecord, encode_record};
use adsfs_types::{
    FIND_RESPONSE_LEN, FileAttributes, FindRecord, LogicalRoot, OpenMode, RECORD_LEN, index_offset,
    rename_offset,
};

#[test]
fn test_search_request_echoes_path_and_pattern() {
    for (path, pattern) in [
        ("C:\\TwinCAT\\3.1\\Boot", "*.*"),
        ("/usr/local/data", "*.xml"),
        ("Plc", "Port_85?.app"),
        ("", "*.*"),
    ] {
        let request = encode_search(path, pattern).unwrap();
        assert_eq!(request.last(), Some(&0));
        assert_eq!(request.iter().filter(|&&b| b == 0).count(), 1);

        let echoed = decode_latin1(&request);
        assert!(echoed.starts_with(path), "{echoed} should start with {path}");
        assert!(echoed.ends_with(pattern), "{echoed} should end with {pattern}");
    }
}

#[test]
fn test_latin1_names_survive() {
    let request = encode_path("Größe/Übersicht.txt").unwrap();
    assert_eq!(request.len(), "Größe/Übersicht.txt".chars().count() + 1);
    assert_eq!(decode_latin1(&request), "Größe/Übersicht.txt");

    assert!(encode_path("日本").is_err());
}

#[test]
fn test_rename_request_splits_back() {
    let request = encode_rename("old/a.txt", "new/b.txt").unwrap();
    assert_eq!(split_nul_terminated(&request), vec!["old/a.txt", "new/b.txt"]);
}

#[test]
fn test_find_record_through_the_wire() {
    let raw = RawRecord {
        handle: 7,
        attributes: FileAttributes::ARCHIVE.bits(),
        creation_time: 133_485_408_000_000_000,
        last_access_time: 133_485_408_010_000_000,
        last_write_time: 133_485_408_020_000_000,
        size: 4096,
        name: "Port_851.app".to_string(),
        alternate_name: String::new(),
    };
    let buf = encode_record(&raw).unwrap();
    assert_eq!(buf.len(), FIND_RESPONSE_LEN);

    let record = FindRecord::decode(&buf, "Boot\\Plc").unwrap();
    assert_eq!(record.handle.map(|h| h.raw()), Some(7));
    assert!(record.entry.is_file());
    assert_eq!(record.entry.size(), Some(4096));
    assert_eq!(record.entry.full_name(), "Boot\\Plc\\Port_851.app");
    assert!(record.entry.info().modified > record.entry.info().created);

    let err = FindRecord::decode(&buf[..RECORD_LEN - 1], "Boot").unwrap_err();
    assert!(err.to_string().contains(&RECORD_LEN.to_string()));
}

#[test]
fn test_directory_bit_selects_variant() {
    let raw = RawRecord {
        handle: 1,
        attributes: (FileAttributes::DIRECTORY | FileAttributes::HIDDEN).bits(),
        size: 99,
        name: "sub".to_string(),
        ..RawRecord::default()
    };
    let record = FindRecord::decode(&encode_record(&raw).unwrap(), "w").unwrap();
    assert!(record.entry.is_dir());
    assert_eq!(record.entry.size(), None);
    assert!(record.entry.info().attributes.contains(FileAttributes::HIDDEN));
}

#[test]
fn test_zero_handle_decodes_as_none() {
    let raw = RawRecord {
        name: "x".to_string(),
        ..RawRecord::default()
    };
    let record = FindRecord::decode(&encode_record(&raw).unwrap(), "").unwrap();
    assert!(record.handle.is_none());
    assert_eq!(record.entry.full_name(), "x");
}

#[test]
fn test_offsets_carry_root_and_mode() {
    let offset = index_offset(OpenMode::write_binary(), LogicalRoot::BootDir);
    assert_eq!(offset >> 16, 4);
    assert_eq!(offset & 0xFFFF, OpenMode::write_binary().bits());

    assert_eq!(rename_offset(true, LogicalRoot::Generic) & 0xFFFF, OpenMode::OVERWRITE.bits());
    assert_ne!(rename_offset(false, LogicalRoot::Generic) & 0xFFFF, OpenMode::OVERWRITE.bits());
    assert_eq!(rename_offset(false, LogicalRoot::ConfigDir) >> 16, 6);
}
