//! Path encoding for request buffers.
//!
//! Paths travel as 8-bit characters followed by a single NUL. No escaping is
//! performed; the remote side receives raw bytes up to the terminator.

use crate::error::{CodecError, CodecResult};

/// Default search pattern matching every entry.
pub const MATCH_ALL: &str = "*.*";

/// Join a remote base path and a child name.
///
/// An empty base yields the name itself. A base that already ends in a
/// separator is concatenated directly. Otherwise the base's own separator
/// style is kept: backslash when the base only uses backslashes, else `/`.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    if base.ends_with('/') || base.ends_with('\\') {
        return format!("{base}{name}");
    }
    let separator = if base.contains('\\') && !base.contains('/') {
        '\\'
    } else {
        '/'
    };
    format!("{base}{separator}{name}")
}

/// Last component of a remote path.
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Extension of the last path component, including the dot.
///
/// `"a.txt"` gives `".txt"`; `"a"` and `"a."` give `""`.
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(index) if index + 1 < name.len() => &name[index..],
        _ => "",
    }
}

/// Append `text` as 8-bit characters (no terminator).
fn push_latin1(buf: &mut Vec<u8>, text: &str) -> CodecResult<()> {
    for ch in text.chars() {
        let code = u32::from(ch);
        if code == 0 {
            return Err(CodecError::invalid_path(text, "embedded NUL"));
        }
        let byte = u8::try_from(code)
            .map_err(|_| CodecError::invalid_path(text, "character outside 8-bit range"))?;
        buf.push(byte);
    }
    Ok(())
}

/// Encode a path as a NUL-terminated 8-bit buffer. Empty is legal.
pub fn encode_path(path: &str) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(path.len() + 1);
    push_latin1(&mut buf, path)?;
    buf.push(0);
    Ok(buf)
}

/// Encode `join_path(path, pattern)` for a find-first request.
pub fn encode_search(path: &str, pattern: &str) -> CodecResult<Vec<u8>> {
    encode_path(&join_path(path, pattern))
}

/// Encode both rename paths back to back, each NUL-terminated.
pub fn encode_rename(from: &str, to: &str) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(from.len() + to.len() + 2);
    push_latin1(&mut buf, from)?;
    buf.push(0);
    push_latin1(&mut buf, to)?;
    buf.push(0);
    Ok(buf)
}

/// Decode 8-bit text up to the first NUL (or the end of the slice).
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

/// Split a buffer of NUL-terminated strings (used by request decoders).
pub fn split_nul_terminated(bytes: &[u8]) -> Vec<String> {
    let mut parts: Vec<String> = bytes.split(|&b| b == 0).map(decode_latin1).collect();
    if bytes.last() == Some(&0) {
        parts.pop();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "*.*"), "*.*");
        assert_eq!(join_path("/w", "sub"), "/w/sub");
        assert_eq!(join_path("/w/", "sub"), "/w/sub");
        assert_eq!(join_path("C:\\TwinCAT", "Boot"), "C:\\TwinCAT\\Boot");
        assert_eq!(join_path("C:\\TwinCAT\\", "Boot"), "C:\\TwinCAT\\Boot");
        assert_eq!(join_path("C:/mixed\\path", "x"), "C:/mixed\\path/x");
        assert_eq!(join_path("Plc", "Port_851.app"), "Plc/Port_851.app");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("a.txt"), ".txt");
        assert_eq!(extension("dir.d/a"), "");
        assert_eq!(extension("dir/a."), "");
        assert_eq!(extension("C:\\x\\archive.tar.gz"), ".gz");
        assert_eq!(extension(".bashrc"), ".bashrc");
    }

    #[test]
    fn test_encode_path_terminates() {
        assert_eq!(encode_path("").unwrap(), vec![0]);
        assert_eq!(encode_path("ab").unwrap(), vec![b'a', b'b', 0]);
        assert_eq!(encode_path("\u{e9}").unwrap(), vec![0xE9, 0]);
    }

    #[test]
    fn test_encode_rejects_unrepresentable() {
        assert!(encode_path("a\0b").is_err());
        assert!(encode_path("snow\u{2603}").is_err());
    }

    #[test]
    fn test_encode_search() {
        let buf = encode_search("/w", "*.txt").unwrap();
        assert_eq!(buf, b"/w/*.txt\0");
    }

    #[test]
    fn test_encode_rename_layout() {
        let buf = encode_rename("a.txt", "b.txt").unwrap();
        assert_eq!(buf, b"a.txt\0b.txt\0");
        assert_eq!(
            split_nul_terminated(&buf),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
    }

    #[test]
    fn test_latin1_round_trip() {
        for text in ["", "plain", "C:\\TwinCAT\\3.1\\Boot\\*.*", "caf\u{e9} \u{ff}"] {
            let encoded = encode_path(text).unwrap();
            assert_eq!(decode_latin1(&encoded), text);
        }
    }
}
