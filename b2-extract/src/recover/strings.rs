//! Length-prefixed string reader
//!
//! Asset headers encode strings with a signed code-unit count: positive
//! means UTF-8 bytes, negative means UTF-16 code units; a trailing NUL
//! is trimmed. Both the summary parser and the name-table scan go
//! through this one reader.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

/// Strings longer than this are treated as garbage from a corrupt header.
const MAX_CODE_UNITS: i64 = 65_536;

/// Read one length-prefixed string; `None` on truncation, a garbage
/// length, or an undecodable payload.
pub(crate) fn read_prefixed_string<R: Read>(reader: &mut R) -> Option<String> {
    let len = reader.read_i32::<LittleEndian>().ok()?;
    if len == 0 {
        return Some(String::new());
    }

    let units = i64::from(len).unsigned_abs();
    if units > MAX_CODE_UNITS as u64 {
        return None;
    }

    if len > 0 {
        let mut buf = vec![0u8; units as usize];
        reader.read_exact(&mut buf).ok()?;
        if buf.last() == Some(&0) {
            buf.pop();
        }
        String::from_utf8(buf).ok()
    } else {
        let mut buf = vec![0u8; units as usize * 2];
        reader.read_exact(&mut buf).ok()?;
        let mut utf16: Vec<u16> = buf
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if utf16.last() == Some(&0) {
            utf16.pop();
        }
        String::from_utf16(&utf16).ok()
    }
}
