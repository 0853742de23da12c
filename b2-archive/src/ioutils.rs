//! Bounds-checked reads over the in-memory index image
//!
//! Every structure in a `.b2index` is addressed by absolute file
//! offsets that come from untrusted data, so all access goes through
//! these helpers and returns `None` instead of slicing out of bounds.

/// Read a little-endian `u32` at `offset`.
pub(crate) fn u32_at(data: &[u8], offset: u64) -> Option<u32> {
    let bytes = bytes_at(data, offset, 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Read a little-endian `i32` at `offset`.
pub(crate) fn i32_at(data: &[u8], offset: u64) -> Option<i32> {
    let bytes = bytes_at(data, offset, 4)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

/// Read a little-endian `u64` at `offset`.
pub(crate) fn u64_at(data: &[u8], offset: u64) -> Option<u64> {
    let bytes = bytes_at(data, offset, 8)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Read a NUL-terminated UTF-8 string starting at `offset`.
///
/// Returns `None` when the offset is out of bounds, the terminator is
/// missing, or the bytes are not valid UTF-8.
pub(crate) fn cstr_at(data: &[u8], offset: u64) -> Option<&str> {
    let start = usize::try_from(offset).ok()?;
    let tail = data.get(start..)?;
    let end = tail.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&tail[..end]).ok()
}

fn bytes_at(data: &[u8], offset: u64, len: usize) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(len)?;
    data.get(start..end)
}
