//! Name-table walk
//!
//! The index header carries an advisory name count, but real files
//! disagree with it often enough that the walk instead reads fixed
//! 16-byte records until it falls off the end of the file or hits a
//! long run of garbage.

use tracing::{debug, trace};

use crate::ioutils;
use crate::types::NameRecord;

/// Size of one name record: u64 name offset, i32 file number, i32 child.
pub(crate) const NAME_RECORD_SIZE: u64 = 16;

/// Consecutive malformed records tolerated before the walk stops.
pub(crate) const MAX_BAD_RUN: u32 = 4096;

/// Walk the name table starting at `names_offset`.
///
/// Malformed records (zero or out-of-bounds name offset, negative file
/// number, empty name string) are counted but skipped; one good record
/// resets the counter.
pub(crate) fn walk(data: &[u8], names_offset: u64) -> Vec<NameRecord> {
    let mut records = Vec::new();
    let mut bad_run = 0u32;
    let mut pos = names_offset;

    while pos + NAME_RECORD_SIZE <= data.len() as u64 {
        match read_record(data, pos) {
            Some(record) => {
                trace!("name record at {pos}: {:?}", record);
                bad_run = 0;
                records.push(record);
            }
            None => {
                bad_run += 1;
                if bad_run > MAX_BAD_RUN {
                    debug!("name walk stopped after {bad_run} consecutive bad records at {pos}");
                    break;
                }
            }
        }
        pos += NAME_RECORD_SIZE;
    }

    debug!(
        "name walk yielded {} records ({} directories)",
        records.len(),
        records.iter().filter(|r| r.is_dir).count()
    );
    records
}

fn read_record(data: &[u8], pos: u64) -> Option<NameRecord> {
    let name_offset = ioutils::u64_at(data, pos)?;
    let file_number = ioutils::i32_at(data, pos + 8)?;
    let child = ioutils::i32_at(data, pos + 12)?;

    if name_offset == 0 || name_offset >= data.len() as u64 || file_number < 0 {
        return None;
    }

    let name = ioutils::cstr_at(data, name_offset)?;
    if name.is_empty() {
        return None;
    }

    Some(NameRecord {
        name: name.to_string(),
        entry_index: file_number as u32,
        is_dir: child > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_record(buf: &mut Vec<u8>, name_offset: u64, file_number: i32, child: i32) {
        buf.extend_from_slice(&name_offset.to_le_bytes());
        buf.extend_from_slice(&file_number.to_le_bytes());
        buf.extend_from_slice(&child.to_le_bytes());
    }

    /// String heap at the front, records after it.
    fn build_table(strings: &[&str]) -> (Vec<u8>, Vec<u64>) {
        let mut buf = Vec::new();
        let mut offsets = Vec::new();
        // Offset 0 must stay unused: a zero name offset marks a bad record.
        buf.push(0);
        for s in strings {
            offsets.push(buf.len() as u64);
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
        (buf, offsets)
    }

    #[test]
    fn test_walk_files_and_directories() {
        let (mut buf, offsets) = build_table(&["Game", "M_Rock.uasset", "config.json"]);
        let names_offset = buf.len() as u64;
        push_record(&mut buf, offsets[0], 0, 5); // directory
        push_record(&mut buf, offsets[1], 1, 0);
        push_record(&mut buf, offsets[2], 2, -1);

        let records = walk(&buf, names_offset);
        assert_eq!(records.len(), 3);
        assert!(records[0].is_dir);
        assert_eq!(records[1].name, "M_Rock.uasset");
        assert_eq!(records[1].entry_index, 1);
        assert!(!records[2].is_dir);
    }

    #[test]
    fn test_walk_skips_bad_records_and_resets_run() {
        let (mut buf, offsets) = build_table(&["a.bin", "b.bin"]);
        let names_offset = buf.len() as u64;
        push_record(&mut buf, offsets[0], 0, 0);
        push_record(&mut buf, 0, 1, 0); // zero name offset
        push_record(&mut buf, 9999, 1, 0); // out of bounds
        push_record(&mut buf, offsets[0], -1, 0); // negative file number
        push_record(&mut buf, offsets[1], 1, 0);

        let records = walk(&buf, names_offset);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a.bin");
        assert_eq!(records[1].name, "b.bin");
    }

    #[test]
    fn test_walk_stops_at_eof() {
        let (mut buf, offsets) = build_table(&["only.bin"]);
        let names_offset = buf.len() as u64;
        push_record(&mut buf, offsets[0], 0, 0);
        buf.extend_from_slice(&[0u8; 7]); // trailing partial record

        let records = walk(&buf, names_offset);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_walk_empty_when_offset_past_end() {
        let buf = vec![0u8; 8];
        assert!(walk(&buf, 100).is_empty());
    }
}
