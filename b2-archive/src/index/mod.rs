//! Parser for `.b2index` files
//!
//! The index is a small descriptor file: a fixed header pointing at an
//! entry table and a name table, per-entry block descriptors that name
//! the owning container, and size tables describing each entry's chunk
//! layout. The whole file is held in memory and every structure is
//! reached through bounds-checked absolute offsets.

mod names;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::ioutils;
use crate::types::{BlockInfo, Chunk, EntryLayout, EntryRow, NameRecord};

/// File extension of index files.
pub const INDEX_EXTENSION: &str = "b2index";

/// File extension of container files, appended to stored container
/// names that lack it.
pub const CONTAINER_EXTENSION: &str = "b2container";

/// Header field offsets (all little-endian).
const ENTRY_TABLE_OFFSET_FIELD: u64 = 68;
const ENTRY_COUNT_FIELD: u64 = 72;
const NAMES_OFFSET_FIELD: u64 = 92;
const NAME_COUNT_FIELD: u64 = 96;

/// Smallest file that can hold the header fields we read.
const MIN_INDEX_SIZE: usize = 100;

/// Size of one entry-table row.
const ENTRY_ROW_SIZE: u64 = 16;

/// A parsed `.b2index` file.
#[derive(Debug)]
pub struct IndexFile {
    data: Vec<u8>,
    base_dir: PathBuf,
    entry_table_offset: u64,
    names_offset: u64,
}

impl IndexFile {
    /// Read and parse an index file from disk.
    ///
    /// The file's parent directory becomes the base for container
    /// resolution.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(data, base_dir)
    }

    /// Parse an in-memory index image.
    pub fn parse(data: Vec<u8>, base_dir: PathBuf) -> Result<Self> {
        if data.len() < MIN_INDEX_SIZE {
            return Err(ArchiveError::IndexMalformed(format!(
                "index too small: {} bytes",
                data.len()
            )));
        }

        let entry_table_offset = u64::from(
            ioutils::u32_at(&data, ENTRY_TABLE_OFFSET_FIELD)
                .ok_or_else(|| ArchiveError::IndexMalformed("header truncated".into()))?,
        );
        let names_offset = u64::from(
            ioutils::u32_at(&data, NAMES_OFFSET_FIELD)
                .ok_or_else(|| ArchiveError::IndexMalformed("header truncated".into()))?,
        );

        // Advisory only; the name walk and per-row bounds checks are
        // what actually constrain parsing.
        let entry_count_hint = ioutils::i32_at(&data, ENTRY_COUNT_FIELD).unwrap_or(0);
        let name_count_hint = ioutils::i32_at(&data, NAME_COUNT_FIELD).unwrap_or(0);

        if entry_table_offset == 0 || entry_table_offset >= data.len() as u64 {
            return Err(ArchiveError::IndexMalformed(format!(
                "entry table offset {entry_table_offset} outside file of {} bytes",
                data.len()
            )));
        }
        if names_offset == 0 || names_offset >= data.len() as u64 {
            return Err(ArchiveError::IndexMalformed(format!(
                "names section offset {names_offset} outside file of {} bytes",
                data.len()
            )));
        }

        debug!(
            "index: {} bytes, entry table at {entry_table_offset} (hint {entry_count_hint}), \
             names at {names_offset} (hint {name_count_hint})",
            data.len()
        );

        Ok(Self {
            data,
            base_dir,
            entry_table_offset,
            names_offset,
        })
    }

    /// Directory containers are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Walk the name table into logical entry records.
    pub fn names(&self) -> Vec<NameRecord> {
        names::walk(&self.data, self.names_offset)
    }

    /// Read the 16-byte entry-table row for `entry_index`.
    pub fn entry_row(&self, entry_index: u32) -> Result<EntryRow> {
        let oob = |reason: String| ArchiveError::EntryOutOfRange {
            index: entry_index,
            reason,
        };

        let pos = self.entry_table_offset + u64::from(entry_index) * ENTRY_ROW_SIZE;
        let block_offset = ioutils::i32_at(&self.data, pos)
            .ok_or_else(|| oob(format!("row at {pos} past end of index")))?;
        // Second field is reserved.
        let abs_offset = ioutils::i32_at(&self.data, pos + 8)
            .ok_or_else(|| oob(format!("row at {pos} past end of index")))?;
        let abs_size = ioutils::i32_at(&self.data, pos + 12)
            .ok_or_else(|| oob(format!("row at {pos} past end of index")))?;

        if abs_offset < 0 || abs_size < 0 {
            return Err(oob(format!(
                "negative payload range: offset {abs_offset}, size {abs_size}"
            )));
        }

        Ok(EntryRow {
            block_offset,
            abs_offset,
            abs_size,
        })
    }

    /// Resolve the owning container and chunk list for an entry row.
    pub fn entry_layout(&self, entry_index: u32, row: &EntryRow) -> Result<EntryLayout> {
        let oob = |reason: String| ArchiveError::EntryOutOfRange {
            index: entry_index,
            reason,
        };

        if row.block_offset <= 0 || row.block_offset as u64 >= self.data.len() as u64 {
            return Err(oob(format!("block offset {} outside index", row.block_offset)));
        }
        let block = row.block_offset as u64;

        let container_path = self.container_path(block, &oob)?;
        let (info, chunks) = self.chunk_list(block, &oob)?;

        debug!(
            "entry {entry_index}: container {} (id {}), {} chunk(s)",
            container_path.display(),
            info.container_id,
            chunks.len()
        );

        Ok(EntryLayout {
            container_path,
            chunks,
        })
    }

    /// Follow the archive-spec pointer chain to the container filename.
    fn container_path(
        &self,
        block: u64,
        oob: &dyn Fn(String) -> ArchiveError,
    ) -> Result<PathBuf> {
        let spec_ptr = ioutils::u64_at(&self.data, block)
            .ok_or_else(|| oob(format!("block descriptor at {block} past end of index")))?;
        let name_offset = ioutils::u32_at(&self.data, spec_ptr)
            .ok_or_else(|| oob(format!("archive spec pointer {spec_ptr} outside index")))?;
        let name = ioutils::cstr_at(&self.data, u64::from(name_offset))
            .ok_or_else(|| oob(format!("container name at {name_offset} unreadable")))?;
        if name.is_empty() {
            return Err(oob("empty container name".into()));
        }

        let suffix = format!(".{CONTAINER_EXTENSION}");
        let file_name = if name.to_ascii_lowercase().ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        };

        Ok(self.base_dir.join(file_name))
    }

    /// Read the block descriptor and its size table into a chunk list.
    fn chunk_list(
        &self,
        block: u64,
        oob: &dyn Fn(String) -> ArchiveError,
    ) -> Result<(BlockInfo, Vec<Chunk>)> {
        let truncated = || oob(format!("block descriptor at {block} past end of index"));

        let payload_offset = ioutils::u64_at(&self.data, block + 16).ok_or_else(truncated)?;
        let container_id = ioutils::i32_at(&self.data, block + 24).ok_or_else(truncated)?;
        let size_table_offset = ioutils::u64_at(&self.data, block + 28).ok_or_else(truncated)?;
        let extra_minus_1 = ioutils::i32_at(&self.data, block + 36).ok_or_else(truncated)?;
        let extra_count = u32::try_from(extra_minus_1).unwrap_or(0);

        let info = BlockInfo {
            payload_offset,
            container_id,
            size_table_offset,
            extra_count,
        };

        // Base chunk: (u64 uncompressed, i32 compressed) at the size table.
        let st = size_table_offset;
        let size_table_bytes = 12 + u64::from(extra_count) * 12;
        if st.checked_add(size_table_bytes).is_none_or(|end| end > self.data.len() as u64) {
            return Err(oob(format!(
                "size table at {st} with {extra_count} extras past end of index"
            )));
        }

        let base_unc = ioutils::u64_at(&self.data, st).ok_or_else(truncated)?;
        let base_comp = ioutils::i32_at(&self.data, st + 8).ok_or_else(truncated)?;
        if base_comp < 0 {
            return Err(oob(format!("negative base chunk size {base_comp}")));
        }

        let mut chunks = Vec::with_capacity(1 + extra_count as usize);
        chunks.push(Chunk {
            container_offset: payload_offset,
            comp_size: base_comp as u64,
            unc_size: base_unc,
        });

        // Extras: (i32 uncompressed, i32 start, i32 end) triples,
        // offsets relative to the payload base.
        let mut pos = st + 12;
        for _ in 0..extra_count {
            let unc = ioutils::i32_at(&self.data, pos).ok_or_else(truncated)?;
            let start = ioutils::i32_at(&self.data, pos + 4).ok_or_else(truncated)?;
            let end = ioutils::i32_at(&self.data, pos + 8).ok_or_else(truncated)?;
            if unc < 0 || start < 0 || end < start {
                return Err(oob(format!(
                    "bad extra chunk triple ({unc}, {start}, {end}) at {pos}"
                )));
            }
            chunks.push(Chunk {
                container_offset: payload_offset + start as u64,
                comp_size: (end - start) as u64,
                unc_size: unc as u64,
            });
            pos += 12;
        }

        Ok((info, chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_file() {
        let err = IndexFile::parse(vec![0u8; 50], PathBuf::from(".")).unwrap_err();
        assert!(matches!(err, ArchiveError::IndexMalformed(_)));
    }

    #[test]
    fn test_rejects_out_of_range_header_offsets() {
        let mut data = vec![0u8; 256];
        data[68..72].copy_from_slice(&5000u32.to_le_bytes());
        data[92..96].copy_from_slice(&128u32.to_le_bytes());
        let err = IndexFile::parse(data.clone(), PathBuf::from(".")).unwrap_err();
        assert!(matches!(err, ArchiveError::IndexMalformed(_)));

        data[68..72].copy_from_slice(&128u32.to_le_bytes());
        data[92..96].copy_from_slice(&0u32.to_le_bytes());
        let err = IndexFile::parse(data, PathBuf::from(".")).unwrap_err();
        assert!(matches!(err, ArchiveError::IndexMalformed(_)));
    }

    #[test]
    fn test_entry_row_bounds() {
        let mut data = vec![0u8; 256];
        data[68..72].copy_from_slice(&200u32.to_le_bytes());
        data[92..96].copy_from_slice(&100u32.to_le_bytes());
        // Row 0 fits (200..216 is clipped by the 256-byte file? no: 216 <= 256).
        data[200..204].copy_from_slice(&40i32.to_le_bytes()); // block offset
        data[208..212].copy_from_slice(&8i32.to_le_bytes()); // abs offset
        data[212..216].copy_from_slice(&16i32.to_le_bytes()); // abs size

        let index = IndexFile::parse(data, PathBuf::from(".")).unwrap();
        let row = index.entry_row(0).unwrap();
        assert_eq!(row.block_offset, 40);
        assert_eq!(row.abs_offset, 8);
        assert_eq!(row.abs_size, 16);

        let err = index.entry_row(1000).unwrap_err();
        assert!(matches!(err, ArchiveError::EntryOutOfRange { index: 1000, .. }));
    }

    #[test]
    fn test_entry_row_rejects_negative_payload() {
        let mut data = vec![0u8; 256];
        data[68..72].copy_from_slice(&200u32.to_le_bytes());
        data[92..96].copy_from_slice(&100u32.to_le_bytes());
        data[208..212].copy_from_slice(&(-5i32).to_le_bytes());

        let index = IndexFile::parse(data, PathBuf::from(".")).unwrap();
        let err = index.entry_row(0).unwrap_err();
        assert!(matches!(err, ArchiveError::EntryOutOfRange { .. }));
    }

    #[test]
    fn test_layout_rejects_bad_block_offset() {
        let mut data = vec![0u8; 256];
        data[68..72].copy_from_slice(&200u32.to_le_bytes());
        data[92..96].copy_from_slice(&100u32.to_le_bytes());
        let index = IndexFile::parse(data, PathBuf::from(".")).unwrap();

        for block_offset in [0, -4, 9000] {
            let row = EntryRow {
                block_offset,
                abs_offset: 0,
                abs_size: 0,
            };
            let err = index.entry_layout(0, &row).unwrap_err();
            assert!(matches!(err, ArchiveError::EntryOutOfRange { .. }));
        }
    }
}
