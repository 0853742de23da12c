//! Common types for the b2 archive pair

use std::path::PathBuf;

/// One record from the index's name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    /// Logical name of the entry, as stored (may contain separators).
    pub name: String,
    /// Row number into the entry table.
    pub entry_index: u32,
    /// Directory marker; directory records are not extractable files.
    pub is_dir: bool,
}

/// One 16-byte row of the entry table.
///
/// `abs_offset`/`abs_size` address the entry's payload inside the
/// *decompressed* window assembled from its chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRow {
    pub block_offset: i32,
    pub abs_offset: i32,
    pub abs_size: i32,
}

/// The fixed part of a block descriptor (at `block_offset + 16`).
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    /// Base offset of the entry's payload inside its container.
    pub payload_offset: u64,
    /// Recorded but unused by extraction; kept for diagnostics.
    pub container_id: i32,
    /// Offset of the size table inside the index.
    pub size_table_offset: u64,
    /// Number of extra chunks following the base chunk.
    pub extra_count: u32,
}

/// One compressed run inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Absolute offset of the compressed bytes in the container file.
    pub container_offset: u64,
    pub comp_size: u64,
    pub unc_size: u64,
}

impl Chunk {
    /// Store-mode chunks are copied verbatim instead of decompressed.
    pub fn is_store(&self) -> bool {
        self.comp_size == self.unc_size
    }
}

/// Fully resolved layout of one entry: owning container plus chunk list.
#[derive(Debug, Clone)]
pub struct EntryLayout {
    /// Absolute path of the container file holding the chunks.
    pub container_path: PathBuf,
    /// Base chunk first, extras in index order.
    pub chunks: Vec<Chunk>,
}

impl EntryLayout {
    /// Sum of uncompressed chunk sizes.
    pub fn total_uncompressed(&self) -> u64 {
        self.chunks.iter().map(|c| c.unc_size).sum()
    }

    /// Length the assembled window must reach to cover the payload:
    /// `min(total uncompressed, abs_offset + abs_size)`.
    pub fn needed(&self, row: &EntryRow) -> u64 {
        let wanted = u64::try_from(row.abs_offset).unwrap_or(0)
            + u64::try_from(row.abs_size).unwrap_or(0);
        self.total_uncompressed().min(wanted)
    }
}
