//! Error types for b2 archive operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The index header itself is unusable; aborts the run.
    #[error("malformed index: {0}")]
    IndexMalformed(String),

    /// A per-entry structure points outside the index image; skips the entry.
    #[error("entry {index} out of range: {reason}")]
    EntryOutOfRange { index: u32, reason: String },

    /// The container named by a block does not exist next to the index.
    #[error("container not found: {0}")]
    MissingContainer(PathBuf),

    /// A chunk read falls outside its container file.
    #[error(
        "container read out of bounds: offset={offset} len={len} size={size} in {}",
        .path.display()
    )]
    ContainerIo {
        path: PathBuf,
        offset: u64,
        len: u64,
        size: u64,
    },

    /// The assembled window cannot cover the entry's payload range.
    #[error("assembled window too short: need {needed} bytes, have {have}")]
    WindowTooShort { needed: u64, have: u64 },
}
