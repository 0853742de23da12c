//! Error types for extraction runs

use std::io;
use std::path::PathBuf;

use b2_archive::ArchiveError;
use thiserror::Error;

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that abort a run.
///
/// Per-entry faults never surface here; the driver logs them and moves
/// on. Only a malformed index or an unusable output directory is fatal.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("output directory {}: {source}", .path.display())]
    OutputDir { path: PathBuf, source: io::Error },
}
