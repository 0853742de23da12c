//! b2 archive format support
//!
//! Certain game titles ship assets as a two-file archive: a small
//! `.b2index` descriptor (entry table, name table, block descriptors)
//! paired with one or more `.b2container` files holding the compressed
//! payload bytes. This crate parses the index, reads compressed chunks
//! out of containers through a cached handle map, and assembles each
//! entry's chunks into its decompressed window.
//!
//! Chunk payloads use the Oodle LZ codec via the `oodle-lz` shim;
//! when the codec is unavailable the assembled window degrades to the
//! raw compressed bytes instead of failing the entry.

pub mod assemble;
pub mod container;
pub mod error;
mod ioutils;
pub mod index;
pub mod types;

pub use assemble::{Window, assemble};
pub use container::ContainerCache;
pub use error::{ArchiveError, Result};
pub use index::{CONTAINER_EXTENSION, INDEX_EXTENSION, IndexFile};
pub use types::{BlockInfo, Chunk, EntryLayout, EntryRow, NameRecord};
