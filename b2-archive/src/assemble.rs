//! Chunk assembly
//!
//! Gathers an entry's base and extra chunks into one decompressed
//! window. This is the only place that distinguishes store-mode chunks
//! (`compressed == uncompressed`, copied verbatim) from compressed
//! chunks handed to the codec. A codec failure does not fail the
//! entry: the compressed bytes pass through unchanged and the window
//! is marked degraded so the caller writes it whole instead of carving
//! decompressed-space offsets out of it.

use std::path::Path;

use oodle_lz::LzCodec;
use tracing::{trace, warn};

use crate::container::ContainerCache;
use crate::error::{ArchiveError, Result};
use crate::types::Chunk;

/// The decompressed window of one entry.
#[derive(Debug)]
pub struct Window {
    pub data: Vec<u8>,
    /// At least one compressed chunk passed through raw.
    pub degraded: bool,
}

impl Window {
    /// Carve the entry payload out of the window.
    ///
    /// Degraded windows are returned whole: their contents are still
    /// compressed, so decompressed-space offsets do not apply.
    pub fn payload(&self, abs_offset: u64, abs_size: u64) -> Result<&[u8]> {
        if self.degraded {
            return Ok(&self.data);
        }
        let end = abs_offset
            .checked_add(abs_size)
            .ok_or(ArchiveError::WindowTooShort {
                needed: u64::MAX,
                have: self.data.len() as u64,
            })?;
        if end > self.data.len() as u64 {
            return Err(ArchiveError::WindowTooShort {
                needed: end,
                have: self.data.len() as u64,
            });
        }
        Ok(&self.data[abs_offset as usize..end as usize])
    }
}

/// Assemble the chunks of one entry into a window of at most `needed`
/// bytes (the final part is clipped).
pub fn assemble(
    containers: &mut ContainerCache,
    codec: &mut dyn LzCodec,
    container: &Path,
    chunks: &[Chunk],
    needed: u64,
) -> Result<Window> {
    let mut data = Vec::with_capacity(needed as usize);
    let mut degraded = false;

    for (i, chunk) in chunks.iter().enumerate() {
        let comp = containers.read(container, chunk.container_offset, chunk.comp_size)?;

        if chunk.is_store() {
            trace!("chunk {i}: store, {} bytes", chunk.comp_size);
            data.extend_from_slice(&comp);
            continue;
        }

        match codec.try_decompress(&comp, chunk.unc_size as usize) {
            Ok(part) => {
                trace!(
                    "chunk {i}: {} -> {} bytes",
                    chunk.comp_size, chunk.unc_size
                );
                data.extend_from_slice(&part);
            }
            Err(e) => {
                warn!(
                    "chunk {i} of {} did not decompress ({e}), passing through raw",
                    container.display()
                );
                degraded = true;
                data.extend_from_slice(&comp);
            }
        }
    }

    if !degraded && data.len() as u64 > needed {
        data.truncate(needed as usize);
    }

    Ok(Window { data, degraded })
}
