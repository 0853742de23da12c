//! Oodle LZ decompression shim
//!
//! Game containers in the b2 format compress chunk payloads with the
//! proprietary Oodle LZ family (Kraken, Mermaid, Selkie). This crate
//! wraps the native `OodleLZ_Decompress` entry point behind the
//! [`LzCodec`] trait and degrades softly: when the runtime library is
//! absent, or a decode fails, callers receive an error they can answer
//! by passing the compressed bytes through unchanged. Extraction never
//! aborts because the codec is missing.

pub mod error;
pub mod ffi;

use std::ptr;

use libloading::Library;
use tracing::{debug, warn};

pub use error::{Error, Result};

/// Consecutive decode failures before the backend flips to disabled.
///
/// Effectively "never": the upstream tool shipped with this sentinel
/// and relied on per-chunk passthrough instead of a hard cutoff.
pub const DEFAULT_DISABLE_THRESHOLD: u32 = 1_000_000_000;

/// Stride used when sampling output for the entropy check.
const SAMPLE_STRIDE: usize = 64;

/// Minimum distinct byte values a sampled decode must show.
const MIN_DISTINCT_BYTES: usize = 9;

/// A decompressor for Oodle LZ chunk payloads.
///
/// The production implementation is [`OodleLz`]; tests inject stubs.
pub trait LzCodec {
    /// Decompress `comp` into a buffer of exactly `raw_len` bytes.
    ///
    /// Errors are soft: the caller is expected to fall back to the
    /// compressed bytes rather than abort.
    fn try_decompress(&mut self, comp: &[u8], raw_len: usize) -> Result<Vec<u8>>;

    /// Whether the native backend is currently usable.
    fn is_enabled(&self) -> bool;
}

enum Backend {
    Enabled {
        // Keeps the dynamic library mapped for as long as `entry` may be called.
        _lib: Library,
        entry: ffi::DecompressFn,
    },
    Disabled {
        reason: String,
    },
}

/// Shim over the native Oodle LZ decompressor.
pub struct OodleLz {
    backend: Backend,
    consecutive_failures: u32,
    disable_threshold: u32,
}

impl OodleLz {
    /// Resolve the native library; falls back to the disabled state
    /// (with a warning) when it cannot be loaded.
    pub fn load() -> Self {
        match ffi::load() {
            Ok((lib, entry)) => Self {
                backend: Backend::Enabled { _lib: lib, entry },
                consecutive_failures: 0,
                disable_threshold: DEFAULT_DISABLE_THRESHOLD,
            },
            Err(e) => {
                warn!("Oodle codec unavailable, chunks will pass through compressed: {e}");
                Self::disabled(e.to_string())
            }
        }
    }

    /// Construct a codec that is disabled from the start.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Disabled {
                reason: reason.into(),
            },
            consecutive_failures: 0,
            disable_threshold: DEFAULT_DISABLE_THRESHOLD,
        }
    }

    /// Override the consecutive-failure disable threshold.
    pub fn with_disable_threshold(mut self, threshold: u32) -> Self {
        self.disable_threshold = threshold;
        self
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.disable_threshold {
            warn!(
                "disabling Oodle codec after {} consecutive failures",
                self.consecutive_failures
            );
            self.backend = Backend::Disabled {
                reason: format!("{} consecutive decode failures", self.consecutive_failures),
            };
        }
    }
}

impl LzCodec for OodleLz {
    fn try_decompress(&mut self, comp: &[u8], raw_len: usize) -> Result<Vec<u8>> {
        let entry = match &self.backend {
            Backend::Enabled { entry, .. } => *entry,
            Backend::Disabled { reason } => return Err(Error::Disabled(reason.clone())),
        };

        let mut raw = vec![0u8; raw_len];
        let status = unsafe {
            entry(
                comp.as_ptr(),
                comp.len() as isize,
                raw.as_mut_ptr(),
                raw_len as isize,
                1, // fuzz safe
                0, // no CRC check
                0, // verbosity
                ptr::null_mut(),
                0,
                ptr::null(),
                ptr::null(),
                ptr::null_mut(),
                0,
                0, // unthreaded
            )
        };

        if status > 0 {
            self.consecutive_failures = 0;
            return Ok(raw);
        }

        // Some runtime builds report 0 despite having written output.
        if status == 0 && looks_decompressed(&raw) {
            debug!("accepting status-0 decode of {raw_len} bytes via entropy check");
            self.consecutive_failures = 0;
            return Ok(raw);
        }

        self.record_failure();
        if status == 0 {
            Err(Error::OutputRejected)
        } else {
            Err(Error::DecodeFailed(status))
        }
    }

    fn is_enabled(&self) -> bool {
        matches!(self.backend, Backend::Enabled { .. })
    }
}

/// Entropy check for status-0 decodes: a sampled stride of the output
/// must contain at least 9 distinct byte values to count as decompressed.
pub fn looks_decompressed(buf: &[u8]) -> bool {
    let mut seen = [false; 256];
    let mut distinct = 0usize;
    for &b in buf.iter().step_by(SAMPLE_STRIDE) {
        if !seen[b as usize] {
            seen[b as usize] = true;
            distinct += 1;
            if distinct >= MIN_DISTINCT_BYTES {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_codec_reports_reason() {
        let mut codec = OodleLz::disabled("no library");
        assert!(!codec.is_enabled());

        let err = codec.try_decompress(&[1, 2, 3], 16).unwrap_err();
        assert!(matches!(err, Error::Disabled(reason) if reason == "no library"));
    }

    #[test]
    fn test_looks_decompressed_rejects_flat_output() {
        assert!(!looks_decompressed(&[0u8; 4096]));
        assert!(!looks_decompressed(&[]));
    }

    #[test]
    fn test_looks_decompressed_accepts_varied_output() {
        // One new byte value per sampled position.
        let mut buf = vec![0u8; SAMPLE_STRIDE * 16];
        for (i, chunk) in buf.chunks_mut(SAMPLE_STRIDE).enumerate() {
            chunk[0] = i as u8;
        }
        assert!(looks_decompressed(&buf));
    }

    #[test]
    fn test_looks_decompressed_samples_by_stride() {
        // Variety that never lands on a sampled position is invisible.
        let mut buf = vec![0u8; SAMPLE_STRIDE * 16];
        for chunk in buf.chunks_mut(SAMPLE_STRIDE) {
            for (j, b) in chunk.iter_mut().enumerate().skip(1) {
                *b = j as u8;
            }
        }
        assert!(!looks_decompressed(&buf));
    }
}
