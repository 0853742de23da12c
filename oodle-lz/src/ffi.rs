//! Raw binding to the native `OodleLZ_Decompress` entry point
//!
//! The library is resolved at runtime so the extractor keeps working
//! (in passthrough mode) on machines without the Oodle runtime.

use std::ffi::c_void;

use libloading::Library;
use tracing::debug;

use crate::error::{Error, Result};

/// `OodleLZ_Decompress` as exported by the oo2core runtime.
///
/// The buffer-base, callback, and scratch-memory arguments are always
/// passed as null here; `thread_phase` 0 selects unthreaded decode.
pub type DecompressFn = unsafe extern "C" fn(
    comp_buf: *const u8,
    comp_len: isize,
    raw_buf: *mut u8,
    raw_len: isize,
    fuzz_safe: i32,
    check_crc: i32,
    verbosity: i32,
    dec_buf_base: *mut u8,
    dec_buf_size: isize,
    fp_callback: *const c_void,
    callback_user_data: *const c_void,
    decoder_memory: *mut u8,
    decoder_memory_size: isize,
    thread_phase: i32,
) -> isize;

/// Exported symbol name of the decompressor.
pub const ENTRY_POINT: &[u8] = b"OodleLZ_Decompress";

/// Environment variable overriding the library search path.
pub const LIBRARY_PATH_VAR: &str = "OODLE_LZ_PATH";

/// Platform-default library names, tried in order after [`LIBRARY_PATH_VAR`].
pub const LIBRARY_NAMES: &[&str] = &[
    #[cfg(target_os = "windows")]
    "oo2core_9_win64.dll",
    #[cfg(target_os = "windows")]
    "oo2core_8_win64.dll",
    #[cfg(target_os = "linux")]
    "liboo2corelinux64.so.9",
    #[cfg(target_os = "macos")]
    "liboo2coremac64.2.9.dylib",
];

/// Resolve the Oodle library and its decompress entry point.
///
/// Returns the open library handle together with the raw function
/// pointer; the pointer is only valid while the handle is alive, so the
/// caller must keep both together.
pub fn load() -> Result<(Library, DecompressFn)> {
    let mut candidates: Vec<String> = Vec::new();
    if let Ok(path) = std::env::var(LIBRARY_PATH_VAR) {
        candidates.push(path);
    }
    candidates.extend(LIBRARY_NAMES.iter().map(|name| (*name).to_string()));

    let mut last_error = String::from("no candidate library names for this platform");
    for name in &candidates {
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                debug!("loaded Oodle library from {name}");
                let entry = unsafe { lib.get::<DecompressFn>(ENTRY_POINT) }
                    .map_err(|e| Error::MissingSymbol(e.to_string()))?;
                let entry = *entry;
                return Ok((lib, entry));
            }
            Err(e) => {
                debug!("candidate {name} not loadable: {e}");
                last_error = format!("{name}: {e}");
            }
        }
    }

    Err(Error::LoadFailed(last_error))
}
