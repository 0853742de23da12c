//! Error types for the Oodle LZ shim

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codec error types
#[derive(Error, Debug)]
pub enum Error {
    /// No loadable Oodle library was found
    #[error("failed to load Oodle library: {0}")]
    LoadFailed(String),

    /// The library loaded but does not export the decompress entry point
    #[error("Oodle library missing decompress entry point: {0}")]
    MissingSymbol(String),

    /// The codec backend is in its disabled state
    #[error("codec disabled: {0}")]
    Disabled(String),

    /// The native call reported failure
    #[error("OodleLZ_Decompress returned status {0}")]
    DecodeFailed(isize),

    /// The native call reported success but the output does not look decompressed
    #[error("decoder output rejected by entropy check")]
    OutputRejected,
}
