//! Extraction tool for b2 archive pairs
//!
//! Walks a `.b2index`, decompresses each entry out of its
//! `.b2container`, and writes files into an output directory while
//! reconstructing a meaningful tree: asset paths are mined from
//! decompressed package headers and content bytes, material locations
//! are memoized, and bulk-data satellites are routed (or reconciled
//! after the fact) next to their owning asset.
//!
//! The core is headless: hosts drive it through [`Extractor`] with two
//! narrow callbacks for progress and log events. The `b2x` binary in
//! this crate is a thin terminal front-end over the same interface.

pub mod driver;
pub mod error;
pub mod events;
pub mod existing;
pub mod options;
pub mod reconcile;
pub mod recover;
pub mod route;

pub use driver::{Extractor, RunSummary};
pub use error::{ExtractError, Result};
pub use events::EventSink;
pub use existing::ExistingIndex;
pub use options::{ExtractOptions, LogLevel};
pub use recover::{AssetClass, Recovery};
pub use route::Route;
