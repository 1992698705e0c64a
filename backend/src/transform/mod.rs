//! CSV rows to HIP-412 metadata, and the high-level pipeline.
//!
//! - Converter: rows to metadata objects
//! - Persist: one JSON file per object
//! - Pipeline: metadata creation and batched minting entry points

pub mod converter;
pub mod persist;
pub mod pipeline;

pub use converter::{convert, convert_row, Conversion, RowFailure};
pub use persist::{save_objects, PersistFailure, PersistSummary};
pub use pipeline::*;
