//! # rigdna
//!
//! Layered rig-description (RDNA) container format: a binary reader, a
//! human-readable JSON writer, and the transcoding pipeline between them.
//!
//! An RDNA file is a versioned binary container holding independent data
//! layers (descriptor, definition, behavior, geometry, blend shapes). Reads
//! and writes are filtered by a [`LayerMask`]: unselected sections cost a
//! seek, never a parse.
//!
//! ## Modules
//!
//! - [`util`] - Errors and the crate-wide `Result` alias
//! - [`layer`] - The layer enumeration and mask algebra
//! - [`document`] - In-memory document and per-layer payloads
//! - [`rdna`] - Binary container: format constants, streams, reader, writer
//! - [`json`] - Structured JSON output
//! - [`transcode`] - The read-then-write pipeline entry point
//!
//! ## Example
//!
//! ```ignore
//! use rigdna::{transcode, LayerMask};
//!
//! transcode("rig.rdna", "rig.json", LayerMask::ALL_EXCEPT_BLEND_SHAPES)?;
//! ```

pub mod document;
pub mod json;
pub mod layer;
pub mod rdna;
pub mod transcode;
pub mod util;

// Re-export commonly used types
pub use document::Document;
pub use json::JsonWriter;
pub use layer::{Layer, LayerMask};
pub use rdna::{BinaryReader, BinaryWriter, IStream, OStream};
pub use transcode::transcode;
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::document::Document;
    pub use crate::json::JsonWriter;
    pub use crate::layer::{Layer, LayerMask};
    pub use crate::rdna::{BinaryReader, BinaryWriter, IStream, OStream};
    pub use crate::transcode::transcode;
    pub use crate::util::{Error, Result};
}
