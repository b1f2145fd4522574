//! The read-then-write pipeline: binary container in, JSON document out.
//!
//! This is the sole surface a presentation layer needs; it exposes paths
//! and a [`LayerMask`], never the document or stream types. Both file
//! handles are scoped and released on every path. Any failure
//! short-circuits the remaining steps; a failure after the output file was
//! created leaves it truncated, and callers must treat it as unusable.

use std::path::Path;

use tracing::{debug, info};

use crate::json::JsonWriter;
use crate::layer::LayerMask;
use crate::rdna::{BinaryReader, OStream};
use crate::util::Result;

/// Convert the container at `input` into a JSON document at `output`,
/// restricted to the layers in `mask`.
pub fn transcode(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mask: LayerMask,
) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    info!(input = %input.display(), output = %output.display(), %mask, "transcoding");

    let doc = BinaryReader::open(input)?.read(mask)?;
    debug!(layers = %doc.populated_layers(), "container read");

    let mut out = OStream::create(output)?;
    JsonWriter::set_from(&doc, mask).write(&mut out)
}
