//! Human-readable structured output.

pub mod writer;

pub use writer::JsonWriter;
