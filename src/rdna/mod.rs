//! Low-level RDNA binary container: format constants, byte streams,
//! reader and writer.

pub mod format;
pub mod reader;
pub mod stream;
pub mod writer;

pub use reader::{BinaryReader, Header};
pub use stream::{IStream, OStream};
pub use writer::BinaryWriter;
