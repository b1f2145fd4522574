//! Error types for the rigdna library.

use std::path::PathBuf;
use thiserror::Error;

use crate::layer::Layer;

/// Main error type for RDNA operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File exists but the process may not open it in the requested mode
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File is truncated or a read ran past the end of the resource
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// The storage device ran out of space mid-write
    #[error("Disk full while writing output")]
    DiskFull,

    /// Invalid magic bytes at start of file
    #[error("Invalid RDNA file: bad signature")]
    BadSignature,

    /// Unsupported container format version
    #[error("Unsupported RDNA version: {0}")]
    UnsupportedVersion(u16),

    /// A section in the container could not be parsed
    #[error("Corrupt {layer} section: {reason}")]
    CorruptSection { layer: Layer, reason: String },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create a corrupt-section error for the given layer.
    pub fn corrupt(layer: Layer, reason: impl Into<String>) -> Self {
        Self::CorruptSection { layer, reason: reason.into() }
    }

    /// True for failures caused by the container contents rather than the host.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::BadSignature | Self::UnsupportedVersion(_) | Self::CorruptSection { .. }
        )
    }
}

/// Result type alias for RDNA operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::BadSignature;
        assert!(e.to_string().contains("signature"));

        let e = Error::UnsupportedVersion(9);
        assert!(e.to_string().contains("9"));

        let e = Error::corrupt(Layer::Geometry, "mesh count truncated");
        assert!(e.to_string().contains("Geometry"));
        assert!(e.to_string().contains("mesh count truncated"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_format_error_classification() {
        assert!(Error::BadSignature.is_format_error());
        assert!(Error::UnsupportedVersion(3).is_format_error());
        assert!(!Error::DiskFull.is_format_error());
    }
}
