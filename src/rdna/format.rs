//! RDNA container constants and layout helpers.
//!
//! All scalars are little-endian. The file starts with a fixed 16-byte
//! header, followed (at `toc_offset`, normally right after the header) by
//! the table of contents, followed by the sections in TOC order.

/// Magic bytes at the start of an RDNA file.
pub const RDNA_MAGIC: &[u8; 4] = b"RDNA";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 4;

/// Offset of the section count in the header.
pub const SECTION_COUNT_OFFSET: usize = 6;

/// Offset of the table-of-contents position in the header.
pub const TOC_OFFSET_OFFSET: usize = 8;

/// Current RDNA format version.
pub const CURRENT_VERSION: u16 = 2;

/// Oldest version this reader still accepts.
pub const MIN_SUPPORTED_VERSION: u16 = 1;

/// Size of one table-of-contents entry: layer id (u32) + offset (u64) +
/// length (u64).
pub const TOC_ENTRY_SIZE: usize = 20;

/// Check whether a header version is within the supported range.
#[inline]
pub const fn is_supported_version(version: u16) -> bool {
    version >= MIN_SUPPORTED_VERSION && version <= CURRENT_VERSION
}

/// One table-of-contents entry: where a section lives and how long it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub layer_id: u32,
    pub offset: u64,
    pub length: u64,
}

impl TocEntry {
    /// Byte position just past the end of the section, or `None` when the
    /// entry is corrupt enough for offset + length to overflow.
    #[inline]
    pub const fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(RDNA_MAGIC, b"RDNA");
        assert_eq!(RDNA_MAGIC.len(), 4);
    }

    #[test]
    fn test_header_layout() {
        // The three header fields plus the magic fill the header exactly.
        assert_eq!(VERSION_OFFSET, RDNA_MAGIC.len());
        assert_eq!(TOC_OFFSET_OFFSET + 8, HEADER_SIZE);
    }

    #[test]
    fn test_version_range() {
        assert!(is_supported_version(MIN_SUPPORTED_VERSION));
        assert!(is_supported_version(CURRENT_VERSION));
        assert!(!is_supported_version(0));
        assert!(!is_supported_version(CURRENT_VERSION + 1));
    }

    #[test]
    fn test_toc_entry_end() {
        let entry = TocEntry { layer_id: 0, offset: 0x40, length: 0x10 };
        assert_eq!(entry.end(), Some(0x50));
    }

    #[test]
    fn test_toc_entry_end_overflow() {
        let entry = TocEntry { layer_id: 0, offset: u64::MAX - 8, length: 0x20 };
        assert_eq!(entry.end(), None);
    }
}
