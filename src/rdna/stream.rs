//! Byte streams over RDNA resources.
//!
//! [`IStream`] is the read side: memory-mapped by default with a buffered
//! file fallback, exposing positioned reads. [`OStream`] is the write side:
//! a buffered sequential writer with position tracking and seek-back for
//! patching deferred offsets. A handle is one resource in one mode; there
//! is no type that both reads and writes, so mode mismatches cannot be
//! expressed. Handles release the OS file on drop, on every exit path.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use parking_lot::RwLock;

use crate::util::{Error, Result};

/// Input stream for reading RDNA data.
#[derive(Debug)]
pub struct IStream {
    inner: StreamInner,
    size: u64,
}

#[derive(Debug)]
enum StreamInner {
    /// Memory-mapped file (preferred)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(Arc<RwLock<File>>),
}

impl IStream {
    /// Open a file for reading, memory-mapped when the `mmap` feature is on.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, cfg!(feature = "mmap"))
    }

    /// Open a file with explicit control over memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        let size = file.metadata()?.len();

        let inner = if use_mmap && size > 0 {
            // Safety: file is opened read-only; mapping failures are surfaced
            let mmap = unsafe { Mmap::map(&file) }
                .map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamInner::Mmap(mmap)
        } else {
            StreamInner::File(Arc::new(RwLock::new(file)))
        };

        Ok(Self { inner, size })
    }

    /// Total size of the resource in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let in_bounds = pos
            .checked_add(buf.len() as u64)
            .is_some_and(|end| end <= self.size);
        if !in_bounds {
            return Err(Error::UnexpectedEof(pos.saturating_add(buf.len() as u64)));
        }

        match &self.inner {
            StreamInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..pos as usize + buf.len()]);
                Ok(())
            }
            StreamInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        Error::UnexpectedEof(pos + buf.len() as u64)
                    } else {
                        Error::Io(e)
                    }
                })
            }
        }
    }

    /// Read a u64 value (little-endian) at the given position.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a u32 value (little-endian) at the given position.
    pub fn read_u32(&self, pos: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(pos, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a u16 value (little-endian) at the given position.
    pub fn read_u16(&self, pos: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(pos, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

/// Output stream for writing RDNA or JSON data.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    Error::PermissionDenied(path.to_path_buf())
                }
                _ => Error::Io(e),
            })?;

        Ok(Self {
            writer: BufWriter::with_capacity(256 * 1024, file),
            pos: 0,
        })
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(map_write_err)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value).map_err(map_write_err)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value).map_err(map_write_err)?;
        self.pos += 4;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value).map_err(map_write_err)?;
        self.pos += 2;
        Ok(())
    }

    /// Write an f32 value (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value).map_err(map_write_err)?;
        self.pos += 4;
        Ok(())
    }

    /// Seek to a position and return the new position.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush().map_err(map_write_err)?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Seek to the end and return the position.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush().map_err(map_write_err)?;
        let new_pos = self.writer.seek(SeekFrom::End(0))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(map_write_err)
    }
}

fn map_write_err(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::StorageFull {
        Error::DiskFull
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_missing_file() {
        let err = IStream::open("/no/such/file.rdna").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_positioned_reads_both_modes() {
        let temp = NamedTempFile::new().unwrap();
        {
            let mut out = OStream::create(temp.path()).unwrap();
            out.write_bytes(b"RDNA").unwrap();
            out.write_u16(2).unwrap();
            out.write_u64(0xDEAD_BEEF).unwrap();
            out.flush().unwrap();
        }

        for use_mmap in [true, false] {
            let stream = IStream::open_opts(temp.path(), use_mmap).unwrap();
            assert_eq!(stream.size(), 14);
            assert_eq!(stream.read_bytes(0, 4).unwrap(), b"RDNA");
            assert_eq!(stream.read_u16(4).unwrap(), 2);
            assert_eq!(stream.read_u64(6).unwrap(), 0xDEAD_BEEF);
            assert!(matches!(
                stream.read_u64(10),
                Err(Error::UnexpectedEof(_))
            ));
        }
    }

    #[test]
    fn test_seek_back_patches_bytes() {
        let temp = NamedTempFile::new().unwrap();
        let mut out = OStream::create(temp.path()).unwrap();
        out.write_u32(0).unwrap();
        out.write_bytes(b"tail").unwrap();
        out.seek(0).unwrap();
        out.write_u32(7).unwrap();
        out.seek_end().unwrap();
        assert_eq!(out.pos(), 8);
        out.flush().unwrap();
        drop(out);

        let stream = IStream::open(temp.path()).unwrap();
        assert_eq!(stream.read_u32(0).unwrap(), 7);
        assert_eq!(stream.read_bytes(4, 4).unwrap(), b"tail");
    }
}
