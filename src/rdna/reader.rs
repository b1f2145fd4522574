//! RDNA binary reader.
//!
//! Parses a container under a [`LayerMask`]: sections in the mask are
//! decoded fully, sections outside it are skipped by their recorded TOC
//! length and never touched. The read is all-or-nothing: any parse failure
//! drops the partially built [`Document`].

use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, trace};

use super::format::*;
use super::stream::IStream;
use crate::document::*;
use crate::layer::{Layer, LayerMask};
use crate::util::{Error, Result};

/// Parsed and validated file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub section_count: u16,
    pub toc_offset: u64,
}

/// Reader over one open input stream.
///
/// `read` consumes the reader: each read targets a fresh [`Document`] and a
/// reader cannot be reused afterwards.
pub struct BinaryReader {
    stream: IStream,
}

impl BinaryReader {
    /// Wrap an already-open input stream.
    pub fn new(stream: IStream) -> Self {
        Self { stream }
    }

    /// Open a container file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(IStream::open(path)?))
    }

    /// Parse and validate a file header from raw bytes.
    pub fn parse_header(data: &[u8]) -> Result<Header> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[0..RDNA_MAGIC.len()] != RDNA_MAGIC {
            return Err(Error::BadSignature);
        }

        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        if !is_supported_version(version) {
            return Err(Error::UnsupportedVersion(version));
        }

        let section_count =
            u16::from_le_bytes([data[SECTION_COUNT_OFFSET], data[SECTION_COUNT_OFFSET + 1]]);
        let toc_offset = u64::from_le_bytes(
            data[TOC_OFFSET_OFFSET..TOC_OFFSET_OFFSET + 8].try_into().unwrap(),
        );

        Ok(Header { version, section_count, toc_offset })
    }

    /// Read the table of contents described by `header`.
    pub fn read_toc(stream: &IStream, header: &Header) -> Result<Vec<TocEntry>> {
        let mut entries = Vec::with_capacity(header.section_count as usize);
        for i in 0..header.section_count as u64 {
            let pos = header.toc_offset + i * TOC_ENTRY_SIZE as u64;
            let layer_id = stream.read_u32(pos)?;
            let offset = stream.read_u64(pos + 4)?;
            let length = stream.read_u64(pos + 12)?;
            let entry = TocEntry { layer_id, offset, length };
            // A corrupt entry may overflow offset + length; both that and a
            // section running past the file surface as a truncated read.
            match entry.end() {
                Some(end) if end <= stream.size() => {}
                _ => return Err(Error::UnexpectedEof(offset.saturating_add(length))),
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Parse the container into a [`Document`] restricted to `mask`.
    ///
    /// An empty mask is a valid, degenerate request: the header and TOC are
    /// still validated and the returned document has no populated layers.
    /// A layer in the mask but absent from the TOC populates nothing.
    pub fn read(self, mask: LayerMask) -> Result<Document> {
        let stream = self.stream;
        let header_bytes = stream.read_bytes(0, HEADER_SIZE)?;
        let header = Self::parse_header(&header_bytes)?;
        let toc = Self::read_toc(&stream, &header)?;

        debug!(
            version = header.version,
            sections = toc.len(),
            %mask,
            "reading RDNA container"
        );

        let mut doc = Document { version: header.version, ..Document::default() };

        for entry in &toc {
            let layer = match Layer::from_section_id(entry.layer_id) {
                Some(layer) => layer,
                None => {
                    trace!(layer_id = entry.layer_id, "skipping unknown section");
                    continue;
                }
            };
            if !mask.contains(layer) {
                trace!(%layer, length = entry.length, "skipping unselected section");
                continue;
            }

            let bytes = stream.read_bytes(entry.offset, entry.length as usize)?;
            trace!(%layer, length = entry.length, "parsing section");
            match layer {
                Layer::Descriptor => doc.descriptor = Some(parse_descriptor(&bytes)?),
                Layer::Definition => doc.definition = Some(parse_definition(&bytes)?),
                Layer::Behavior => doc.behavior = Some(parse_behavior(&bytes, mask)?),
                Layer::Geometry => doc.geometry = Some(parse_geometry(&bytes, mask)?),
                Layer::BlendShapes => unreachable!("blend shapes have no section id"),
            }
        }

        Ok(doc)
    }
}

// ============================================================================
// Section parsing
// ============================================================================

/// Cursor over one section's bytes; every decode failure is reported as a
/// corrupt-section error for that layer.
struct SectionCursor<'a> {
    cur: Cursor<&'a [u8]>,
    layer: Layer,
}

impl<'a> SectionCursor<'a> {
    fn new(bytes: &'a [u8], layer: Layer) -> Self {
        Self { cur: Cursor::new(bytes), layer }
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::corrupt(self.layer, reason)
    }

    fn remaining(&self) -> u64 {
        self.cur.get_ref().len() as u64 - self.cur.position()
    }

    /// Fail unless the section was consumed exactly.
    fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(self.corrupt(format!("{} trailing bytes", self.remaining())));
        }
        Ok(())
    }

    fn skip(&mut self, len: u64) -> Result<()> {
        if self.remaining() < len {
            return Err(self.corrupt("sub-block length past end of section"));
        }
        self.cur.set_position(self.cur.position() + len);
        Ok(())
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.cur
            .read_u16::<LittleEndian>()
            .map_err(|_| self.corrupt("truncated u16"))
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.cur
            .read_u32::<LittleEndian>()
            .map_err(|_| self.corrupt("truncated u32"))
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.cur
            .read_u64::<LittleEndian>()
            .map_err(|_| self.corrupt("truncated u64"))
    }

    fn read_f32(&mut self) -> Result<f32> {
        self.cur
            .read_f32::<LittleEndian>()
            .map_err(|_| self.corrupt("truncated f32"))
    }

    /// Element count for a vector, validated against the bytes actually left.
    fn read_count(&mut self, elem_size: u64) -> Result<usize> {
        let count = self.read_u32()? as u64;
        if count * elem_size > self.remaining() {
            return Err(self.corrupt(format!("count {} past end of section", count)));
        }
        Ok(count as usize)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_count(1)?;
        let mut buf = vec![0u8; len];
        std::io::Read::read_exact(&mut self.cur, &mut buf)
            .map_err(|_| self.corrupt("truncated string"))?;
        String::from_utf8(buf).map_err(|e| self.corrupt(format!("invalid UTF-8: {}", e)))
    }

    fn read_string_vec(&mut self) -> Result<Vec<String>> {
        // Strings are at least 4 bytes each (the length prefix).
        let count = self.read_count(4)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_string()?);
        }
        Ok(out)
    }

    fn read_u16_vec(&mut self) -> Result<Vec<u16>> {
        let count = self.read_count(2)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_u16()?);
        }
        Ok(out)
    }

    fn read_u32_vec(&mut self) -> Result<Vec<u32>> {
        let count = self.read_count(4)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_u32()?);
        }
        Ok(out)
    }

    fn read_f32_vec(&mut self) -> Result<Vec<f32>> {
        let count = self.read_count(4)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_f32()?);
        }
        Ok(out)
    }

    fn read_vec3_vec(&mut self) -> Result<Vec<[f32; 3]>> {
        let count = self.read_count(12)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push([self.read_f32()?, self.read_f32()?, self.read_f32()?]);
        }
        Ok(out)
    }

    fn read_vec2_vec(&mut self) -> Result<Vec<[f32; 2]>> {
        let count = self.read_count(8)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push([self.read_f32()?, self.read_f32()?]);
        }
        Ok(out)
    }
}

fn parse_descriptor(bytes: &[u8]) -> Result<Descriptor> {
    let mut cur = SectionCursor::new(bytes, Layer::Descriptor);
    let name = cur.read_string()?;
    let archetype = cur.read_u16()?;
    let lod_count = cur.read_u16()?;
    // Pairs need two length prefixes, 8 bytes minimum.
    let pair_count = cur.read_count(8)?;
    let mut metadata = Vec::with_capacity(pair_count);
    for _ in 0..pair_count {
        let key = cur.read_string()?;
        let value = cur.read_string()?;
        metadata.push((key, value));
    }
    cur.finish()?;
    Ok(Descriptor { name, archetype, lod_count, metadata })
}

fn parse_definition(bytes: &[u8]) -> Result<Definition> {
    let mut cur = SectionCursor::new(bytes, Layer::Definition);
    let joint_names = cur.read_string_vec()?;
    let joint_parents = cur.read_u16_vec()?;
    if joint_parents.len() != joint_names.len() {
        return Err(cur.corrupt(format!(
            "{} joints but {} parent entries",
            joint_names.len(),
            joint_parents.len()
        )));
    }
    let mesh_names = cur.read_string_vec()?;
    let blend_shape_channel_names = cur.read_string_vec()?;
    cur.finish()?;
    Ok(Definition { joint_names, joint_parents, mesh_names, blend_shape_channel_names })
}

fn parse_behavior(bytes: &[u8], mask: LayerMask) -> Result<Behavior> {
    let mut cur = SectionCursor::new(bytes, Layer::Behavior);
    let controls = Controls {
        input_indices: cur.read_u16_vec()?,
        output_indices: cur.read_u16_vec()?,
        slopes: cur.read_f32_vec()?,
        cuts: cur.read_f32_vec()?,
    };
    let joints = JointMatrix {
        row_count: cur.read_u16()?,
        col_count: cur.read_u16()?,
        values: cur.read_f32_vec()?,
    };
    if joints.values.len() != joints.row_count as usize * joints.col_count as usize {
        return Err(cur.corrupt("joint matrix value count does not match dimensions"));
    }

    let blend_shape_channels = read_blend_shape_sub_block(&mut cur, mask, |cur| {
        Ok(BlendShapeChannels {
            lods: cur.read_u16_vec()?,
            input_indices: cur.read_u16_vec()?,
            output_indices: cur.read_u16_vec()?,
        })
    })?;

    cur.finish()?;
    Ok(Behavior { controls, joints, blend_shape_channels })
}

fn parse_geometry(bytes: &[u8], mask: LayerMask) -> Result<Geometry> {
    let mut cur = SectionCursor::new(bytes, Layer::Geometry);
    let mesh_count = cur.read_count(2)?;
    let mut meshes = Vec::with_capacity(mesh_count);
    for _ in 0..mesh_count {
        let mesh_index = cur.read_u16()?;
        let positions = cur.read_vec3_vec()?;
        let texture_coordinates = cur.read_vec2_vec()?;
        let blend_shape_targets = read_blend_shape_sub_block(&mut cur, mask, |cur| {
            let target_count = cur.read_count(2)?;
            let mut targets = Vec::with_capacity(target_count);
            for _ in 0..target_count {
                let channel_index = cur.read_u16()?;
                let deltas = cur.read_vec3_vec()?;
                let vertex_indices = cur.read_u32_vec()?;
                if vertex_indices.len() != deltas.len() {
                    return Err(cur.corrupt("target delta/index count mismatch"));
                }
                targets.push(BlendShapeTarget { channel_index, deltas, vertex_indices });
            }
            Ok(targets)
        })?;
        meshes.push(Mesh { mesh_index, positions, texture_coordinates, blend_shape_targets });
    }
    cur.finish()?;
    Ok(Geometry { meshes })
}

/// Read one length-prefixed blend-shape sub-block.
///
/// Length 0 means the container carries no sub-block here. A non-empty
/// sub-block is parsed only when `BlendShapes` is in the mask; otherwise it
/// is skipped by its recorded length without interpretation.
fn read_blend_shape_sub_block<T>(
    cur: &mut SectionCursor<'_>,
    mask: LayerMask,
    parse: impl FnOnce(&mut SectionCursor<'_>) -> Result<T>,
) -> Result<Option<T>> {
    let len = cur.read_u64()?;
    if len == 0 {
        return Ok(None);
    }
    if !mask.contains(Layer::BlendShapes) {
        cur.skip(len)?;
        return Ok(None);
    }
    let before = cur.remaining();
    let value = parse(cur)?;
    let consumed = before - cur.remaining();
    if consumed != len {
        return Err(cur.corrupt(format!(
            "blend-shape sub-block consumed {} of {} bytes",
            consumed, len
        )));
    }
    Ok(Some(value))
}
