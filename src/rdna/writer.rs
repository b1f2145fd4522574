//! RDNA binary writer.
//!
//! Authors a container from a [`Document`] filtered by a [`LayerMask`].
//! The table of contents is written as a placeholder after the header and
//! patched once the sections are laid down and their offsets are known.

use tracing::{debug, trace};

use super::format::*;
use super::stream::OStream;
use crate::document::*;
use crate::layer::{Layer, LayerMask};
use crate::util::Result;

/// Writes one `(Document, mask)` pair as a binary container.
pub struct BinaryWriter<'d> {
    doc: &'d Document,
    mask: LayerMask,
}

impl<'d> BinaryWriter<'d> {
    /// Record what will be serialized; no I/O happens until [`write`].
    ///
    /// [`write`]: BinaryWriter::write
    pub fn set_from(doc: &'d Document, mask: LayerMask) -> Self {
        Self { doc, mask }
    }

    /// Layers that will actually be emitted: section layers in the mask
    /// that are also populated in the document.
    pub fn effective_layers(&self) -> LayerMask {
        self.mask.intersection(self.doc.populated_layers())
    }

    /// Serialize the container. Repeatable: the same pair produces
    /// byte-identical output on every call.
    pub fn write(&self, out: &mut OStream) -> Result<()> {
        let doc = self.doc;
        let sections: Vec<Layer> = [
            Layer::Descriptor,
            Layer::Definition,
            Layer::Behavior,
            Layer::Geometry,
        ]
        .into_iter()
        .filter(|layer| self.mask.contains(*layer))
        .filter(|layer| match layer {
            Layer::Descriptor => doc.descriptor.is_some(),
            Layer::Definition => doc.definition.is_some(),
            Layer::Behavior => doc.behavior.is_some(),
            Layer::Geometry => doc.geometry.is_some(),
            Layer::BlendShapes => false,
        })
        .collect();

        let version = if doc.version() == 0 { CURRENT_VERSION } else { doc.version() };
        debug!(version, sections = sections.len(), mask = %self.mask, "writing RDNA container");

        // Header.
        out.write_bytes(RDNA_MAGIC)?;
        out.write_u16(version)?;
        out.write_u16(sections.len() as u16)?;
        let toc_offset = HEADER_SIZE as u64;
        out.write_u64(toc_offset)?;

        // Placeholder TOC, patched below.
        for _ in 0..sections.len() {
            out.write_u32(0)?;
            out.write_u64(0)?;
            out.write_u64(0)?;
        }

        // Sections, recording their final positions.
        let mut entries = Vec::with_capacity(sections.len());
        for layer in &sections {
            let offset = out.pos();
            match layer {
                Layer::Descriptor => {
                    write_descriptor(out, doc.descriptor().expect("filtered above"))?
                }
                Layer::Definition => {
                    write_definition(out, doc.definition().expect("filtered above"))?
                }
                Layer::Behavior => {
                    write_behavior(out, doc.behavior().expect("filtered above"), self.mask)?
                }
                Layer::Geometry => {
                    write_geometry(out, doc.geometry().expect("filtered above"), self.mask)?
                }
                Layer::BlendShapes => unreachable!("blend shapes have no section"),
            }
            let length = out.pos() - offset;
            trace!(%layer, offset, length, "section written");
            entries.push(TocEntry {
                layer_id: layer.section_id().expect("section layers only"),
                offset,
                length,
            });
        }

        // Patch the TOC.
        out.seek(toc_offset)?;
        for entry in &entries {
            out.write_u32(entry.layer_id)?;
            out.write_u64(entry.offset)?;
            out.write_u64(entry.length)?;
        }
        out.seek_end()?;
        out.flush()
    }
}

// ============================================================================
// Section encoding
// ============================================================================

fn write_string(out: &mut OStream, s: &str) -> Result<()> {
    out.write_u32(s.len() as u32)?;
    out.write_bytes(s.as_bytes())
}

fn write_string_vec(out: &mut OStream, strings: &[String]) -> Result<()> {
    out.write_u32(strings.len() as u32)?;
    for s in strings {
        write_string(out, s)?;
    }
    Ok(())
}

fn write_u16_vec(out: &mut OStream, values: &[u16]) -> Result<()> {
    out.write_u32(values.len() as u32)?;
    for v in values {
        out.write_u16(*v)?;
    }
    Ok(())
}

fn write_f32_vec(out: &mut OStream, values: &[f32]) -> Result<()> {
    out.write_u32(values.len() as u32)?;
    for v in values {
        out.write_f32(*v)?;
    }
    Ok(())
}

fn write_vec3_vec(out: &mut OStream, values: &[[f32; 3]]) -> Result<()> {
    out.write_u32(values.len() as u32)?;
    for v in values {
        out.write_f32(v[0])?;
        out.write_f32(v[1])?;
        out.write_f32(v[2])?;
    }
    Ok(())
}

fn write_vec2_vec(out: &mut OStream, values: &[[f32; 2]]) -> Result<()> {
    out.write_u32(values.len() as u32)?;
    for v in values {
        out.write_f32(v[0])?;
        out.write_f32(v[1])?;
    }
    Ok(())
}

fn write_descriptor(out: &mut OStream, desc: &Descriptor) -> Result<()> {
    write_string(out, &desc.name)?;
    out.write_u16(desc.archetype)?;
    out.write_u16(desc.lod_count)?;
    out.write_u32(desc.metadata.len() as u32)?;
    for (key, value) in &desc.metadata {
        write_string(out, key)?;
        write_string(out, value)?;
    }
    Ok(())
}

fn write_definition(out: &mut OStream, def: &Definition) -> Result<()> {
    write_string_vec(out, &def.joint_names)?;
    write_u16_vec(out, &def.joint_parents)?;
    write_string_vec(out, &def.mesh_names)?;
    write_string_vec(out, &def.blend_shape_channel_names)
}

fn write_behavior(out: &mut OStream, behavior: &Behavior, mask: LayerMask) -> Result<()> {
    write_u16_vec(out, &behavior.controls.input_indices)?;
    write_u16_vec(out, &behavior.controls.output_indices)?;
    write_f32_vec(out, &behavior.controls.slopes)?;
    write_f32_vec(out, &behavior.controls.cuts)?;
    out.write_u16(behavior.joints.row_count)?;
    out.write_u16(behavior.joints.col_count)?;
    write_f32_vec(out, &behavior.joints.values)?;

    let channels = behavior
        .blend_shape_channels
        .as_ref()
        .filter(|_| mask.contains(Layer::BlendShapes));
    match channels {
        Some(channels) => {
            let block = channels_block(channels);
            out.write_u64(block.len() as u64)?;
            out.write_bytes(&block)
        }
        None => out.write_u64(0),
    }
}

fn write_geometry(out: &mut OStream, geometry: &Geometry, mask: LayerMask) -> Result<()> {
    out.write_u32(geometry.meshes.len() as u32)?;
    for mesh in &geometry.meshes {
        out.write_u16(mesh.mesh_index)?;
        write_vec3_vec(out, &mesh.positions)?;
        write_vec2_vec(out, &mesh.texture_coordinates)?;

        let targets = mesh
            .blend_shape_targets
            .as_ref()
            .filter(|_| mask.contains(Layer::BlendShapes));
        match targets {
            Some(targets) => {
                let block = targets_block(targets);
                out.write_u64(block.len() as u64)?;
                out.write_bytes(&block)?;
            }
            None => out.write_u64(0)?,
        }
    }
    Ok(())
}

// Sub-block bodies are built in memory first: the length prefix has to be
// known before the body is written.

fn channels_block(channels: &BlendShapeChannels) -> Vec<u8> {
    let mut buf = Vec::new();
    push_u16_vec(&mut buf, &channels.lods);
    push_u16_vec(&mut buf, &channels.input_indices);
    push_u16_vec(&mut buf, &channels.output_indices);
    buf
}

fn targets_block(targets: &[BlendShapeTarget]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(targets.len() as u32).to_le_bytes());
    for target in targets {
        buf.extend_from_slice(&target.channel_index.to_le_bytes());
        buf.extend_from_slice(&(target.deltas.len() as u32).to_le_bytes());
        for d in &target.deltas {
            buf.extend_from_slice(&d[0].to_le_bytes());
            buf.extend_from_slice(&d[1].to_le_bytes());
            buf.extend_from_slice(&d[2].to_le_bytes());
        }
        buf.extend_from_slice(&(target.vertex_indices.len() as u32).to_le_bytes());
        for i in &target.vertex_indices {
            buf.extend_from_slice(&i.to_le_bytes());
        }
    }
    buf
}

fn push_u16_vec(buf: &mut Vec<u8>, values: &[u16]) {
    buf.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerMask;

    #[test]
    fn test_effective_layers_excludes_unpopulated() {
        let doc = Document {
            descriptor: Some(Descriptor { name: "x".into(), ..Descriptor::default() }),
            ..Document::default()
        };
        let writer = BinaryWriter::set_from(&doc, LayerMask::ALL);
        let effective = writer.effective_layers();
        assert!(effective.contains(Layer::Descriptor));
        assert!(!effective.contains(Layer::Geometry));
    }

    #[test]
    fn test_channels_block_layout() {
        let channels = BlendShapeChannels {
            lods: vec![0],
            input_indices: vec![1, 2],
            output_indices: vec![3, 4],
        };
        let block = channels_block(&channels);
        // Three count prefixes plus five u16 values.
        assert_eq!(block.len(), 3 * 4 + 5 * 2);
        assert_eq!(&block[0..4], &1u32.to_le_bytes());
    }
}
