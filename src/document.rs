//! In-memory representation of a parsed RDNA container.
//!
//! A [`Document`] is produced by exactly one
//! [`BinaryReader::read`](crate::rdna::BinaryReader::read) call and is
//! read-only afterwards: the API hands out shared references only.

use crate::layer::{Layer, LayerMask};

/// Root of a parsed container: format metadata plus the populated layers.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub(crate) version: u16,
    pub(crate) descriptor: Option<Descriptor>,
    pub(crate) definition: Option<Definition>,
    pub(crate) behavior: Option<Behavior>,
    pub(crate) geometry: Option<Geometry>,
}

impl Document {
    /// Start building a document for authoring.
    ///
    /// Reading already yields fully formed documents; the builder exists
    /// for the write side (fixtures, tooling) and keeps the result as
    /// immutable as a parsed one.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder { doc: Document::default() }
    }

    /// Container format version this document was read from.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    #[inline]
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    #[inline]
    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_ref()
    }

    #[inline]
    pub fn behavior(&self) -> Option<&Behavior> {
        self.behavior.as_ref()
    }

    #[inline]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Which layers actually carry data in this document.
    ///
    /// `BlendShapes` counts as populated when either the behavior channels
    /// sub-block or any mesh target sub-block was parsed.
    pub fn populated_layers(&self) -> LayerMask {
        let mut mask = LayerMask::empty();
        if self.descriptor.is_some() {
            mask.insert(Layer::Descriptor);
        }
        if self.definition.is_some() {
            mask.insert(Layer::Definition);
        }
        if self.behavior.is_some() {
            mask.insert(Layer::Behavior);
        }
        if self.geometry.is_some() {
            mask.insert(Layer::Geometry);
        }
        let behavior_bs = self
            .behavior
            .as_ref()
            .is_some_and(|b| b.blend_shape_channels.is_some());
        let geometry_bs = self
            .geometry
            .as_ref()
            .is_some_and(|g| g.meshes.iter().any(|m| m.blend_shape_targets.is_some()));
        if behavior_bs || geometry_bs {
            mask.insert(Layer::BlendShapes);
        }
        mask
    }
}

/// Builder for authored documents; see [`Document::builder`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn descriptor(mut self, descriptor: Descriptor) -> Self {
        self.doc.descriptor = Some(descriptor);
        self
    }

    pub fn definition(mut self, definition: Definition) -> Self {
        self.doc.definition = Some(definition);
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.doc.behavior = Some(behavior);
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.doc.geometry = Some(geometry);
        self
    }

    pub fn build(self) -> Document {
        self.doc
    }
}

/// Rig identity and free-form metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub archetype: u16,
    pub lod_count: u16,
    /// Ordered key/value pairs; order is preserved through transcoding.
    pub metadata: Vec<(String, String)>,
}

/// Name tables and the joint hierarchy.
///
/// `joint_parents[i]` is the parent of joint `i`; a root joint points at
/// its own index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    pub joint_names: Vec<String>,
    pub joint_parents: Vec<u16>,
    pub mesh_names: Vec<String>,
    pub blend_shape_channel_names: Vec<String>,
}

/// Evaluation data: control conditional table, joint matrix, and the
/// optional blend-shape channel sub-block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Behavior {
    pub controls: Controls,
    pub joints: JointMatrix,
    /// Present only when the BlendShapes layer was selected at read time
    /// and the container carried the sub-block.
    pub blend_shape_channels: Option<BlendShapeChannels>,
}

/// Piecewise-linear control mapping (input index, output index, slope, cut
/// per segment).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Controls {
    pub input_indices: Vec<u16>,
    pub output_indices: Vec<u16>,
    pub slopes: Vec<f32>,
    pub cuts: Vec<f32>,
}

/// Dense row-major joint evaluation matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointMatrix {
    pub row_count: u16,
    pub col_count: u16,
    pub values: Vec<f32>,
}

/// Blend-shape channel wiring. Indices reference
/// [`Definition::blend_shape_channel_names`] and are retained raw even when
/// the Definition layer was not read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendShapeChannels {
    pub lods: Vec<u16>,
    pub input_indices: Vec<u16>,
    pub output_indices: Vec<u16>,
}

impl BlendShapeChannels {
    /// Number of channels wired in this rig.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.output_indices.len()
    }
}

/// Per-mesh vertex data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub meshes: Vec<Mesh>,
}

/// One mesh. `mesh_index` references [`Definition::mesh_names`] and is
/// retained raw; validity is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub mesh_index: u16,
    pub positions: Vec<[f32; 3]>,
    pub texture_coordinates: Vec<[f32; 2]>,
    /// Present only when the BlendShapes layer was selected at read time.
    pub blend_shape_targets: Option<Vec<BlendShapeTarget>>,
}

/// Sparse per-vertex deltas for one blend-shape channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendShapeTarget {
    pub channel_index: u16,
    pub deltas: Vec<[f32; 3]>,
    pub vertex_indices: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_populates_nothing() {
        let doc = Document::default();
        assert!(doc.populated_layers().is_empty());
    }

    #[test]
    fn test_populated_layers_tracks_blend_shapes() {
        let mut doc = Document {
            behavior: Some(Behavior::default()),
            ..Document::default()
        };
        assert!(doc.populated_layers().contains(Layer::Behavior));
        assert!(!doc.populated_layers().contains(Layer::BlendShapes));

        doc.behavior.as_mut().unwrap().blend_shape_channels =
            Some(BlendShapeChannels::default());
        assert!(doc.populated_layers().contains(Layer::BlendShapes));
    }
}
