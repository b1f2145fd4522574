//! JSON writer for RDNA documents.
//!
//! Emits a complete, independently parseable UTF-8 JSON document whose
//! top-level keys are the layer names. Key order is canonical (container
//! field order) and stable: identical input produces byte-identical
//! output. Layers in the mask but absent from the document are omitted
//! silently — the document may have been read with a narrower mask than
//! the one requested here.

use serde_json::{Map, Value};
use tracing::debug;

use crate::document::*;
use crate::layer::{Layer, LayerMask};
use crate::rdna::format::CURRENT_VERSION;
use crate::rdna::stream::OStream;
use crate::util::Result;

/// Serializes one `(Document, mask)` pair as JSON.
pub struct JsonWriter<'d> {
    doc: &'d Document,
    mask: LayerMask,
}

impl<'d> JsonWriter<'d> {
    /// Record what will be serialized; no I/O happens until [`write`].
    /// The split lets callers inspect [`effective_layers`] before
    /// committing to an output file.
    ///
    /// [`write`]: JsonWriter::write
    /// [`effective_layers`]: JsonWriter::effective_layers
    pub fn set_from(doc: &'d Document, mask: LayerMask) -> Self {
        Self { doc, mask }
    }

    /// Layers that will actually appear in the output.
    pub fn effective_layers(&self) -> LayerMask {
        self.mask.intersection(self.doc.populated_layers())
    }

    /// Build the JSON value without touching any stream.
    pub fn to_value(&self) -> Value {
        let doc = self.doc;
        let mut root = Map::new();
        root.insert("signature".into(), Value::from("RDNA"));
        let version = if doc.version() == 0 { CURRENT_VERSION } else { doc.version() };
        root.insert("version".into(), Value::from(version));

        if self.mask.contains(Layer::Descriptor) {
            if let Some(desc) = doc.descriptor() {
                root.insert(Layer::Descriptor.json_key().into(), descriptor_value(desc));
            }
        }
        if self.mask.contains(Layer::Definition) {
            if let Some(def) = doc.definition() {
                root.insert(Layer::Definition.json_key().into(), definition_value(def));
            }
        }
        if self.mask.contains(Layer::Behavior) {
            if let Some(behavior) = doc.behavior() {
                root.insert(
                    Layer::Behavior.json_key().into(),
                    behavior_value(behavior, self.mask),
                );
            }
        }
        if self.mask.contains(Layer::Geometry) {
            if let Some(geometry) = doc.geometry() {
                root.insert(
                    Layer::Geometry.json_key().into(),
                    geometry_value(geometry, self.mask),
                );
            }
        }

        Value::Object(root)
    }

    /// Serialize to the output stream and flush it.
    ///
    /// Repeatable: writing the same pair twice yields byte-identical
    /// output. On a mid-write I/O failure the output file is left
    /// truncated; callers must treat it as unusable.
    pub fn write(&self, out: &mut OStream) -> Result<()> {
        debug!(layers = %self.effective_layers(), "writing JSON document");
        let value = self.to_value();
        let mut bytes =
            serde_json::to_vec_pretty(&value).map_err(|e| crate::util::Error::Io(e.into()))?;
        bytes.push(b'\n');
        out.write_bytes(&bytes)?;
        out.flush()
    }
}

// ============================================================================
// Per-layer value construction (canonical field order)
// ============================================================================

fn descriptor_value(desc: &Descriptor) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), Value::from(desc.name.as_str()));
    map.insert("archetype".into(), Value::from(desc.archetype));
    map.insert("lod_count".into(), Value::from(desc.lod_count));
    let mut meta = Map::new();
    for (key, value) in &desc.metadata {
        meta.insert(key.clone(), Value::from(value.as_str()));
    }
    map.insert("metadata".into(), Value::Object(meta));
    Value::Object(map)
}

fn definition_value(def: &Definition) -> Value {
    let mut map = Map::new();
    map.insert("joint_names".into(), string_array(&def.joint_names));
    map.insert("joint_parents".into(), u16_array(&def.joint_parents));
    map.insert("mesh_names".into(), string_array(&def.mesh_names));
    map.insert(
        "blend_shape_channel_names".into(),
        string_array(&def.blend_shape_channel_names),
    );
    Value::Object(map)
}

fn behavior_value(behavior: &Behavior, mask: LayerMask) -> Value {
    let mut map = Map::new();

    let mut controls = Map::new();
    controls.insert("input_indices".into(), u16_array(&behavior.controls.input_indices));
    controls.insert("output_indices".into(), u16_array(&behavior.controls.output_indices));
    controls.insert("slopes".into(), f32_array(&behavior.controls.slopes));
    controls.insert("cuts".into(), f32_array(&behavior.controls.cuts));
    map.insert("controls".into(), Value::Object(controls));

    let mut joints = Map::new();
    joints.insert("row_count".into(), Value::from(behavior.joints.row_count));
    joints.insert("col_count".into(), Value::from(behavior.joints.col_count));
    joints.insert("values".into(), f32_array(&behavior.joints.values));
    map.insert("joints".into(), Value::Object(joints));

    if mask.contains(Layer::BlendShapes) {
        if let Some(channels) = &behavior.blend_shape_channels {
            let mut bs = Map::new();
            bs.insert("lods".into(), u16_array(&channels.lods));
            bs.insert("input_indices".into(), u16_array(&channels.input_indices));
            bs.insert("output_indices".into(), u16_array(&channels.output_indices));
            map.insert("blend_shape_channels".into(), Value::Object(bs));
        }
    }

    Value::Object(map)
}

fn geometry_value(geometry: &Geometry, mask: LayerMask) -> Value {
    let mut map = Map::new();
    let meshes: Vec<Value> = geometry.meshes.iter().map(|m| mesh_value(m, mask)).collect();
    map.insert("meshes".into(), Value::Array(meshes));
    Value::Object(map)
}

fn mesh_value(mesh: &Mesh, mask: LayerMask) -> Value {
    let mut map = Map::new();
    map.insert("mesh_index".into(), Value::from(mesh.mesh_index));
    map.insert("positions".into(), vec3_array(&mesh.positions));
    map.insert("texture_coordinates".into(), vec2_array(&mesh.texture_coordinates));
    if mask.contains(Layer::BlendShapes) {
        if let Some(targets) = &mesh.blend_shape_targets {
            let targets: Vec<Value> = targets.iter().map(target_value).collect();
            map.insert("blend_shape_targets".into(), Value::Array(targets));
        }
    }
    Value::Object(map)
}

fn target_value(target: &BlendShapeTarget) -> Value {
    let mut map = Map::new();
    map.insert("channel_index".into(), Value::from(target.channel_index));
    map.insert("deltas".into(), vec3_array(&target.deltas));
    map.insert(
        "vertex_indices".into(),
        Value::Array(target.vertex_indices.iter().map(|i| Value::from(*i)).collect()),
    );
    Value::Object(map)
}

fn string_array(strings: &[String]) -> Value {
    Value::Array(strings.iter().map(|s| Value::from(s.as_str())).collect())
}

fn u16_array(values: &[u16]) -> Value {
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}

// f32 embeds into a JSON number through f64 without losing precision.
fn f32_array(values: &[f32]) -> Value {
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}

fn vec3_array(values: &[[f32; 3]]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| Value::Array(vec![Value::from(v[0]), Value::from(v[1]), Value::from(v[2])]))
            .collect(),
    )
}

fn vec2_array(values: &[[f32; 2]]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| Value::Array(vec![Value::from(v[0]), Value::from(v[1])]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Document {
        Document {
            version: CURRENT_VERSION,
            descriptor: Some(Descriptor {
                name: "Rig01".into(),
                archetype: 1,
                lod_count: 4,
                metadata: vec![("author".into(), "test".into())],
            }),
            behavior: Some(Behavior {
                blend_shape_channels: Some(BlendShapeChannels {
                    lods: vec![0],
                    input_indices: vec![0],
                    output_indices: vec![0],
                }),
                ..Behavior::default()
            }),
            ..Document::default()
        }
    }

    #[test]
    fn test_canonical_key_order() {
        let doc = sample_doc();
        let value = JsonWriter::set_from(&doc, LayerMask::ALL).to_value();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["signature", "version", "descriptor", "behavior"]);
    }

    #[test]
    fn test_mask_omits_layers() {
        let doc = sample_doc();
        let value =
            JsonWriter::set_from(&doc, LayerMask::single(Layer::Descriptor)).to_value();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("descriptor"));
        assert!(!obj.contains_key("behavior"));
    }

    #[test]
    fn test_blend_shape_gating() {
        let doc = sample_doc();

        let full = JsonWriter::set_from(&doc, LayerMask::ALL).to_value();
        assert!(full["behavior"].get("blend_shape_channels").is_some());

        let trimmed =
            JsonWriter::set_from(&doc, LayerMask::ALL_EXCEPT_BLEND_SHAPES).to_value();
        assert!(trimmed["behavior"].get("blend_shape_channels").is_none());
        assert!(trimmed["behavior"].get("controls").is_some());
    }

    #[test]
    fn test_value_is_deterministic() {
        let doc = sample_doc();
        let writer = JsonWriter::set_from(&doc, LayerMask::ALL);
        let a = serde_json::to_vec_pretty(&writer.to_value()).unwrap();
        let b = serde_json::to_vec_pretty(&writer.to_value()).unwrap();
        assert_eq!(a, b);
    }
}
