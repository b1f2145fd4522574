//! Integration tests for the transcode pipeline and the JSON output.

use rigdna::document::{
    Behavior, BlendShapeChannels, BlendShapeTarget, Controls, Definition, Descriptor, Document,
    Geometry, JointMatrix, Mesh,
};
use rigdna::{
    transcode, BinaryReader, BinaryWriter, Error, JsonWriter, Layer, LayerMask, OStream,
};

use serde_json::Value;
use tempfile::{tempdir, NamedTempFile};

fn fixture_doc() -> Document {
    Document::builder()
        .descriptor(Descriptor {
            name: "Rig01".into(),
            archetype: 1,
            lod_count: 2,
            metadata: vec![("studio".into(), "test".into())],
        })
        .definition(Definition {
            joint_names: vec!["root".into(), "jaw".into(), "eye_l".into()],
            joint_parents: vec![0, 0, 0],
            mesh_names: vec!["face".into()],
            blend_shape_channel_names: (0..12).map(|i| format!("channel_{i}")).collect(),
        })
        .behavior(Behavior {
            controls: Controls {
                input_indices: vec![0, 1],
                output_indices: vec![1, 0],
                slopes: vec![1.0, 0.75],
                cuts: vec![0.0, 0.25],
            },
            joints: JointMatrix { row_count: 1, col_count: 2, values: vec![0.5, 1.5] },
            blend_shape_channels: Some(BlendShapeChannels {
                lods: vec![0; 12],
                input_indices: (0..12).collect(),
                output_indices: (0..12).collect(),
            }),
        })
        .geometry(Geometry {
            meshes: vec![Mesh {
                mesh_index: 0,
                positions: vec![[1.5, -2.25, 0.125]],
                texture_coordinates: vec![[0.5, 0.5]],
                blend_shape_targets: Some(vec![BlendShapeTarget {
                    channel_index: 3,
                    deltas: vec![[0.0, 0.0, 1.0]],
                    vertex_indices: vec![0],
                }]),
            }],
        })
        .build()
}

fn write_container(path: &std::path::Path, mask: LayerMask) {
    let doc = fixture_doc();
    let mut out = OStream::create(path).expect("create container");
    BinaryWriter::set_from(&doc, mask).write(&mut out).expect("write container");
}

fn parse_json(path: &std::path::Path) -> Value {
    let bytes = std::fs::read(path).expect("read json output");
    serde_json::from_slice(&bytes).expect("output is parseable JSON")
}

#[test]
fn test_transcode_full_roundtrip_values() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rig.rdna");
    let output = dir.path().join("rig.json");
    write_container(&input, LayerMask::ALL);

    transcode(&input, &output, LayerMask::ALL).unwrap();

    let json = parse_json(&output);
    assert_eq!(json["signature"], "RDNA");
    assert_eq!(json["descriptor"]["name"], "Rig01");
    assert_eq!(json["descriptor"]["metadata"]["studio"], "test");
    assert_eq!(json["definition"]["joint_names"].as_array().unwrap().len(), 3);
    assert_eq!(json["definition"]["joint_parents"], serde_json::json!([0, 0, 0]));
    assert_eq!(json["behavior"]["joints"]["values"], serde_json::json!([0.5, 1.5]));
    // f32 values survive exactly: the fixture uses dyadic fractions.
    assert_eq!(
        json["geometry"]["meshes"][0]["positions"][0],
        serde_json::json!([1.5, -2.25, 0.125])
    );
    assert_eq!(
        json["behavior"]["blend_shape_channels"]["output_indices"]
            .as_array()
            .unwrap()
            .len(),
        12
    );
}

#[test]
fn test_transcode_all_except_blend_shapes_scenario() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rig.rdna");
    let output = dir.path().join("rig.json");
    write_container(&input, LayerMask::ALL);

    transcode(&input, &output, LayerMask::ALL_EXCEPT_BLEND_SHAPES).unwrap();

    let json = parse_json(&output);
    // Descriptor and definition in full.
    assert_eq!(json["descriptor"]["name"], "Rig01");
    assert_eq!(
        json["definition"]["blend_shape_channel_names"].as_array().unwrap().len(),
        12
    );
    // Behavior present, blend-shape sub-fields absent.
    let behavior = json["behavior"].as_object().unwrap();
    assert!(behavior.contains_key("controls"));
    assert!(behavior.contains_key("joints"));
    assert!(!behavior.contains_key("blend_shape_channels"));
    // Geometry meshes present without targets.
    let mesh = json["geometry"]["meshes"][0].as_object().unwrap();
    assert!(mesh.contains_key("positions"));
    assert!(!mesh.contains_key("blend_shape_targets"));
}

#[test]
fn test_omission_semantics_wide_write_mask() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rig.rdna");
    write_container(&input, LayerMask::ALL);

    // Read narrow, write wide: only the populated layer may appear.
    let doc = BinaryReader::open(&input)
        .unwrap()
        .read(LayerMask::single(Layer::Descriptor))
        .unwrap();
    let json = JsonWriter::set_from(&doc, LayerMask::ALL).to_value();
    let obj = json.as_object().unwrap();

    assert!(obj.contains_key("descriptor"));
    for key in ["definition", "behavior", "geometry"] {
        assert!(!obj.contains_key(key), "{key} should be omitted");
    }
}

#[test]
fn test_idempotent_json_write() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rig.rdna");
    write_container(&input, LayerMask::ALL);
    let doc = BinaryReader::open(&input).unwrap().read(LayerMask::ALL).unwrap();

    let writer = JsonWriter::set_from(&doc, LayerMask::ALL);
    let out_a = dir.path().join("a.json");
    let out_b = dir.path().join("b.json");
    for path in [&out_a, &out_b] {
        let mut out = OStream::create(path).unwrap();
        writer.write(&mut out).unwrap();
    }

    assert_eq!(std::fs::read(&out_a).unwrap(), std::fs::read(&out_b).unwrap());
}

#[test]
fn test_output_key_order_is_canonical() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rig.rdna");
    let output = dir.path().join("rig.json");
    write_container(&input, LayerMask::ALL);

    transcode(&input, &output, LayerMask::ALL).unwrap();

    let json = parse_json(&output);
    let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["signature", "version", "descriptor", "definition", "behavior", "geometry"]
    );
}

#[test]
fn test_transcode_missing_input_surfaces_error() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.json");

    let err = transcode(dir.path().join("missing.rdna"), &output, LayerMask::ALL).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    // The failure happened before the output stream was ever opened.
    assert!(!output.exists());
}

#[test]
fn test_transcode_bad_signature_surfaces_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("rig.rdna");
    let output = dir.path().join("out.json");
    std::fs::write(&input, b"not a container at all").unwrap();

    let err = transcode(&input, &output, LayerMask::ALL).unwrap_err();
    assert!(matches!(err, Error::BadSignature));
    assert!(err.is_format_error());
    assert!(!output.exists());
}

#[test]
fn test_layer_selection_names_match_entry_point() {
    // The six selections the presentation layer may pass.
    let selections = [
        ("all", LayerMask::ALL),
        ("descriptor", LayerMask::single(Layer::Descriptor)),
        ("definition", LayerMask::single(Layer::Definition)),
        ("behavior", LayerMask::single(Layer::Behavior)),
        ("geometry", LayerMask::single(Layer::Geometry)),
        ("all-except-blend-shapes", LayerMask::ALL_EXCEPT_BLEND_SHAPES),
    ];
    for (name, mask) in selections {
        assert_eq!(name.parse::<LayerMask>().unwrap(), mask);
    }

    let temp = NamedTempFile::new().unwrap();
    write_container(temp.path(), LayerMask::ALL);
    let dir = tempdir().unwrap();
    for (name, mask) in selections {
        let output = dir.path().join(format!("{name}.json"));
        transcode(temp.path(), &output, mask).unwrap();
        assert!(parse_json(&output).is_object());
    }
}
