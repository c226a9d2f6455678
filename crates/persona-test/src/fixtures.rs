//! Fixture models
//!
//! Built directly as node trees, except [`RIGGED_GLTF`] which goes through
//! the real glTF decoder. [`FixtureDecoder`] lets the acquisition pipeline
//! serve the tree fixtures by name: asset bytes `fixture:rigged` decode to
//! [`rigged_model`] and so on.

use persona_anim::{Clip, Track, TrackProperty, TrackTarget};
use persona_core::{PersonaError, PersonaResult};
use persona_runtime::{ModelAsset, ModelDecoder};
use persona_scene::{
    Axis, Color, Geometry, Material, MeshData, MorphTargets, NodeData, NodeTree, Transform,
};

/// Blend shapes on the fixture face mesh
pub const FACE_MORPHS: [&str; 6] = [
    "mouthOpen",
    "mouthSmile",
    "mouthFrown",
    "eyesConfident",
    "browInnerUp",
    "eyesClosed",
];

fn buffer_mesh(name: &str, morphs: &[&str]) -> NodeData {
    let mut mesh = MeshData::new(
        Geometry::Buffer {
            vertex_count: 256,
            index_count: 1024,
        },
        Material::standard(Color::from_hex(0xd9a066), 0.5, 0.0),
    );
    if !morphs.is_empty() {
        mesh = mesh.with_morph(MorphTargets::from_names(morphs.iter().copied()));
    }
    NodeData::mesh(name, mesh)
}

/// Humanoid with a full skeleton, a morph-capable face and named clips
pub fn rigged_model() -> ModelAsset {
    let mut t = NodeTree::new(NodeData::group("Armature"));
    let hips = t.add(NodeData::bone("Hips").with_transform(Transform::at(0.0, 1.0, 0.0)), 0);
    let spine = t.add(NodeData::bone("Spine"), hips);
    let neck = t.add(NodeData::bone("Neck"), spine);
    let head = t.add(NodeData::bone("Head").with_transform(Transform::at(0.0, 0.6, 0.0)), neck);
    t.add(NodeData::bone("Jaw"), head);
    t.add(NodeData::bone("LeftShoulder"), spine);
    t.add(NodeData::bone("RightShoulder"), spine);

    t.add(buffer_mesh("Wolf3D_Head", &FACE_MORPHS), 0);
    t.add(buffer_mesh("Wolf3D_Teeth", &["mouthOpen"]), 0);
    t.add(buffer_mesh("EyeLeft", &[]), 0);
    t.add(buffer_mesh("EyeRight", &[]), 0);
    t.add(buffer_mesh("Wolf3D_Outfit_Suit", &[]), 0);
    t.add(buffer_mesh("Wolf3D_Outfit_Shirt", &[]), 0);

    let clips = vec![
        Clip::new(
            "Idle",
            2.0,
            vec![Track::new(
                TrackTarget::Local(spine),
                TrackProperty::Rotation(Axis::X),
                vec![0.0, 1.0, 2.0],
                vec![0.0, 0.01, 0.0],
            )],
        ),
        Clip::new(
            "Talking",
            1.5,
            vec![Track::new(
                TrackTarget::Local(head),
                TrackProperty::Rotation(Axis::Y),
                vec![0.0, 0.75, 1.5],
                vec![-0.05, 0.05, -0.05],
            )],
        ),
        Clip::new(
            "Listening",
            1.0,
            vec![Track::new(
                TrackTarget::Local(head),
                TrackProperty::Rotation(Axis::Z),
                vec![0.0, 1.0],
                vec![0.0, 0.04],
            )],
        ),
    ];
    ModelAsset::new(t, clips)
}

/// Prop with a single plain mesh named `mouth_piece`: no joints, no blend
/// shapes, no clips
pub fn mouth_piece_model() -> ModelAsset {
    let mut t = NodeTree::new(NodeData::group("prop"));
    t.add(buffer_mesh("mouth_piece", &[]), 0);
    ModelAsset::new(t, Vec::new())
}

/// Model nothing in the avatar can drive
pub fn inert_model() -> ModelAsset {
    let mut t = NodeTree::new(NodeData::group("statue"));
    t.add(buffer_mesh("pedestal", &[]), 0);
    ModelAsset::new(t, Vec::new())
}

/// Decodes `fixture:<name>` byte strings into the fixtures above
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureDecoder;

impl ModelDecoder for FixtureDecoder {
    fn name(&self) -> &str {
        "fixture"
    }

    fn decode(&self, path: &str, bytes: &[u8]) -> PersonaResult<ModelAsset> {
        match bytes {
            b"fixture:rigged" => Ok(rigged_model()),
            b"fixture:mouth_piece" => Ok(mouth_piece_model()),
            b"fixture:inert" => Ok(inert_model()),
            _ => Err(PersonaError::DecodeFailed {
                path: path.to_string(),
                reason: "unknown fixture".to_string(),
            }),
        }
    }
}

/// glTF document with a two-joint skin, a face mesh carrying a `mouthOpen`
/// target at weight 0.25 and a one-second `Idle` scale animation
pub const RIGGED_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "scene": 0,
    "scenes": [{ "nodes": [0] }],
    "nodes": [
        { "name": "Armature", "children": [1, 3] },
        { "name": "Spine", "children": [2] },
        { "name": "Head", "translation": [0.0, 0.5, 0.0] },
        { "name": "Wolf3D_Head", "mesh": 0 }
    ],
    "skins": [{ "joints": [1, 2] }],
    "meshes": [{
        "name": "Face",
        "primitives": [{ "attributes": { "POSITION": 2 }, "targets": [{ "POSITION": 3 }] }],
        "weights": [0.25],
        "extras": { "targetNames": ["mouthOpen"] }
    }],
    "animations": [{
        "name": "Idle",
        "channels": [{ "sampler": 0, "target": { "node": 0, "path": "scale" } }],
        "samplers": [{ "input": 0, "output": 1, "interpolation": "LINEAR" }]
    }],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
        { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" },
        { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
        { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [0.0, 0.1, 0.0] }
    ],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 8 },
        { "buffer": 0, "byteOffset": 8, "byteLength": 24 },
        { "buffer": 0, "byteOffset": 32, "byteLength": 36 },
        { "buffer": 0, "byteOffset": 68, "byteLength": 36 }
    ],
    "buffers": [{
        "byteLength": 104,
        "uri": "data:application/octet-stream;base64,AAAAAAAAgD8AAIA/AACAPwAAgD8AAABAAAAAQAAAAEAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAAAAAAAAAzczMPQAAAAAAAAAAAAAAAAAAAAA="
    }]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::ModelGeneration;
    use persona_scene::{JointRole, MeshRole, RigIndex, Scene};

    fn index(asset: ModelAsset) -> RigIndex {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(asset.tree, scene.root()).unwrap();
        RigIndex::build(&scene, ids[0], ModelGeneration(1))
    }

    #[test]
    fn test_rigged_model_roles() {
        let rig = index(rigged_model());
        for role in JointRole::all() {
            assert!(rig.joint(*role).is_some(), "missing joint {:?}", role);
        }
        assert!(rig.face_mesh().is_some());
        assert_eq!(rig.morph_meshes().len(), 2);
        assert_eq!(rig.meshes(MeshRole::Eye).len(), 2);
    }

    #[test]
    fn test_mouth_piece_model_roles() {
        let rig = index(mouth_piece_model());
        assert_eq!(rig.joint_count(), 0);
        assert!(rig.morph_meshes().is_empty());
        assert_eq!(rig.mouth_meshes().len(), 1);
    }

    #[test]
    fn test_fixture_decoder() {
        let decoder = FixtureDecoder;
        assert_eq!(decoder.decode("a", b"fixture:rigged").unwrap().clips.len(), 3);
        assert!(decoder.decode("a", b"fixture:inert").unwrap().clips.is_empty());
        assert!(matches!(
            decoder.decode("a", b"glTF"),
            Err(PersonaError::DecodeFailed { .. })
        ));
    }
}
