//! glTF decoder
//!
//! Builds a detached [`NodeTree`] from the default scene of a glTF or GLB
//! document. Skin joints become bones, nodes with a mesh become meshes
//! (with blend shapes named from the mesh's `targetNames` extra), the rest
//! become groups. Animations become clips whose tracks target local tree
//! indices.
//!
//! Rotation channels are converted to Euler components per key and
//! interpolated per component.

use std::collections::{HashMap, HashSet};

use gltf::animation::util::ReadOutputs;
use persona_anim::{Clip, Interpolation, Track, TrackProperty, TrackTarget};
use persona_core::{PersonaError, PersonaResult};
use persona_scene::{
    Axis, Color, Geometry, Material, MeshData, MorphTargets, NodeData, NodeTree, Quat, Transform,
    Vec3,
};
use serde::Deserialize;
use tracing::debug;

use crate::{ModelAsset, ModelDecoder};

#[derive(Deserialize)]
struct MeshExtras {
    #[serde(rename = "targetNames", default)]
    target_names: Vec<String>,
}

/// Decoder for glTF 2.0 documents, JSON or binary
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfDecoder;

impl GltfDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ModelDecoder for GltfDecoder {
    fn name(&self) -> &str {
        "gltf"
    }

    fn decode(&self, path: &str, bytes: &[u8]) -> PersonaResult<ModelAsset> {
        let failed = |reason: String| PersonaError::DecodeFailed {
            path: path.to_string(),
            reason,
        };

        let (document, buffers, _images) =
            gltf::import_slice(bytes).map_err(|e| failed(e.to_string()))?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| failed("document has no scene".to_string()))?;

        let joints: HashSet<usize> = document
            .skins()
            .flat_map(|skin| skin.joints().map(|j| j.index()).collect::<Vec<_>>())
            .collect();

        let mut tree = NodeTree::new(NodeData::group(model_name(path)));
        // glTF node index → local tree index
        let mut local: HashMap<usize, usize> = HashMap::new();
        let mut stack: Vec<(gltf::Node<'_>, usize)> = scene.nodes().map(|n| (n, 0)).collect();
        stack.reverse();

        while let Some((node, parent)) = stack.pop() {
            if local.contains_key(&node.index()) {
                continue;
            }
            let index = tree.add(node_data(&node, &joints), parent);
            local.insert(node.index(), index);
            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push((child, index));
            }
        }

        let clips = read_clips(&document, &buffers, &local);
        debug!(
            path,
            nodes = tree.len(),
            joints = joints.len(),
            clips = clips.len(),
            "glTF decoded"
        );
        Ok(ModelAsset::new(tree, clips))
    }
}

/// File stem of the asset path
fn model_name(path: &str) -> String {
    let file = path.rsplit(&['/', '\\'][..]).next().unwrap_or(path);
    let stem = file.split('.').next().unwrap_or(file);
    if stem.is_empty() {
        "model".to_string()
    } else {
        stem.to_string()
    }
}

fn node_data(node: &gltf::Node<'_>, joints: &HashSet<usize>) -> NodeData {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        position: Vec3::from(translation),
        rotation: Quat::from_xyzw(rotation).to_euler(),
        scale: Vec3::from(scale),
    };

    let data = match node.mesh() {
        Some(mesh) => NodeData::mesh(name, mesh_data(&mesh)),
        None if joints.contains(&node.index()) => NodeData::bone(name),
        None => NodeData::group(name),
    };
    data.with_transform(transform)
}

fn mesh_data(mesh: &gltf::Mesh<'_>) -> MeshData {
    let primitives: Vec<gltf::Primitive<'_>> = mesh.primitives().collect();
    let vertex_count = primitives
        .iter()
        .filter_map(|p| p.get(&gltf::Semantic::Positions))
        .map(|a| a.count())
        .sum();
    let index_count = primitives
        .iter()
        .filter_map(|p| p.indices())
        .map(|a| a.count())
        .sum();

    let material = primitives
        .first()
        .map(|p| {
            let m = p.material();
            let pbr = m.pbr_metallic_roughness();
            let [r, g, b, _] = pbr.base_color_factor();
            let mut material =
                Material::standard(Color::new(r, g, b), pbr.roughness_factor(), pbr.metallic_factor());
            material.double_sided = m.double_sided();
            material
        })
        .unwrap_or_default();

    let mut data = MeshData::new(
        Geometry::Buffer {
            vertex_count,
            index_count,
        },
        material,
    );

    let target_count = primitives
        .first()
        .map(|p| p.morph_targets().count())
        .unwrap_or(0);
    if target_count > 0 {
        let mut names = target_names(mesh);
        names.truncate(target_count);
        let named = names.len();
        names.extend((named..target_count).map(|i| format!("target_{}", i)));

        let mut morph = MorphTargets::from_names(names);
        if let Some(weights) = mesh.weights() {
            for (i, w) in weights.iter().enumerate() {
                morph.set_at(i, *w);
            }
        }
        data = data.with_morph(morph);
    }
    data
}

fn target_names(mesh: &gltf::Mesh<'_>) -> Vec<String> {
    mesh.extras()
        .as_ref()
        .and_then(|raw| serde_json::from_str::<MeshExtras>(raw.get()).ok())
        .map(|extras| extras.target_names)
        .unwrap_or_default()
}

/// Keep the value of each cubic-spline (in-tangent, value, out-tangent)
/// triple
fn key_values<T: Copy>(raw: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        raw.chunks(3).filter_map(|c| c.get(1).copied()).collect()
    } else {
        raw
    }
}

fn axis_tracks(
    target: usize,
    property: fn(Axis) -> TrackProperty,
    times: &[f32],
    keys: &[[f32; 3]],
    interpolation: Interpolation,
) -> Vec<Track> {
    [Axis::X, Axis::Y, Axis::Z]
        .into_iter()
        .enumerate()
        .map(|(i, axis)| {
            Track::new(
                TrackTarget::Local(target),
                property(axis),
                times.to_vec(),
                keys.iter().map(|k| k[i]).collect(),
            )
            .with_interpolation(interpolation)
        })
        .collect()
}

fn read_clips(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    local: &HashMap<usize, usize>,
) -> Vec<Clip> {
    let mut clips = Vec::new();

    for (i, animation) in document.animations().enumerate() {
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", i));
        let mut tracks = Vec::new();

        for channel in animation.channels() {
            let Some(&target) = local.get(&channel.target().node().index()) else {
                continue;
            };
            let mode = channel.sampler().interpolation();
            let cubic = mode == gltf::animation::Interpolation::CubicSpline;
            let interpolation = match mode {
                gltf::animation::Interpolation::Step => Interpolation::Step,
                _ => Interpolation::Linear,
            };

            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            let Some(outputs) = reader.read_outputs() else {
                continue;
            };

            match outputs {
                ReadOutputs::Translations(values) => {
                    let keys = key_values(values.collect::<Vec<[f32; 3]>>(), cubic);
                    tracks.extend(axis_tracks(
                        target,
                        TrackProperty::Position,
                        &times,
                        &keys,
                        interpolation,
                    ));
                }
                ReadOutputs::Rotations(values) => {
                    let keys: Vec<[f32; 3]> = key_values(values.into_f32().collect::<Vec<[f32; 4]>>(), cubic)
                        .into_iter()
                        .map(|q| {
                            let e = Quat::from_xyzw(q).to_euler();
                            [e.x, e.y, e.z]
                        })
                        .collect();
                    tracks.extend(axis_tracks(
                        target,
                        TrackProperty::Rotation,
                        &times,
                        &keys,
                        interpolation,
                    ));
                }
                ReadOutputs::Scales(values) => {
                    let keys = key_values(values.collect::<Vec<[f32; 3]>>(), cubic);
                    tracks.extend(axis_tracks(
                        target,
                        TrackProperty::Scale,
                        &times,
                        &keys,
                        interpolation,
                    ));
                }
                ReadOutputs::MorphTargetWeights(values) => {
                    let flat: Vec<f32> = values.into_f32().collect();
                    if times.is_empty() {
                        continue;
                    }
                    let stride = flat.len() / times.len();
                    let targets = if cubic { stride / 3 } else { stride };
                    let offset = if cubic { targets } else { 0 };
                    for t in 0..targets {
                        let values = (0..times.len())
                            .filter_map(|k| flat.get(k * stride + offset + t).copied())
                            .collect();
                        tracks.push(
                            Track::new(
                                TrackTarget::Local(target),
                                TrackProperty::MorphWeight(t),
                                times.clone(),
                                values,
                            )
                            .with_interpolation(interpolation),
                        );
                    }
                }
            }
        }

        if !tracks.is_empty() {
            clips.push(Clip::new(name, 0.0, tracks));
        }
    }
    clips
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_scene::NodeKind;

    /// Armature with a two-joint skin, a face mesh with one blend shape and
    /// a one-second scale animation on the armature
    const RIGGED_GLTF: &str = r#"{
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

    #[test]
    fn test_decode_rigged_document() {
        let asset = GltfDecoder::new()
            .decode("assets/models/avatar.gltf", RIGGED_GLTF.as_bytes())
            .unwrap();
        let tree = &asset.tree;

        assert_eq!(tree.root().name, "avatar");
        assert_eq!(tree.len(), 5);
        assert!(tree.get(tree.find("Spine").unwrap()).unwrap().is_bone());
        let head = tree.get(tree.find("Head").unwrap()).unwrap();
        assert!(head.is_bone());
        assert_eq!(head.transform.position.y, 0.5);
        assert!(matches!(
            tree.get(tree.find("Armature").unwrap()).unwrap().kind,
            NodeKind::Group
        ));

        let face = tree.get(tree.find("Wolf3D_Head").unwrap()).unwrap();
        let mesh = face.mesh_data().unwrap();
        assert_eq!(
            mesh.geometry,
            Geometry::Buffer {
                vertex_count: 3,
                index_count: 0
            }
        );
        assert_eq!(face.morph().and_then(|m| m.influence("mouthOpen")), Some(0.25));
    }

    #[test]
    fn test_decode_clips() {
        let asset = GltfDecoder::new()
            .decode("avatar.gltf", RIGGED_GLTF.as_bytes())
            .unwrap();
        assert_eq!(asset.clips.len(), 1);

        let clip = &asset.clips[0];
        assert_eq!(clip.name, "Idle");
        assert_eq!(clip.duration, 1.0);
        assert_eq!(clip.tracks.len(), 3);

        let armature = asset.tree.find("Armature").unwrap();
        let y = clip
            .tracks
            .iter()
            .find(|t| t.property == TrackProperty::Scale(Axis::Y))
            .unwrap();
        assert_eq!(y.target, TrackTarget::Local(armature));
        assert!((y.sample(0.5).unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_garbage() {
        let err = GltfDecoder::new().decode("broken.glb", b"not a model").unwrap_err();
        assert!(matches!(err, PersonaError::DecodeFailed { ref path, .. } if path == "broken.glb"));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(model_name("assets/models/business-character.glb"), "business-character");
        assert_eq!(model_name("avatar"), "avatar");
        assert_eq!(model_name("dir/.glb"), "model");
    }

    #[test]
    fn test_cubic_key_values() {
        let raw = vec![0.0, 1.0, 0.0, 0.0, 2.0, 0.0];
        assert_eq!(key_values(raw.clone(), true), vec![1.0, 2.0]);
        assert_eq!(key_values(raw, false).len(), 6);
    }
}
