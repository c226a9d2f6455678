//! Skeletal / blend-shape indexer
//!
//! Walks a freshly attached model once and records which joints and meshes
//! play which role. Name matching happens here and nowhere else; animation
//! and lip sync only ever consult the resulting tables.
//!
//! An index is stamped with the [`ModelGeneration`] it was built for and is
//! rebuilt wholesale whenever the model changes. It never owns nodes: every
//! entry is a generational handle that goes dead with the model.

use std::collections::HashMap;

use persona_core::{ModelGeneration, NodeId};
use tracing::debug;

use crate::{NodeKind, Scene};

/// Joint roles the avatar animates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointRole {
    Head,
    Neck,
    Spine,
    LeftShoulder,
    RightShoulder,
    Jaw,
}

impl JointRole {
    pub fn all() -> &'static [JointRole] {
        &[
            JointRole::Head,
            JointRole::Neck,
            JointRole::Spine,
            JointRole::LeftShoulder,
            JointRole::RightShoulder,
            JointRole::Jaw,
        ]
    }

    /// Keyword matched against the normalized joint name
    pub fn keyword(self) -> &'static str {
        match self {
            JointRole::Head => "head",
            JointRole::Neck => "neck",
            JointRole::Spine => "spine",
            JointRole::LeftShoulder => "leftshoulder",
            JointRole::RightShoulder => "rightshoulder",
            JointRole::Jaw => "jaw",
        }
    }
}

/// Mesh roles the avatar drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRole {
    Head,
    Face,
    Eye,
    Mouth,
    Lip,
    Jaw,
    Teeth,
}

impl MeshRole {
    pub fn all() -> &'static [MeshRole] {
        &[
            MeshRole::Head,
            MeshRole::Face,
            MeshRole::Eye,
            MeshRole::Mouth,
            MeshRole::Lip,
            MeshRole::Jaw,
            MeshRole::Teeth,
        ]
    }

    pub fn keyword(self) -> &'static str {
        match self {
            MeshRole::Head => "head",
            MeshRole::Face => "face",
            MeshRole::Eye => "eye",
            MeshRole::Mouth => "mouth",
            MeshRole::Lip => "lip",
            MeshRole::Jaw => "jaw",
            MeshRole::Teeth => "teeth",
        }
    }

    /// Roles whose vertical scale follows the mouth opening
    pub fn is_mouth_like(self) -> bool {
        matches!(self, MeshRole::Mouth | MeshRole::Lip | MeshRole::Jaw)
    }

    /// Roles eligible to carry the facial expression blend shapes
    pub fn is_facial(self) -> bool {
        !matches!(self, MeshRole::Teeth)
    }

    /// Every role a mesh name matches
    pub fn classify(name: &str) -> Vec<MeshRole> {
        let normalized = normalize_name(name);
        MeshRole::all()
            .iter()
            .copied()
            .filter(|role| normalized.contains(role.keyword()))
            .collect()
    }
}

/// Lower-case a node name and drop separators so `Left_Shoulder`,
/// `left-shoulder` and `mixamorig:LeftShoulder` all read the same.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Role-keyed lookup tables for one model
#[derive(Debug, Clone, Default)]
pub struct RigIndex {
    generation: ModelGeneration,
    root: Option<NodeId>,
    joints: HashMap<JointRole, NodeId>,
    meshes: HashMap<MeshRole, Vec<NodeId>>,
    morph_meshes: Vec<NodeId>,
    mouth_meshes: Vec<NodeId>,
    face_mesh: Option<NodeId>,
}

impl RigIndex {
    /// Empty index for "no model"
    pub fn empty(generation: ModelGeneration) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    /// Index the subtree rooted at `root`
    pub fn build(scene: &Scene, root: NodeId, generation: ModelGeneration) -> Self {
        let mut index = Self::empty(generation);
        index.root = Some(root);

        for id in scene.traverse(root) {
            let Some(data) = scene.get(id) else {
                continue;
            };

            match &data.kind {
                NodeKind::Bone => {
                    let normalized = normalize_name(&data.name);
                    for role in JointRole::all() {
                        if normalized.contains(role.keyword()) && !index.joints.contains_key(role) {
                            debug!(role = ?role, bone = %data.name, "joint indexed");
                            index.joints.insert(*role, id);
                        }
                    }
                }
                NodeKind::Mesh(mesh) => {
                    let roles = MeshRole::classify(&data.name);
                    for role in &roles {
                        index.meshes.entry(*role).or_default().push(id);
                    }
                    if roles.iter().any(|r| r.is_mouth_like()) {
                        index.mouth_meshes.push(id);
                    }

                    if mesh.has_morph_targets() {
                        index.morph_meshes.push(id);
                        if index.face_mesh.is_none() && roles.iter().any(|r| r.is_facial()) {
                            debug!(mesh = %data.name, "face mesh indexed");
                            index.face_mesh = Some(id);
                        }
                    }
                }
                NodeKind::Group => {}
            }
        }

        debug!(
            generation = generation.0,
            joints = index.joints.len(),
            morph_meshes = index.morph_meshes.len(),
            mouth_meshes = index.mouth_meshes.len(),
            face = index.face_mesh.is_some(),
            "rig indexed"
        );
        index
    }

    pub fn generation(&self) -> ModelGeneration {
        self.generation
    }

    /// Whether this index was built for the given model generation
    pub fn is_current(&self, generation: ModelGeneration) -> bool {
        self.generation == generation && self.root.is_some()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn joint(&self, role: JointRole) -> Option<NodeId> {
        self.joints.get(&role).copied()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn meshes(&self, role: MeshRole) -> &[NodeId] {
        self.meshes.get(&role).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// First mesh with this role
    pub fn mesh(&self, role: MeshRole) -> Option<NodeId> {
        self.meshes(role).first().copied()
    }

    /// Meshes with a mouth, lip or jaw role, each once, in traversal order
    pub fn mouth_meshes(&self) -> &[NodeId] {
        &self.mouth_meshes
    }

    /// Every mesh carrying blend shapes, in traversal order
    pub fn morph_meshes(&self) -> &[NodeId] {
        &self.morph_meshes
    }

    /// Mesh chosen for expression blend shapes
    pub fn face_mesh(&self) -> Option<NodeId> {
        self.face_mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Geometry, Material, MeshData, MorphTargets, NodeData, NodeTree, Shape};

    fn mesh(name: &str, morphs: &[&str]) -> NodeData {
        let mut m = MeshData::new(
            Geometry::Primitive(Shape::sphere(0.1, 8)),
            Material::lambert(Color::white()),
        );
        if !morphs.is_empty() {
            m = m.with_morph(MorphTargets::from_names(morphs.iter().copied()));
        }
        NodeData::mesh(name, m)
    }

    fn rigged() -> NodeTree {
        let mut t = NodeTree::new(NodeData::group("Armature"));
        let hips = t.add(NodeData::bone("mixamorig:Hips"), 0);
        let spine = t.add(NodeData::bone("mixamorig:Spine"), hips);
        t.add(NodeData::bone("mixamorig:Spine1"), spine);
        let neck = t.add(NodeData::bone("mixamorig:Neck"), spine);
        let head = t.add(NodeData::bone("mixamorig:Head"), neck);
        t.add(NodeData::bone("mixamorig:HeadTop_End"), head);
        t.add(NodeData::bone("Jaw_Bone"), head);
        t.add(NodeData::bone("mixamorig:Left_Shoulder"), spine);
        t.add(NodeData::bone("mixamorig:RightShoulder"), spine);
        t.add(mesh("Body", &[]), 0);
        t.add(mesh("Wolf3D_Head", &["mouthOpen", "mouthSmile"]), 0);
        t.add(mesh("Wolf3D_Teeth", &["mouthOpen"]), 0);
        t.add(mesh("EyeLeft", &[]), 0);
        t
    }

    #[test]
    fn test_joint_roles() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(rigged(), scene.root()).unwrap();
        let index = RigIndex::build(&scene, ids[0], ModelGeneration(1));

        let name = |role| scene.get(index.joint(role).unwrap()).unwrap().name.clone();
        assert_eq!(name(JointRole::Spine), "mixamorig:Spine");
        assert_eq!(name(JointRole::Head), "mixamorig:Head");
        assert_eq!(name(JointRole::Neck), "mixamorig:Neck");
        assert_eq!(name(JointRole::Jaw), "Jaw_Bone");
        assert_eq!(name(JointRole::LeftShoulder), "mixamorig:Left_Shoulder");
        assert_eq!(name(JointRole::RightShoulder), "mixamorig:RightShoulder");
        assert_eq!(index.joint_count(), 6);
    }

    #[test]
    fn test_face_and_morph_meshes() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(rigged(), scene.root()).unwrap();
        let index = RigIndex::build(&scene, ids[0], ModelGeneration(1));

        let face = index.face_mesh().unwrap();
        assert_eq!(scene.get(face).unwrap().name, "Wolf3D_Head");
        assert_eq!(index.morph_meshes().len(), 2);
        assert_eq!(index.meshes(MeshRole::Eye).len(), 1);
        assert!(index.mouth_meshes().is_empty());
    }

    #[test]
    fn test_mouth_piece_only() {
        let mut t = NodeTree::new(NodeData::group("prop"));
        t.add(mesh("mouth_piece", &[]), 0);
        let mut scene = Scene::new();
        let ids = scene.attach_tree(t, scene.root()).unwrap();
        let index = RigIndex::build(&scene, ids[0], ModelGeneration(3));

        assert_eq!(index.mouth_meshes(), &[ids[1]]);
        assert!(index.face_mesh().is_none());
        assert!(index.joint(JointRole::Jaw).is_none());
        assert!(index.is_current(ModelGeneration(3)));
        assert!(!index.is_current(ModelGeneration(4)));
    }

    #[test]
    fn test_mouth_meshes_listed_once() {
        let mut t = NodeTree::new(NodeData::group("face_rig"));
        t.add(mesh("Mouth_Jaw_Lips", &[]), 0);
        t.add(mesh("UpperLip", &[]), 0);
        t.add(mesh("Nose", &[]), 0);
        let mut scene = Scene::new();
        let ids = scene.attach_tree(t, scene.root()).unwrap();
        let index = RigIndex::build(&scene, ids[0], ModelGeneration(1));

        assert_eq!(index.mouth_meshes(), &[ids[1], ids[2]]);
        assert_eq!(index.meshes(MeshRole::Lip).len(), 2);
    }

    #[test]
    fn test_classify_multi_role() {
        let roles = MeshRole::classify("Mouth_Jaw_Lips");
        assert!(roles.contains(&MeshRole::Mouth));
        assert!(roles.contains(&MeshRole::Jaw));
        assert!(roles.contains(&MeshRole::Lip));
    }

    #[test]
    fn test_empty_index() {
        let index = RigIndex::empty(ModelGeneration::ZERO);
        assert!(!index.is_current(ModelGeneration::ZERO));
        assert!(index.mouth_meshes().is_empty());
        assert!(index.joint(JointRole::Head).is_none());
    }
}
