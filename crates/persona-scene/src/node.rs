//! Scene nodes and detached node trees

use crate::{Euler, Geometry, Material, MorphTargets, Vec3};

/// Local transform of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Euler,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Euler::default(),
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Euler) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Renderable mesh payload
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub geometry: Geometry,
    pub material: Material,
    /// Blend shapes, absent on meshes that have none
    pub morph: Option<MorphTargets>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshData {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            morph: None,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_morph(mut self, morph: MorphTargets) -> Self {
        self.morph = Some(morph);
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn has_morph_targets(&self) -> bool {
        self.morph.as_ref().map_or(false, |m| !m.is_empty())
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(MeshData),
    /// Skeleton joint
    Bone,
}

/// Node payload, independent of where it sits in a hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
}

impl NodeData {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Group,
            transform: Transform::default(),
            visible: true,
        }
    }

    pub fn bone(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Bone,
            ..Self::group(name)
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            kind: NodeKind::Mesh(mesh),
            ..Self::group(name)
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_bone(&self) -> bool {
        matches!(self.kind, NodeKind::Bone)
    }

    pub fn mesh_data(&self) -> Option<&MeshData> {
        match &self.kind {
            NodeKind::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn mesh_data_mut(&mut self) -> Option<&mut MeshData> {
        match &mut self.kind {
            NodeKind::Mesh(m) => Some(m),
            _ => None,
        }
    }

    /// Blend shapes of this node, if it is a mesh that has some
    pub fn morph_mut(&mut self) -> Option<&mut MorphTargets> {
        self.mesh_data_mut().and_then(|m| m.morph.as_mut())
    }

    pub fn morph(&self) -> Option<&MorphTargets> {
        self.mesh_data().and_then(|m| m.morph.as_ref())
    }
}

/// A hierarchy that is not attached to any scene yet.
///
/// Entry 0 is the root. Parents always precede their children, so a
/// front-to-back walk inserts every node after its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    entries: Vec<(NodeData, Option<usize>)>,
}

impl NodeTree {
    pub fn new(root: NodeData) -> Self {
        Self {
            entries: vec![(root, None)],
        }
    }

    /// Append a node under `parent`. Returns its local index.
    ///
    /// An out-of-range parent attaches to the root.
    pub fn add(&mut self, data: NodeData, parent: usize) -> usize {
        let parent = if parent < self.entries.len() { parent } else { 0 };
        self.entries.push((data, Some(parent)));
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> &NodeData {
        &self.entries[0].0
    }

    pub fn root_mut(&mut self) -> &mut NodeData {
        &mut self.entries[0].0
    }

    pub fn get(&self, index: usize) -> Option<&NodeData> {
        self.entries.get(index).map(|(d, _)| d)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut NodeData> {
        self.entries.get_mut(index).map(|(d, _)| d)
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.entries.get(index).and_then(|(_, p)| *p)
    }

    /// Local index of the first node with this exact name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(d, _)| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &NodeData)> {
        self.entries.iter().enumerate().map(|(i, (d, _))| (i, d))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut NodeData)> {
        self.entries.iter_mut().enumerate().map(|(i, (d, _))| (i, d))
    }

    pub(crate) fn into_entries(self) -> Vec<(NodeData, Option<usize>)> {
        self.entries
    }
}
