//! Decoded model assets

use std::fmt;

use persona_anim::Clip;
use persona_scene::NodeTree;

/// A decoded model, not yet attached to any scene.
///
/// Clip tracks target indices into `tree`; they are bound to live nodes
/// when the tree is attached.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub tree: NodeTree,
    pub clips: Vec<Clip>,
}

impl ModelAsset {
    pub fn new(tree: NodeTree, clips: Vec<Clip>) -> Self {
        Self { tree, clips }
    }

    pub fn node_count(&self) -> usize {
        self.tree.len()
    }
}

/// Where the avatar's current model came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Asset(String),
    Fallback,
}

impl ModelSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ModelSource::Fallback)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Asset(path) => write!(f, "asset {}", path),
            ModelSource::Fallback => f.write_str("procedural fallback"),
        }
    }
}
