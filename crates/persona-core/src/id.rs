//! Identity types for the avatar scene
//!
//! Node handles are generational: a handle stays valid only while the slot
//! it points at has not been recycled. Anything that remembers a handle
//! across a model replacement sees it resolve to nothing instead of
//! aliasing a new node.

use std::fmt;

/// Handle to a node in the scene arena
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        NodeId { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Monotonic counter identifying one attached model of an avatar.
///
/// Bumped every time the avatar's model is attached, replaced or detached.
/// Lookup tables and acquisition tickets carry the generation they were
/// created for.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ModelGeneration(pub u64);

impl ModelGeneration {
    pub const ZERO: ModelGeneration = ModelGeneration(0);

    #[inline]
    pub fn next(self) -> Self {
        ModelGeneration(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for ModelGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen({})", self.0)
    }
}
