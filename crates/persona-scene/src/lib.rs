//! Persona Scene - The renderable side of the avatar
//!
//! A small retained scene graph, just rich enough to carry what the avatar
//! animates: transforms, primitive meshes, materials, blend-shape
//! influences and joints.
//!
//! # Pieces
//!
//! - [`Scene`]: generational node arena with subtree attach/detach
//! - [`NodeTree`]: detached hierarchy produced by loaders and builders
//! - [`FallbackBuilder`]: primitive humanoid used when no asset loads
//! - [`RigIndex`]: role-keyed joints and meshes, built once per model
//! - [`resolve_morph_index`]: tolerant blend-shape name lookup

pub mod fallback;
pub mod graph;
pub mod index;
pub mod math;
pub mod morph;
pub mod node;
pub mod shape;

pub use fallback::*;
pub use graph::*;
pub use index::*;
pub use math::*;
pub use morph::*;
pub use node::*;
pub use shape::*;
