//! Persona Lip Sync
//!
//! Turns a frequency-magnitude frame into mouth motion. The engine does not
//! know or care where a frame came from: live capture analysis and the
//! synthetic speech generator feed the same [`AudioSampleSlot`].
//!
//! Each call drives three channels:
//!
//! 1. one mouth blend shape per morph-capable mesh
//! 2. vertical scale of meshes named like a mouth, lip or jaw (smoothed)
//! 3. rotation of the jaw joint (smoothed)
//!
//! All three run every time. Assets expose any subset of them, the
//! procedural fallback only the second.

pub mod engine;
pub mod intensity;
pub mod slot;
pub mod synthetic;

pub use engine::*;
pub use intensity::*;
pub use slot::*;
pub use synthetic::*;
