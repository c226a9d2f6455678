//! Persona Animation - Clips, mixing and conversational states
//!
//! # Flow
//!
//! ```text
//! setState(semantic) → clip role → fade out current action
//!                                → reset + fade in target action
//!                                → expression + business context + posture
//! tick(dt)           → mixer advances fades and clip time
//!                    → weighted blend written onto scene nodes
//! ```
//!
//! Everything in a transition happens in the same call. Nothing is deferred
//! to the next frame.

pub mod clip;
pub mod expression;
pub mod library;
pub mod machine;
pub mod mixer;
pub mod profile;

pub use clip::*;
pub use expression::*;
pub use library::*;
pub use machine::*;
pub use mixer::*;
pub use profile::*;
