//! Persona Core - Fundamental types shared by every avatar crate
//!
//! This crate defines:
//! - Identifiers (generational scene node handles, model generations)
//! - Frame time primitives
//! - Semantic states, clip roles and the business context descriptor
//! - The common error type

pub mod id;
pub mod time;
pub mod state;
pub mod error;

pub use id::*;
pub use time::*;
pub use state::*;
pub use error::*;
