//! Persona Test Harness - Scripted collaborators and conversation scenarios
//!
//! This crate provides:
//! - Scripted asset fetchers and loader sources (with seeded flakiness)
//! - Fixture models: a full rig, a bare `mouth_piece` prop, a glTF document
//! - A conversation session driver over a headless scene manager
//! - End-to-end scenarios for fallback, transitions, lip sync and teardown

pub mod fixtures;
pub mod scripted;
pub mod session;
pub mod scenarios;

pub use fixtures::*;
pub use scripted::*;
pub use session::*;
pub use scenarios::*;
