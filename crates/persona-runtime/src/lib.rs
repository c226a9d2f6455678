//! Persona Runtime - Avatar lifecycle and render loop
//!
//! # Lifecycle
//!
//! 1. [`SceneManager::new`] validates the configuration and sets up the
//!    camera, lights and surface
//! 2. [`SceneManager::initialize`] runs the asset acquisition pipeline:
//!    loader source → probe → fetch → decode, candidate by candidate,
//!    ending in the procedural fallback when nothing loads
//! 3. The model is attached, indexed, given its clips and put into its
//!    initial state
//! 4. Every frame [`SceneManager::tick`] advances the mixer, re-applies lip
//!    sync from the latest audio frame, adds idle motion and draws
//! 5. [`SceneManager::destroy`] stops all actions and detaches the model
//!
//! Acquisition is the only asynchronous part. It never borrows the avatar;
//! its result is handed back with a ticket that is checked before anything
//! is attached.

pub mod acquisition;
pub mod asset;
pub mod avatar;
pub mod camera;
pub mod config;
pub mod decoder;
pub mod fetch;
pub mod loader;
pub mod manager;
pub mod motion;
pub mod surface;
pub mod telemetry;
pub mod voice;

pub use acquisition::*;
pub use asset::*;
pub use avatar::*;
pub use camera::*;
pub use config::*;
pub use decoder::*;
pub use fetch::*;
pub use loader::*;
pub use manager::*;
pub use motion::*;
pub use surface::*;
pub use telemetry::*;
pub use voice::*;
