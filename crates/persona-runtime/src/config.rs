//! Runtime configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. [`PersonaConfig::validate`] rejects values that would make
//! the avatar misbehave rather than silently clamping them.

use std::path::Path;
use std::time::Duration;

use persona_anim::{ProfileKind, MAX_FADE_SECS};
use persona_core::{PersonaError, PersonaResult, NOMINAL_TIMESTEP};
use persona_lipsync::{LipSyncSettings, SyntheticParams};
use serde::{Deserialize, Serialize};

/// Location of the built-in glTF decoder
pub const BUILTIN_GLTF_LOADER: &str = "builtin:gltf";
/// Same decoder, registered under its binary container name
pub const BUILTIN_GLB_LOADER: &str = "builtin:glb";

/// Animation timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Cross-fade length, clamped to 0.5..=0.8 by the state machine
    pub fade_duration_secs: f32,
    /// Mixer step per rendered frame
    pub timestep_secs: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade_duration_secs: MAX_FADE_SECS,
            timestep_secs: NOMINAL_TIMESTEP,
        }
    }
}

/// Idle micro-motion, blinking and gaze
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Head bob amplitude in scene units
    pub micro_amplitude: f32,
    /// Head bob rate in radians per second
    pub micro_rate: f32,
    /// Chance of starting a blink on any tick
    pub blink_probability: f32,
    pub blink_duration_ms: u64,
    /// Eye vertical scale while blinking
    pub blink_squash: f32,
    /// Head rotation per unit of pointer offset
    pub gaze_intensity: f32,
    pub gaze_smoothing: f32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            micro_amplitude: 0.001,
            micro_rate: 0.5,
            blink_probability: 0.005,
            blink_duration_ms: 150,
            blink_squash: 0.1,
            gaze_intensity: 0.05,
            gaze_smoothing: 0.1,
        }
    }
}

impl IdleConfig {
    pub fn blink_duration(&self) -> Duration {
        Duration::from_millis(self.blink_duration_ms)
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Avatar runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Loader locations, tried in order
    pub loader_sources: Vec<String>,
    /// Asset paths, tried in order
    pub asset_candidates: Vec<String>,
    pub profile: ProfileKind,
    pub animation: AnimationConfig,
    pub lipsync: LipSyncSettings,
    pub synthetic: SyntheticParams,
    pub idle: IdleConfig,
    pub logging: LoggingConfig,
    /// Seed for blink timing and synthetic speech; random when absent
    pub seed: Option<u64>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            loader_sources: vec![
                BUILTIN_GLTF_LOADER.to_string(),
                BUILTIN_GLB_LOADER.to_string(),
            ],
            asset_candidates: vec![
                "assets/models/business-character.glb".to_string(),
                "assets/models/avatar.glb".to_string(),
            ],
            profile: ProfileKind::default(),
            animation: AnimationConfig::default(),
            lipsync: LipSyncSettings::default(),
            synthetic: SyntheticParams::default(),
            idle: IdleConfig::default(),
            logging: LoggingConfig::default(),
            seed: None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> PersonaError {
    PersonaError::InvalidConfig(msg.into())
}

impl PersonaConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> PersonaResult<Self> {
        let config: PersonaConfig =
            serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub async fn load(path: impl AsRef<Path>) -> PersonaResult<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> PersonaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    pub fn validate(&self) -> PersonaResult<()> {
        if self.loader_sources.is_empty() {
            return Err(invalid("loader_sources must not be empty"));
        }
        if self.loader_sources.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("loader_sources contains an empty location"));
        }
        if self.asset_candidates.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("asset_candidates contains an empty path"));
        }

        let anim = &self.animation;
        if !anim.fade_duration_secs.is_finite() || anim.fade_duration_secs < 0.0 {
            return Err(invalid(format!(
                "animation.fade_duration_secs must be a non-negative number, got {}",
                anim.fade_duration_secs
            )));
        }
        if !anim.timestep_secs.is_finite() || anim.timestep_secs <= 0.0 {
            return Err(invalid(format!(
                "animation.timestep_secs must be positive, got {}",
                anim.timestep_secs
            )));
        }

        self.lipsync.validate()?;

        if self.synthetic.bins == 0 {
            return Err(invalid("synthetic.bins must be at least 1"));
        }
        if self.synthetic.interval_ms == 0 {
            return Err(invalid("synthetic.interval_ms must be at least 1"));
        }
        if !self.synthetic.low.is_finite() || !self.synthetic.span.is_finite() {
            return Err(invalid("synthetic levels must be finite"));
        }

        let idle = &self.idle;
        if !(0.0..=1.0).contains(&idle.blink_probability) {
            return Err(invalid(format!(
                "idle.blink_probability must be in [0, 1], got {}",
                idle.blink_probability
            )));
        }
        for (name, value) in [
            ("idle.micro_amplitude", idle.micro_amplitude),
            ("idle.micro_rate", idle.micro_rate),
            ("idle.blink_squash", idle.blink_squash),
            ("idle.gaze_intensity", idle.gaze_intensity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(idle.gaze_smoothing > 0.0 && idle.gaze_smoothing <= 1.0) {
            return Err(invalid(format!(
                "idle.gaze_smoothing must be in (0, 1], got {}",
                idle.gaze_smoothing
            )));
        }

        Ok(())
    }
}
