//! Intensity derivation
//!
//! `clamp(mean / 255, 0, 1) * damping`, capped at the configured maximum.
//! Non-finite magnitudes are ignored; a frame with nothing usable yields no
//! intensity at all rather than zero.

use serde::{Deserialize, Serialize};

/// Full-scale magnitude of one frequency bin
pub const FULL_SCALE: f32 = 255.0;

/// Shaping applied to the raw mean level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityParams {
    /// Restrains motion, in [0, 1]
    pub damping: f32,
    /// Hard ceiling on the applied intensity
    pub max_intensity: f32,
}

impl Default for IntensityParams {
    fn default() -> Self {
        Self {
            damping: 0.6,
            max_intensity: 1.0,
        }
    }
}

/// Mean level of a frame in [0, 1], or `None` for an empty frame
pub fn normalized_level(magnitudes: &[f32]) -> Option<f32> {
    let (sum, count) = magnitudes
        .iter()
        .filter(|m| m.is_finite())
        .fold((0.0_f64, 0_usize), |(s, n), m| (s + *m as f64, n + 1));
    if count == 0 {
        return None;
    }
    let mean = (sum / count as f64) as f32;
    Some((mean / FULL_SCALE).clamp(0.0, 1.0))
}

/// Mouth-opening intensity for a frame
pub fn derive_intensity(magnitudes: &[f32], params: &IntensityParams) -> Option<f32> {
    let level = normalized_level(magnitudes)?;
    let damping = if params.damping.is_finite() {
        params.damping.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let max = if params.max_intensity.is_finite() {
        params.max_intensity.clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some((level * damping).min(max))
}
