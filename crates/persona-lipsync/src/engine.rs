//! Lip-sync engine

use persona_core::{PersonaError, PersonaResult};
use persona_scene::{lerp, JointRole, RigIndex, Scene};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{derive_intensity, IntensityParams};

/// Tuning of the three mouth channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncSettings {
    #[serde(flatten)]
    pub intensity: IntensityParams,
    /// Multiplier on the blend-shape influence
    pub blend_weight: f32,
    /// Vertical scale target is `1 + intensity * scale_gain`
    pub scale_gain: f32,
    /// Fraction of the remaining scale distance covered per call
    pub scale_smoothing: f32,
    /// Jaw pitch target is `-intensity * jaw_gain` radians
    pub jaw_gain: f32,
    pub jaw_smoothing: f32,
    /// Mouth-opening blend shapes, most preferred first
    pub mouth_targets: Vec<String>,
}

impl Default for LipSyncSettings {
    fn default() -> Self {
        Self {
            intensity: IntensityParams::default(),
            blend_weight: 1.0,
            scale_gain: 0.5,
            scale_smoothing: 0.3,
            jaw_gain: 0.3,
            jaw_smoothing: 0.35,
            mouth_targets: [
                "mouthOpen",
                "jawOpen",
                "viseme_aa",
                "mouth_open",
                "MouthOpen",
                "A",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl LipSyncSettings {
    pub fn validate(&self) -> PersonaResult<()> {
        let finite = [
            ("lipsync.damping", self.intensity.damping),
            ("lipsync.max_intensity", self.intensity.max_intensity),
            ("lipsync.blend_weight", self.blend_weight),
            ("lipsync.scale_gain", self.scale_gain),
            ("lipsync.jaw_gain", self.jaw_gain),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(PersonaError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("lipsync.scale_smoothing", self.scale_smoothing),
            ("lipsync.jaw_smoothing", self.jaw_smoothing),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(PersonaError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// What one application touched
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelReport {
    pub intensity: f32,
    /// Morph meshes where a mouth target was found
    pub blend_shapes: usize,
    /// Mouth-like meshes whose scale moved
    pub scaled_meshes: usize,
    pub jaw: bool,
}

/// Drives the mouth from magnitude frames
#[derive(Debug, Clone, Default)]
pub struct LipSyncEngine {
    settings: LipSyncSettings,
    last_intensity: f32,
}

impl LipSyncEngine {
    pub fn new(settings: LipSyncSettings) -> Self {
        Self {
            settings,
            last_intensity: 0.0,
        }
    }

    pub fn settings(&self) -> &LipSyncSettings {
        &self.settings
    }

    /// Intensity applied by the last non-empty frame
    pub fn last_intensity(&self) -> f32 {
        self.last_intensity
    }

    /// Apply one frame to the indexed model.
    ///
    /// An absent or empty frame does nothing and returns `None`. Otherwise
    /// every channel is attempted; the ones the model lacks are skipped.
    pub fn apply(
        &mut self,
        magnitudes: Option<&[f32]>,
        scene: &mut Scene,
        rig: &RigIndex,
    ) -> Option<ChannelReport> {
        let intensity = derive_intensity(magnitudes?, &self.settings.intensity)?;
        self.last_intensity = intensity;

        let report = ChannelReport {
            intensity,
            blend_shapes: self.apply_blend_shapes(intensity, scene, rig),
            scaled_meshes: self.apply_mesh_scale(intensity, scene, rig),
            jaw: self.apply_jaw(intensity, scene, rig),
        };
        trace!(
            intensity,
            blend_shapes = report.blend_shapes,
            scaled = report.scaled_meshes,
            jaw = report.jaw,
            "lip sync applied"
        );
        Some(report)
    }

    fn apply_blend_shapes(&self, intensity: f32, scene: &mut Scene, rig: &RigIndex) -> usize {
        let value = intensity * self.settings.blend_weight;
        let mut hits = 0;
        for id in rig.morph_meshes() {
            let Some(morph) = scene.get_mut(*id).and_then(|n| n.morph_mut()) else {
                continue;
            };
            // First known target on this mesh only
            if let Some(index) = self
                .settings
                .mouth_targets
                .iter()
                .find_map(|name| morph.resolve(name))
            {
                morph.set_at(index, value);
                hits += 1;
            }
        }
        hits
    }

    fn apply_mesh_scale(&self, intensity: f32, scene: &mut Scene, rig: &RigIndex) -> usize {
        let target = 1.0 + intensity * self.settings.scale_gain;
        let mut moved = 0;
        for &id in rig.mouth_meshes() {
            if let Some(t) = scene.transform_mut(id) {
                t.scale.y = lerp(t.scale.y, target, self.settings.scale_smoothing);
                moved += 1;
            }
        }
        moved
    }

    fn apply_jaw(&self, intensity: f32, scene: &mut Scene, rig: &RigIndex) -> bool {
        let Some(jaw) = rig.joint(JointRole::Jaw) else {
            return false;
        };
        match scene.transform_mut(jaw) {
            Some(t) => {
                let target = -intensity * self.settings.jaw_gain;
                t.rotation.x = lerp(t.rotation.x, target, self.settings.jaw_smoothing);
                true
            }
            None => false,
        }
    }
}
