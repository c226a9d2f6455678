//! Idle micro-motion, blinking and gaze
//!
//! Layered on top of the mixer output every tick. All three are optional:
//! a model without a head, eyes or pointer input simply skips that part.

use persona_core::{NodeId, SemanticState};
use persona_scene::{lerp, JointRole, MeshRole, RigIndex, Scene};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::IdleConfig;

#[derive(Debug, Clone)]
struct Blink {
    remaining: f32,
    eyes: Vec<(NodeId, f32)>,
}

/// Per-model idle layer
#[derive(Debug, Clone)]
pub struct IdleMotion {
    config: IdleConfig,
    rng: StdRng,
    elapsed: f32,
    /// Rest height of the bobbing head, captured on first use
    head_rest: Option<(NodeId, f32)>,
    blink: Option<Blink>,
    blinks: u64,
    pointer: Option<(f32, f32)>,
}

impl IdleMotion {
    pub fn new(config: IdleConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            elapsed: 0.0,
            head_rest: None,
            blink: None,
            blinks: 0,
            pointer: None,
        }
    }

    pub fn config(&self) -> &IdleConfig {
        &self.config
    }

    /// Blinks started so far
    pub fn blink_count(&self) -> u64 {
        self.blinks
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }

    pub fn pointer(&self) -> Option<(f32, f32)> {
        self.pointer
    }

    /// Normalized pointer position, each axis clamped to [-1, 1]
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.pointer = Some((x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0)));
        }
    }

    pub fn clear_pointer(&mut self) {
        self.pointer = None;
    }

    /// Forget everything tied to the previous model
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.head_rest = None;
        self.blink = None;
    }

    pub fn update(&mut self, dt: f32, state: SemanticState, scene: &mut Scene, rig: &RigIndex) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }
        self.elapsed += dt;
        let head = rig.joint(JointRole::Head).or_else(|| rig.mesh(MeshRole::Head));

        if let Some(head) = head {
            self.micro_motion(head, state, scene);
            self.gaze(head, scene);
        }
        self.blink(dt, scene, rig);
    }

    fn micro_motion(&mut self, head: NodeId, state: SemanticState, scene: &mut Scene) {
        let rest = match self.head_rest {
            Some((id, y)) if id == head => y,
            _ => {
                let Some(node) = scene.get(head) else {
                    return;
                };
                let y = node.transform.position.y;
                self.head_rest = Some((head, y));
                y
            }
        };
        let Some(t) = scene.transform_mut(head) else {
            return;
        };
        t.position.y = if state == SemanticState::Idle {
            rest + (self.elapsed * self.config.micro_rate).sin() * self.config.micro_amplitude
        } else {
            rest
        };
    }

    fn gaze(&self, head: NodeId, scene: &mut Scene) {
        let Some((x, y)) = self.pointer else {
            return;
        };
        let Some(t) = scene.transform_mut(head) else {
            return;
        };
        let k = self.config.gaze_intensity;
        let s = self.config.gaze_smoothing;
        t.rotation.y = lerp(t.rotation.y, x * k, s);
        t.rotation.x = lerp(t.rotation.x, y * k * 0.5, s);
    }

    fn blink(&mut self, dt: f32, scene: &mut Scene, rig: &RigIndex) {
        if let Some(blink) = &mut self.blink {
            blink.remaining -= dt;
            if blink.remaining <= 0.0 {
                for (id, y) in &blink.eyes {
                    if let Some(t) = scene.transform_mut(*id) {
                        t.scale.y = *y;
                    }
                }
                self.blink = None;
            }
            return;
        }

        let eyes = rig.meshes(MeshRole::Eye);
        if eyes.is_empty() || self.rng.gen::<f32>() >= self.config.blink_probability {
            return;
        }

        let mut saved = Vec::with_capacity(eyes.len());
        for id in eyes {
            if let Some(t) = scene.transform_mut(*id) {
                saved.push((*id, t.scale.y));
                t.scale.y = self.config.blink_squash;
            }
        }
        if saved.is_empty() {
            return;
        }
        self.blinks += 1;
        trace!(eyes = saved.len(), "blink");
        self.blink = Some(Blink {
            remaining: self.config.blink_duration().as_secs_f32(),
            eyes: saved,
        });
    }
}
