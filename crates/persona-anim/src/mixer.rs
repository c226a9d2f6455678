//! Animation mixer
//!
//! Owns one action per clip. Each tick the playing actions advance, their
//! fades progress, and every bound property receives the weighted blend of
//! all actions driving it. When the total weight is below one the gap is
//! filled from the value the property had when it was first bound, so a
//! half-faded clip settles back toward the rest pose instead of freezing.
//!
//! A property that no playing action drives anymore is written back to its
//! rest value once and released.

use std::collections::HashMap;

use persona_core::NodeId;
use persona_scene::{lerp, Scene};
use tracing::trace;

use crate::{Clip, TrackProperty, TrackTarget};

/// Handle to an action inside one mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub usize);

/// How an action behaves at the end of its clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Repeat,
    /// Hold the last frame
    Once,
}

/// Fade progress of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    Steady,
    FadingIn,
    FadingOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

impl Fade {
    fn factor(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        lerp(self.from, self.to, (self.elapsed / self.duration).clamp(0.0, 1.0))
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Playback state of one clip
#[derive(Debug, Clone)]
pub struct Action {
    clip: Clip,
    time: f32,
    weight: f32,
    time_scale: f32,
    loop_mode: LoopMode,
    playing: bool,
    enabled: bool,
    fade: Option<Fade>,
    /// Fade factor left behind by the last completed fade
    settled: f32,
}

impl Action {
    fn new(clip: Clip) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 1.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Repeat,
            playing: false,
            enabled: true,
            fade: None,
            settled: 1.0,
        }
    }

    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    pub fn name(&self) -> &str {
        &self.clip.name
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing && self.enabled
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.max(0.0);
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale;
    }

    pub fn fade_state(&self) -> FadeState {
        match self.fade {
            Some(f) if f.to > f.from => FadeState::FadingIn,
            Some(_) => FadeState::FadingOut,
            None => FadeState::Steady,
        }
    }

    /// Weight after fading, as used in the blend
    pub fn effective_weight(&self) -> f32 {
        if !self.is_playing() {
            return 0.0;
        }
        let factor = self.fade.map_or(self.settled, |f| f.factor());
        self.weight * factor
    }

    fn advance(&mut self, dt: f32) {
        if !self.is_playing() {
            return;
        }

        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed += dt;
            if fade.finished() {
                let done = *fade;
                self.fade = None;
                self.settled = done.to;
                if done.to <= 0.0 {
                    self.playing = false;
                    self.enabled = false;
                    return;
                }
            }
        }

        let duration = self.clip.duration;
        self.time += dt * self.time_scale;
        if duration > 0.0 {
            match self.loop_mode {
                LoopMode::Repeat => self.time = self.time.rem_euclid(duration),
                LoopMode::Once => self.time = self.time.clamp(0.0, duration),
            }
        }
    }
}

type BindingKey = (NodeId, TrackProperty);

/// Blends clip actions onto scene nodes
#[derive(Debug, Default)]
pub struct AnimationMixer {
    actions: Vec<Action>,
    rest: HashMap<BindingKey, f32>,
    time: f64,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip and return its action. Clip targets must already be
    /// bound to scene nodes; local targets are ignored during blending.
    pub fn clip_action(&mut self, clip: Clip) -> ActionId {
        self.actions.push(Action::new(clip));
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions.get_mut(id.0)
    }

    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.actions.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Find an action by clip name
    pub fn find(&self, name: &str) -> Option<ActionId> {
        self.actions
            .iter()
            .position(|a| a.clip.name == name)
            .map(ActionId)
    }

    /// Total time advanced
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Start (or keep) playing
    pub fn play(&mut self, id: ActionId) {
        if let Some(a) = self.action_mut(id) {
            a.playing = true;
            a.enabled = true;
        }
    }

    /// Rewind to the start, enable, and cancel any fade
    pub fn reset(&mut self, id: ActionId) {
        if let Some(a) = self.action_mut(id) {
            a.time = 0.0;
            a.enabled = true;
            a.fade = None;
            a.settled = 1.0;
        }
    }

    /// Ramp the action's weight from zero up to full
    pub fn fade_in(&mut self, id: ActionId, duration: f32) {
        if let Some(a) = self.action_mut(id) {
            a.fade = Some(Fade {
                from: 0.0,
                to: 1.0,
                elapsed: 0.0,
                duration: duration.max(0.0),
            });
        }
    }

    /// Ramp the action's weight down to zero from wherever it is now.
    /// The action stops once the fade completes.
    pub fn fade_out(&mut self, id: ActionId, duration: f32) {
        if let Some(a) = self.action_mut(id) {
            let from = a.fade.map_or(a.settled, |f| f.factor());
            a.fade = Some(Fade {
                from,
                to: 0.0,
                elapsed: 0.0,
                duration: duration.max(0.0),
            });
        }
    }

    pub fn stop(&mut self, id: ActionId) {
        if let Some(a) = self.action_mut(id) {
            a.playing = false;
            a.time = 0.0;
            a.fade = None;
            a.settled = 1.0;
        }
    }

    pub fn stop_all(&mut self) {
        for i in 0..self.actions.len() {
            self.stop(ActionId(i));
        }
    }

    /// Advance every action by `dt` seconds and write the blend onto `scene`
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }
        self.time += dt as f64;

        for action in &mut self.actions {
            action.advance(dt);
        }

        // (weighted sum, total weight) per bound property
        let mut blend: HashMap<BindingKey, (f32, f32)> = HashMap::new();
        for action in &self.actions {
            let weight = action.effective_weight();
            if weight <= 0.0 {
                continue;
            }
            for track in &action.clip.tracks {
                let TrackTarget::Node(node) = track.target else {
                    continue;
                };
                let Some(value) = track.sample(action.time) else {
                    continue;
                };
                let key = (node, track.property);
                if !self.rest.contains_key(&key) {
                    match scene.get(node).and_then(|d| track.property.read(d)) {
                        Some(rest) => {
                            self.rest.insert(key, rest);
                        }
                        None => continue,
                    }
                }
                let slot = blend.entry(key).or_insert((0.0, 0.0));
                slot.0 += value * weight;
                slot.1 += weight;
            }
        }

        for (key, (sum, total)) in &blend {
            let rest = self.rest.get(key).copied().unwrap_or(0.0);
            let value = if *total >= 1.0 {
                sum / total
            } else {
                sum + rest * (1.0 - total)
            };
            if let Some(node) = scene.get_mut(key.0) {
                key.1.write(node, value);
            }
        }

        // Release properties nothing drives anymore
        let released: Vec<BindingKey> = self
            .rest
            .keys()
            .filter(|k| !blend.contains_key(*k))
            .copied()
            .collect();
        for key in released {
            if let Some(rest) = self.rest.remove(&key) {
                if let Some(node) = scene.get_mut(key.0) {
                    trace!(node = %key.0, "binding released");
                    key.1.write(node, rest);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Track;
    use persona_scene::{Axis, NodeData};

    fn setup() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let spine = scene.insert(NodeData::bone("Spine"), scene.root()).unwrap();
        (scene, spine)
    }

    fn lean(node: NodeId, value: f32) -> Clip {
        Clip::new(
            format!("lean {}", value),
            1.0,
            vec![Track::new(
                TrackTarget::Node(node),
                TrackProperty::Rotation(Axis::X),
                vec![0.0, 1.0],
                vec![value, value],
            )],
        )
    }

    fn rot_x(scene: &Scene, id: NodeId) -> f32 {
        scene.get(id).unwrap().transform.rotation.x
    }

    #[test]
    fn test_single_action_full_weight() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 0.5));
        mixer.play(a);
        mixer.update(0.1, &mut scene);
        assert!((rot_x(&scene, spine) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fade_in_blends_from_rest() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        mixer.reset(a);
        mixer.fade_in(a, 1.0);
        mixer.play(a);
        assert_eq!(mixer.action(a).unwrap().fade_state(), FadeState::FadingIn);

        mixer.update(0.25, &mut scene);
        assert!((rot_x(&scene, spine) - 0.25).abs() < 1e-5);
        mixer.update(1.0, &mut scene);
        assert!((rot_x(&scene, spine) - 1.0).abs() < 1e-5);
        assert_eq!(mixer.action(a).unwrap().fade_state(), FadeState::Steady);
    }

    #[test]
    fn test_cross_fade_weights() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        let b = mixer.clip_action(lean(spine, -1.0));
        mixer.play(a);
        mixer.update(0.1, &mut scene);

        mixer.fade_out(a, 0.8);
        mixer.reset(b);
        mixer.fade_in(b, 0.8);
        mixer.play(b);
        mixer.update(0.4, &mut scene);

        let wa = mixer.action(a).unwrap().effective_weight();
        let wb = mixer.action(b).unwrap().effective_weight();
        assert!((wa - 0.5).abs() < 1e-5);
        assert!((wb - 0.5).abs() < 1e-5);
        assert!(rot_x(&scene, spine).abs() < 1e-5);
    }

    #[test]
    fn test_fade_out_stops_and_restores_rest() {
        let (mut scene, spine) = setup();
        scene.transform_mut(spine).unwrap().rotation.x = 0.2;
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        mixer.play(a);
        mixer.update(0.1, &mut scene);
        assert!((rot_x(&scene, spine) - 1.0).abs() < 1e-6);

        mixer.fade_out(a, 0.5);
        assert_eq!(mixer.action(a).unwrap().fade_state(), FadeState::FadingOut);
        mixer.update(0.6, &mut scene);
        assert!(!mixer.action(a).unwrap().is_playing());
        assert!((rot_x(&scene, spine) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_fade_out_mid_fade_in_starts_from_current() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        mixer.fade_in(a, 1.0);
        mixer.play(a);
        mixer.update(0.3, &mut scene);
        mixer.fade_out(a, 1.0);
        let w = mixer.action(a).unwrap().effective_weight();
        assert!((w - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_looping_and_once() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        let b = mixer.clip_action(lean(spine, 1.0));
        mixer.action_mut(b).unwrap().set_loop_mode(LoopMode::Once);
        mixer.play(a);
        mixer.play(b);
        mixer.update(1.25, &mut scene);
        assert!((mixer.action(a).unwrap().time() - 0.25).abs() < 1e-5);
        assert_eq!(mixer.action(b).unwrap().time(), 1.0);
    }

    #[test]
    fn test_stale_target_ignored() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        mixer.play(a);
        scene.detach(spine);
        mixer.update(0.1, &mut scene);
        assert_eq!(mixer.action_count(), 1);
    }

    #[test]
    fn test_invalid_dt_ignored() {
        let (mut scene, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        mixer.play(a);
        mixer.update(f32::NAN, &mut scene);
        mixer.update(-1.0, &mut scene);
        assert_eq!(mixer.time(), 0.0);
        assert_eq!(rot_x(&scene, spine), 0.0);
    }

    #[test]
    fn test_stop_all() {
        let (_, spine) = setup();
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action(lean(spine, 1.0));
        let b = mixer.clip_action(lean(spine, 2.0));
        mixer.play(a);
        mixer.play(b);
        mixer.stop_all();
        assert!(mixer.actions().all(|(_, x)| !x.is_playing()));
        assert_eq!(mixer.find("lean 2"), Some(b));
    }
}
