//! Clip registration and procedural defaults
//!
//! Asset clips are registered under their lower-cased name and aliased to a
//! role by substring (`idle`, `talk`, ...). Roles still uncovered afterwards
//! get a procedural clip when the rig has something for it to drive.

use std::collections::HashMap;

use persona_core::{ClipRole, NodeId};
use persona_scene::{Axis, JointRole, MeshRole, RigIndex, Scene};
use tracing::debug;

use crate::{AnimationMixer, ActionId, Clip, StyleProfile, Track, TrackProperty, TrackTarget};

/// Loop length of the procedural clips, in seconds
pub const PROCEDURAL_LOOP_SECS: f32 = 4.0;

/// Name and role lookup for registered actions
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    by_name: HashMap<String, ActionId>,
    by_role: HashMap<ClipRole, ActionId>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under `name` and, if given, as the action for
    /// `role`. An explicit role replaces any earlier alias.
    pub fn insert(&mut self, name: &str, id: ActionId, role: Option<ClipRole>) {
        self.by_name.insert(name.to_lowercase(), id);
        if let Some(role) = role {
            self.by_role.insert(role, id);
        }
    }

    /// Register a clip by name, inferring its role.
    ///
    /// A clip named exactly after a role always takes that role. A substring
    /// match only fills a role nobody claimed yet.
    pub fn register_clip(&mut self, name: &str, id: ActionId) {
        let lower = name.to_lowercase();
        if let Some(role) = ClipRole::all().iter().find(|r| r.name() == lower) {
            self.insert(&lower, id, Some(*role));
            return;
        }
        self.by_name.insert(lower.clone(), id);
        if let Some(role) = ClipRole::from_clip_name(&lower) {
            self.by_role.entry(role).or_insert(id);
        }
    }

    pub fn role(&self, role: ClipRole) -> Option<ActionId> {
        self.by_role.get(&role).copied()
    }

    pub fn get(&self, name: &str) -> Option<ActionId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn has_role(&self, role: ClipRole) -> bool {
        self.by_role.contains_key(&role)
    }

    /// Every registered name, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn wave(target: NodeId, property: TrackProperty, values: Vec<f32>) -> Track {
    let steps = values.len().saturating_sub(1).max(1) as f32;
    let times = (0..values.len())
        .map(|i| PROCEDURAL_LOOP_SECS * i as f32 / steps)
        .collect();
    Track::new(TrackTarget::Node(target), property, times, values)
}

/// Head joint, or the head mesh on unrigged geometry
fn head_target(index: &RigIndex) -> Option<NodeId> {
    index
        .joint(JointRole::Head)
        .or_else(|| index.mesh(MeshRole::Head))
}

/// Build the procedural clip for a role, if the rig can carry it
pub fn procedural_clip(role: ClipRole, index: &RigIndex, name: &str) -> Option<Clip> {
    let tracks = match role {
        ClipRole::Professional => {
            let root = index.root()?;
            vec![wave(root, TrackProperty::UniformScale, vec![1.0, 1.015, 1.0])]
        }
        ClipRole::Presenting => {
            let left = index.joint(JointRole::LeftShoulder)?;
            let right = index.joint(JointRole::RightShoulder)?;
            vec![
                wave(
                    left,
                    TrackProperty::Rotation(Axis::Z),
                    vec![0.0, 0.05, 0.0, -0.03, 0.0],
                ),
                wave(
                    right,
                    TrackProperty::Rotation(Axis::Z),
                    vec![0.0, -0.03, 0.0, 0.05, 0.0],
                ),
            ]
        }
        ClipRole::Attentive => {
            let target = index
                .joint(JointRole::Spine)
                .or_else(|| index.mesh(MeshRole::Head))?;
            vec![wave(target, TrackProperty::Rotation(Axis::X), vec![0.0, 0.05, 0.0])]
        }
        ClipRole::Analyzing => {
            let head = head_target(index)?;
            vec![wave(
                head,
                TrackProperty::Rotation(Axis::X),
                vec![0.0, 0.04, 0.0, 0.04, 0.0],
            )]
        }
        ClipRole::Confident => return None,
    };
    Some(Clip::new(name, PROCEDURAL_LOOP_SECS, tracks))
}

/// Register asset clips, then fill uncovered roles procedurally.
///
/// Asset clips must already be bound to scene nodes.
pub fn build_actions(
    mixer: &mut AnimationMixer,
    clips: Vec<Clip>,
    scene: &Scene,
    index: &RigIndex,
    profile: &StyleProfile,
) -> ActionTable {
    let mut table = ActionTable::new();

    for clip in clips {
        let name = clip.name.clone();
        let id = mixer.clip_action(clip);
        table.register_clip(&name, id);
    }

    for role in ClipRole::all() {
        if table.has_role(*role) {
            continue;
        }
        let name = profile.clip_name(*role);
        let Some(clip) = procedural_clip(*role, index, name) else {
            continue;
        };
        if clip.tracks.iter().all(|t| match t.target {
            TrackTarget::Node(id) => !scene.contains(id),
            TrackTarget::Local(_) => true,
        }) {
            continue;
        }
        let id = mixer.clip_action(clip);
        table.insert(name, id, Some(*role));
        debug!(role = %role, clip = name, "procedural clip registered");
    }

    table
}
