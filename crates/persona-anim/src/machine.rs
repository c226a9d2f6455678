//! Animation state machine
//!
//! Maps semantic states onto clip roles and cross-fades between the role
//! actions. The expression, business context, posture and tint follow in
//! the same call as the fade so nothing lags a frame behind.

use persona_core::{BusinessContext, ClipRole, SemanticState};
use persona_scene::{JointRole, MeshRole, RigIndex, Scene};
use tracing::{debug, info};

use crate::{ActionId, ActionTable, AnimationMixer, StyleProfile};

/// Shortest allowed cross-fade
pub const MIN_FADE_SECS: f32 = 0.5;
/// Longest allowed cross-fade, also the default
pub const MAX_FADE_SECS: f32 = 0.8;

/// Everything a transition touches
pub struct AnimationTargets<'a> {
    pub mixer: &'a mut AnimationMixer,
    pub actions: &'a ActionTable,
    pub scene: &'a mut Scene,
    pub rig: &'a RigIndex,
    pub profile: &'a StyleProfile,
}

/// Record of one performed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SemanticState,
    pub to: SemanticState,
    pub from_role: ClipRole,
    pub to_role: ClipRole,
    /// Action that received a fade-out
    pub faded_out: Option<ActionId>,
    /// Action that was reset and faded in
    pub faded_in: Option<ActionId>,
    /// Expression targets found on the face mesh
    pub expression_targets: usize,
}

/// Semantic state tracking and cross-fading
#[derive(Debug, Clone)]
pub struct AnimationStateMachine {
    state: SemanticState,
    role: ClipRole,
    fade_duration: f32,
    context: BusinessContext,
    transitions: u64,
}

impl Default for AnimationStateMachine {
    fn default() -> Self {
        Self::new(MAX_FADE_SECS)
    }
}

impl AnimationStateMachine {
    /// Create a machine in the idle state. The fade duration is clamped to
    /// [`MIN_FADE_SECS`]..=[`MAX_FADE_SECS`].
    pub fn new(fade_duration: f32) -> Self {
        let fade_duration = if fade_duration.is_finite() {
            fade_duration.clamp(MIN_FADE_SECS, MAX_FADE_SECS)
        } else {
            MAX_FADE_SECS
        };
        let state = SemanticState::default();
        Self {
            state,
            role: state.clip_role(),
            fade_duration,
            context: BusinessContext::for_role(state.clip_role()),
            transitions: 0,
        }
    }

    pub fn state(&self) -> SemanticState {
        self.state
    }

    pub fn role(&self) -> ClipRole {
        self.role
    }

    pub fn context(&self) -> BusinessContext {
        self.context
    }

    pub fn fade_duration(&self) -> f32 {
        self.fade_duration
    }

    /// Number of transitions performed
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Start the current state on a freshly set up model: its action plays
    /// at full weight and the look is applied. Returns the started action.
    pub fn enter(&mut self, targets: &mut AnimationTargets<'_>) -> Option<ActionId> {
        let action = targets.actions.role(self.role);
        if let Some(id) = action {
            targets.mixer.reset(id);
            targets.mixer.play(id);
        }
        let applied = self.apply_look(targets);
        debug!(
            state = %self.state,
            role = %self.role,
            action = action.is_some(),
            expression_targets = applied,
            "initial state entered"
        );
        action
    }

    /// Transition to `next`.
    ///
    /// Returns `None` when `next` plays the same role as the current state.
    /// A missing target action still records the state.
    pub fn set_state(
        &mut self,
        next: SemanticState,
        targets: &mut AnimationTargets<'_>,
    ) -> Option<Transition> {
        let next_role = next.clip_role();
        if next_role == self.role {
            debug!(state = %next, role = %next_role, "same role, transition skipped");
            return None;
        }

        let faded_out = targets.actions.role(self.role);
        if let Some(id) = faded_out {
            targets.mixer.fade_out(id, self.fade_duration);
        }

        let faded_in = targets.actions.role(next_role);
        if let Some(id) = faded_in {
            targets.mixer.reset(id);
            targets.mixer.fade_in(id, self.fade_duration);
            targets.mixer.play(id);
        }

        let from = self.state;
        let from_role = self.role;
        self.state = next;
        self.role = next_role;
        self.context = BusinessContext::for_role(next_role);
        self.transitions += 1;

        let expression_targets = self.apply_look(targets);

        info!(
            from = %from,
            to = %next,
            role = %next_role,
            animated = faded_in.is_some(),
            "state transition"
        );

        Some(Transition {
            from,
            to: next,
            from_role,
            to_role: next_role,
            faded_out,
            faded_in,
            expression_targets,
        })
    }

    /// Expression, posture and tint for the current state
    fn apply_look(&self, targets: &mut AnimationTargets<'_>) -> usize {
        let rig = targets.rig;
        let profile = targets.profile;
        let mut applied = 0;

        if let Some(face) = rig.face_mesh() {
            if let Some(morph) = targets.scene.get_mut(face).and_then(|n| n.morph_mut()) {
                applied = profile.expressions().select(self.state).apply(morph);
            }
        }

        if let (Some(pitch), Some(spine)) =
            (profile.posture_pitch(self.role), rig.joint(JointRole::Spine))
        {
            if let Some(t) = targets.scene.transform_mut(spine) {
                t.rotation.x = pitch;
            }
        }

        if let (Some(color), Some(head)) = (profile.tint(self.state), rig.mesh(MeshRole::Head)) {
            if let Some(mesh) = targets.scene.get_mut(head).and_then(|n| n.mesh_data_mut()) {
                mesh.material.color = color;
            }
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_actions, FadeState};
    use persona_core::{Engagement, ModelGeneration, Mood};
    use persona_scene::{
        Color, FallbackBuilder, Geometry, Material, MeshData, MorphTargets, NodeData, NodeTree,
        Shape,
    };
    use proptest::prelude::*;

    struct Rig {
        scene: Scene,
        index: RigIndex,
        mixer: AnimationMixer,
        actions: ActionTable,
        profile: StyleProfile,
    }

    impl Rig {
        fn targets(&mut self) -> AnimationTargets<'_> {
            AnimationTargets {
                mixer: &mut self.mixer,
                actions: &self.actions,
                scene: &mut self.scene,
                rig: &self.index,
                profile: &self.profile,
            }
        }

        fn fade(&self, role: ClipRole) -> FadeState {
            let id = self.actions.role(role).unwrap();
            self.mixer.action(id).unwrap().fade_state()
        }
    }

    fn setup(tree: NodeTree, profile: StyleProfile) -> Rig {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(tree, scene.root()).unwrap();
        let index = RigIndex::build(&scene, ids[0], ModelGeneration(1));
        let mut mixer = AnimationMixer::new();
        let actions = build_actions(&mut mixer, vec![], &scene, &index, &profile);
        Rig {
            scene,
            index,
            mixer,
            actions,
            profile,
        }
    }

    fn rigged() -> NodeTree {
        let mut t = NodeTree::new(NodeData::group("Armature"));
        let spine = t.add(NodeData::bone("Spine"), 0);
        let neck = t.add(NodeData::bone("Neck"), spine);
        t.add(NodeData::bone("Head"), neck);
        t.add(NodeData::bone("LeftShoulder"), spine);
        t.add(NodeData::bone("RightShoulder"), spine);
        let face = MeshData::new(
            Geometry::Primitive(Shape::sphere(0.3, 16)),
            Material::lambert(Color::white()),
        )
        .with_morph(MorphTargets::from_names([
            "mouthOpen",
            "mouthSmile",
            "eyesConfident",
            "eyesAttentive",
        ]));
        t.add(NodeData::mesh("Face", face), 0);
        t
    }

    fn smile(rig: &Rig) -> f32 {
        let face = rig.index.face_mesh().unwrap();
        rig.scene
            .get(face)
            .and_then(|n| n.morph())
            .and_then(|m| m.influence("mouthSmile"))
            .unwrap()
    }

    #[test]
    fn test_fade_duration_clamped() {
        assert_eq!(AnimationStateMachine::new(2.0).fade_duration(), MAX_FADE_SECS);
        assert_eq!(AnimationStateMachine::new(0.1).fade_duration(), MIN_FADE_SECS);
        assert_eq!(AnimationStateMachine::new(f32::NAN).fade_duration(), MAX_FADE_SECS);
        assert_eq!(AnimationStateMachine::new(0.6).fade_duration(), 0.6);
    }

    #[test]
    fn test_same_role_is_noop() {
        let mut rig = setup(rigged(), StyleProfile::business());
        let mut machine = AnimationStateMachine::default();
        machine.enter(&mut rig.targets());

        assert!(machine.set_state(SemanticState::Idle, &mut rig.targets()).is_none());
        assert!(machine.set_state(SemanticState::Sad, &mut rig.targets()).is_none());
        assert_eq!(machine.state(), SemanticState::Idle);
        assert_eq!(machine.transition_count(), 0);
        assert_eq!(rig.fade(ClipRole::Professional), FadeState::Steady);
    }

    #[test]
    fn test_talking_then_listening() {
        let mut rig = setup(rigged(), StyleProfile::business());
        let mut machine = AnimationStateMachine::default();
        machine.enter(&mut rig.targets());

        let t = machine
            .set_state(SemanticState::Talking, &mut rig.targets())
            .unwrap();
        assert_eq!(t.faded_out, rig.actions.role(ClipRole::Professional));
        assert_eq!(t.faded_in, rig.actions.role(ClipRole::Presenting));

        let t = machine
            .set_state(SemanticState::Listening, &mut rig.targets())
            .unwrap();
        assert_eq!(t.faded_out, rig.actions.role(ClipRole::Presenting));
        assert_eq!(rig.fade(ClipRole::Presenting), FadeState::FadingOut);
        assert_eq!(rig.fade(ClipRole::Attentive), FadeState::FadingIn);
        assert_eq!(rig.fade(ClipRole::Professional), FadeState::FadingOut);
        assert_eq!(machine.context().engagement, Engagement::Listening);
    }

    #[test]
    fn test_expression_and_posture_are_synchronous() {
        let mut rig = setup(rigged(), StyleProfile::business());
        let mut machine = AnimationStateMachine::default();
        machine.enter(&mut rig.targets());

        let t = machine
            .set_state(SemanticState::Talking, &mut rig.targets())
            .unwrap();
        assert_eq!(t.expression_targets, 2);
        assert_eq!(smile(&rig), 0.3);
        let spine = rig.index.joint(JointRole::Spine).unwrap();
        assert_eq!(rig.scene.get(spine).unwrap().transform.rotation.x, -0.05);
        assert_eq!(machine.context().mood, Mood::Confident);

        // Previous expression does not linger
        machine.set_state(SemanticState::Listening, &mut rig.targets());
        assert_eq!(smile(&rig), 0.0);
        assert_eq!(rig.scene.get(spine).unwrap().transform.rotation.x, 0.03);
    }

    #[test]
    fn test_missing_action_still_records_state() {
        let mut rig = setup(FallbackBuilder::default().build(), StyleProfile::generic());
        let mut machine = AnimationStateMachine::default();
        machine.enter(&mut rig.targets());

        let t = machine
            .set_state(SemanticState::Talking, &mut rig.targets())
            .unwrap();
        assert_eq!(t.faded_in, None);
        assert!(t.faded_out.is_some());
        assert_eq!(machine.state(), SemanticState::Talking);

        let head = rig.index.mesh(MeshRole::Head).unwrap();
        let color = rig.scene.get(head).unwrap().mesh_data().unwrap().material.color;
        assert_eq!(color, Color::from_hex(0xff6b6b));
    }

    fn any_state() -> impl Strategy<Value = SemanticState> {
        prop::sample::select(SemanticState::all().to_vec())
    }

    proptest! {
        #[test]
        fn prop_single_active_role(
            steps in prop::collection::vec((any_state(), 0.0f32..0.5), 1..40)
        ) {
            let mut rig = setup(rigged(), StyleProfile::business());
            let mut machine = AnimationStateMachine::default();
            machine.enter(&mut rig.targets());

            for (state, dt) in steps {
                machine.set_state(state, &mut rig.targets());
                rig.mixer.update(dt, &mut rig.scene);

                let active: Vec<ActionId> = rig
                    .mixer
                    .actions()
                    .filter(|(_, a)| a.is_playing() && a.fade_state() != FadeState::FadingOut)
                    .map(|(id, _)| id)
                    .collect();
                prop_assert!(active.len() <= 1);
                if let Some(id) = rig.actions.role(machine.role()) {
                    prop_assert_eq!(active, vec![id]);
                }
            }
        }

        #[test]
        fn prop_repeat_state_changes_nothing(state in any_state()) {
            let mut rig = setup(rigged(), StyleProfile::business());
            let mut machine = AnimationStateMachine::default();
            machine.enter(&mut rig.targets());
            machine.set_state(state, &mut rig.targets());

            let before: Vec<(FadeState, bool)> = rig
                .mixer
                .actions()
                .map(|(_, a)| (a.fade_state(), a.is_playing()))
                .collect();
            let count = machine.transition_count();

            prop_assert!(machine.set_state(state, &mut rig.targets()).is_none());
            let after: Vec<(FadeState, bool)> = rig
                .mixer
                .actions()
                .map(|(_, a)| (a.fade_state(), a.is_playing()))
                .collect();
            prop_assert_eq!(before, after);
            prop_assert_eq!(machine.transition_count(), count);
        }
    }
}
