//! Avatar entity
//!
//! Owns everything tied to one model: the mixer and its actions, the rig
//! index, the state machine, lip sync and idle motion. The scene itself is
//! passed in by the caller on every call that touches it.
//!
//! Acquisition runs outside the avatar. [`Avatar::begin_initialize`] hands
//! out a ticket, the pipeline runs without borrowing the avatar, and
//! [`Avatar::complete`] attaches the result only if the ticket is still
//! the current one. Destroying the avatar invalidates every ticket.

use persona_anim::{
    build_actions, ActionTable, AnimationMixer, AnimationStateMachine, AnimationTargets, Clip,
    StyleProfile, Transition,
};
use persona_core::{ModelGeneration, NodeId, PersonaError, PersonaResult, SemanticState};
use persona_lipsync::{ChannelReport, LipSyncEngine};
use persona_scene::{normalize_name, FallbackBuilder, NodeKind, NodeTree, RigIndex, Scene};
use tracing::{debug, info, warn};

use crate::{
    AcquisitionPipeline, AcquisitionReport, AssetFetcher, AssetOutcome, IdleMotion, LoaderSource,
    ModelSource, PersonaConfig,
};

/// Proof that an acquisition was started for a given avatar generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionTicket {
    id: u64,
    generation: ModelGeneration,
}

impl AcquisitionTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> ModelGeneration {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct AttachedModel {
    root: NodeId,
    source: ModelSource,
}

/// The animated conversational character
#[derive(Debug)]
pub struct Avatar {
    profile: StyleProfile,
    machine: AnimationStateMachine,
    mixer: AnimationMixer,
    actions: ActionTable,
    rig: RigIndex,
    lipsync: LipSyncEngine,
    motion: IdleMotion,
    generation: ModelGeneration,
    model: Option<AttachedModel>,
    tickets: u64,
    pending: Option<u64>,
    fallback_built: bool,
    destroyed: bool,
}

impl Avatar {
    pub fn new(config: &PersonaConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            profile: StyleProfile::for_kind(config.profile),
            machine: AnimationStateMachine::new(config.animation.fade_duration_secs),
            mixer: AnimationMixer::new(),
            actions: ActionTable::new(),
            rig: RigIndex::empty(ModelGeneration::ZERO),
            lipsync: LipSyncEngine::new(config.lipsync.clone()),
            motion: IdleMotion::new(config.idle, seed),
            generation: ModelGeneration::ZERO,
            model: None,
            tickets: 0,
            pending: None,
            fallback_built: false,
            destroyed: false,
        }
    }

    // --- Status ---

    pub fn state(&self) -> SemanticState {
        self.machine.state()
    }

    /// True from the start of an acquisition until its result is handled
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.model.as_ref().map(|m| m.root)
    }

    pub fn model_source(&self) -> Option<&ModelSource> {
        self.model.as_ref().map(|m| &m.source)
    }

    /// Bumped whenever a model is attached or the avatar is destroyed
    pub fn generation(&self) -> ModelGeneration {
        self.generation
    }

    pub fn profile(&self) -> &StyleProfile {
        &self.profile
    }

    pub fn machine(&self) -> &AnimationStateMachine {
        &self.machine
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn rig(&self) -> &RigIndex {
        &self.rig
    }

    pub fn lipsync(&self) -> &LipSyncEngine {
        &self.lipsync
    }

    pub fn motion(&self) -> &IdleMotion {
        &self.motion
    }

    // --- Initialization ---

    /// Start an acquisition.
    ///
    /// Returns `None` when one is already in flight, a model is already
    /// attached or the avatar was destroyed.
    pub fn begin_initialize(&mut self) -> Option<AcquisitionTicket> {
        if self.destroyed {
            debug!("initialize after destroy ignored");
            return None;
        }
        if self.pending.is_some() || self.model.is_some() {
            debug!(loading = self.pending.is_some(), "avatar already initializing or initialized");
            return None;
        }
        self.tickets += 1;
        self.pending = Some(self.tickets);
        debug!(ticket = self.tickets, generation = self.generation.0, "acquisition started");
        Some(AcquisitionTicket {
            id: self.tickets,
            generation: self.generation,
        })
    }

    /// Attach the result of the acquisition started with `ticket`.
    ///
    /// A stale ticket (the avatar was destroyed, or a newer acquisition
    /// took over) leaves the scene untouched. Any other failure ends in the
    /// procedural fallback, which is built at most once per avatar.
    pub fn complete(
        &mut self,
        ticket: AcquisitionTicket,
        report: AcquisitionReport,
        scene: &mut Scene,
    ) -> PersonaResult<ModelSource> {
        if self.destroyed
            || ticket.generation != self.generation
            || self.pending != Some(ticket.id)
        {
            warn!(
                ticket = ticket.id,
                destroyed = self.destroyed,
                "late acquisition result dropped"
            );
            return Err(PersonaError::AcquisitionSuperseded {
                ticket: ticket.generation.0,
                current: self.generation.0,
            });
        }
        self.pending = None;

        for failure in &report.failures {
            debug!(error = %failure, "acquisition step failed");
        }

        let root = scene.root();
        let source = match report.outcome {
            AssetOutcome::Loaded { path, asset } => {
                let source = ModelSource::Asset(path);
                match self.attach_model(asset.tree, asset.clips, source.clone(), scene, root) {
                    Ok(()) => source,
                    Err(e) => {
                        warn!(error = %e, "loaded asset could not be attached");
                        self.attach_fallback(scene, root)?
                    }
                }
            }
            AssetOutcome::Fallback { cause } => {
                warn!(cause = %cause, "using procedural fallback");
                self.attach_fallback(scene, root)?
            }
        };

        info!(
            source = %source,
            state = %self.machine.state(),
            joints = self.rig.joint_count(),
            actions = self.actions.len(),
            "avatar ready"
        );
        Ok(source)
    }

    /// Run the whole acquisition and attach its result.
    ///
    /// Returns `None` if the avatar could not start an acquisition (see
    /// [`Avatar::begin_initialize`]).
    pub async fn initialize<L, F>(
        &mut self,
        pipeline: &AcquisitionPipeline<L, F>,
        scene: &mut Scene,
    ) -> Option<ModelSource>
    where
        L: LoaderSource,
        F: AssetFetcher,
    {
        let ticket = self.begin_initialize()?;
        let report = pipeline.run().await;
        self.complete(ticket, report, scene).ok()
    }

    /// Build and attach the fallback under `parent`. The figure counts as
    /// built only once it is actually in the scene.
    fn attach_fallback(
        &mut self,
        scene: &mut Scene,
        parent: NodeId,
    ) -> PersonaResult<ModelSource> {
        if self.fallback_built {
            debug!("fallback already built");
            return Ok(ModelSource::Fallback);
        }
        let tree = FallbackBuilder::new(self.profile.theme().clone()).build();
        self.attach_model(tree, Vec::new(), ModelSource::Fallback, scene, parent)?;
        self.fallback_built = true;
        info!(kind = %self.profile.kind(), "procedural fallback built");
        Ok(ModelSource::Fallback)
    }

    fn attach_model(
        &mut self,
        tree: NodeTree,
        clips: Vec<Clip>,
        source: ModelSource,
        scene: &mut Scene,
        parent: NodeId,
    ) -> PersonaResult<()> {
        if let Some(old) = self.model.take() {
            self.mixer.stop_all();
            scene.detach(old.root);
        }
        self.generation = self.generation.next();
        self.motion.reset();

        let ids = scene.attach_tree(tree, parent)?;
        let root = ids[0];
        let clips: Vec<Clip> = clips.into_iter().map(|c| c.bind(&ids)).collect();

        if !source.is_fallback() {
            tune_materials(scene, &ids);
        }

        self.rig = RigIndex::build(scene, root, self.generation);
        self.mixer = AnimationMixer::new();
        self.actions = build_actions(&mut self.mixer, clips, scene, &self.rig, &self.profile);
        self.model = Some(AttachedModel { root, source });

        let mut targets = AnimationTargets {
            mixer: &mut self.mixer,
            actions: &self.actions,
            scene,
            rig: &self.rig,
            profile: &self.profile,
        };
        self.machine.enter(&mut targets);
        Ok(())
    }

    // --- Per-call inputs ---

    /// Change the semantic state. Works before a model is attached: the
    /// state is recorded and played once the model arrives.
    pub fn set_state(&mut self, state: SemanticState, scene: &mut Scene) -> Option<Transition> {
        if self.destroyed {
            return None;
        }
        let mut targets = AnimationTargets {
            mixer: &mut self.mixer,
            actions: &self.actions,
            scene,
            rig: &self.rig,
            profile: &self.profile,
        };
        self.machine.set_state(state, &mut targets)
    }

    /// Drive the mouth from one magnitude frame. Absent or empty frames,
    /// and calls before a model exists, do nothing.
    pub fn update_lip_sync(
        &mut self,
        magnitudes: Option<&[f32]>,
        scene: &mut Scene,
    ) -> Option<ChannelReport> {
        if self.destroyed || self.model.is_none() {
            return None;
        }
        self.lipsync.apply(magnitudes, scene, &self.rig)
    }

    /// Normalized pointer position for gaze, each axis in [-1, 1]
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.motion.set_pointer(x, y);
    }

    /// One frame: mixer, then lip sync from `sample`, then idle motion.
    /// A no-op until a model is attached.
    pub fn update(
        &mut self,
        dt: f32,
        sample: Option<&[f32]>,
        scene: &mut Scene,
    ) -> Option<ChannelReport> {
        if self.destroyed || self.model.is_none() {
            return None;
        }
        self.mixer.update(dt, scene);
        let report = self.lipsync.apply(sample, scene, &self.rig);
        self.motion.update(dt, self.machine.state(), scene, &self.rig);
        report
    }

    /// Stop every action and detach the model. Returns false if the avatar
    /// was already destroyed.
    pub fn destroy(&mut self, scene: &mut Scene) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        self.pending = None;
        self.mixer.stop_all();
        if let Some(model) = self.model.take() {
            scene.detach(model.root);
        }
        self.mixer = AnimationMixer::new();
        self.actions = ActionTable::new();
        self.generation = self.generation.next();
        self.rig = RigIndex::empty(self.generation);
        self.motion.reset();
        info!(generation = self.generation.0, "avatar destroyed");
        true
    }
}

/// Fabric-like surfaces for suit and shirt meshes, shadows on every mesh
fn tune_materials(scene: &mut Scene, ids: &[NodeId]) {
    for id in ids {
        let Some(node) = scene.get_mut(*id) else {
            continue;
        };
        let name = normalize_name(&node.name);
        let NodeKind::Mesh(mesh) = &mut node.kind else {
            continue;
        };
        if name.contains("suit") || name.contains("shirt") {
            mesh.material.roughness = 0.7;
            mesh.material.metalness = 0.1;
        }
        mesh.cast_shadow = true;
        mesh.receive_shadow = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_anim::{FadeState, Track, TrackProperty, TrackTarget};
    use persona_core::ClipRole;
    use persona_scene::{
        Axis, Color, Geometry, Material, MeshData, MorphTargets, NodeData, FALLBACK_ROOT_NAME,
    };

    use crate::ModelAsset;

    fn config() -> PersonaConfig {
        PersonaConfig {
            seed: Some(11),
            ..PersonaConfig::default()
        }
    }

    fn mesh(name: &str, morphs: &[&str]) -> NodeData {
        let mut m = MeshData::new(
            Geometry::Buffer {
                vertex_count: 24,
                index_count: 36,
            },
            Material::standard(Color::white(), 0.2, 0.5),
        );
        if !morphs.is_empty() {
            m = m.with_morph(MorphTargets::from_names(morphs.iter().copied()));
        }
        NodeData::mesh(name, m)
    }

    fn rigged_asset() -> ModelAsset {
        let mut t = NodeTree::new(NodeData::group("Armature"));
        let spine = t.add(NodeData::bone("Spine"), 0);
        let neck = t.add(NodeData::bone("Neck"), spine);
        let head = t.add(NodeData::bone("Head"), neck);
        t.add(NodeData::bone("LeftShoulder"), spine);
        t.add(NodeData::bone("RightShoulder"), spine);
        t.add(
            mesh("Wolf3D_Head", &["mouthOpen", "mouthSmile", "eyesConfident"]),
            0,
        );
        t.add(mesh("Wolf3D_Outfit_Suit", &[]), 0);

        let talk = Clip::new(
            "Talking_01",
            1.0,
            vec![Track::new(
                TrackTarget::Local(head),
                TrackProperty::Rotation(Axis::Y),
                vec![0.0, 1.0],
                vec![0.0, 0.2],
            )],
        );
        ModelAsset::new(t, vec![talk])
    }

    fn loaded(asset: ModelAsset) -> AcquisitionReport {
        AcquisitionReport {
            outcome: AssetOutcome::Loaded {
                path: "assets/models/avatar.glb".to_string(),
                asset,
            },
            failures: vec![],
        }
    }

    fn fallback_roots(scene: &Scene) -> usize {
        scene
            .children(scene.root())
            .iter()
            .filter(|id| scene.get(**id).map_or(false, |n| n.name == FALLBACK_ROOT_NAME))
            .count()
    }

    #[test]
    fn test_fallback_attached_once() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());

        let ticket = avatar.begin_initialize().unwrap();
        assert!(avatar.is_loading());
        assert!(avatar.begin_initialize().is_none());

        let source = avatar
            .complete(
                ticket,
                AcquisitionReport::fallback(PersonaError::CandidatesExhausted(2)),
                &mut scene,
            )
            .unwrap();
        assert_eq!(source, ModelSource::Fallback);
        assert!(!avatar.is_loading());
        assert!(avatar.has_model());
        assert_eq!(fallback_roots(&scene), 1);

        // Completed avatars hand out no further tickets
        assert!(avatar.begin_initialize().is_none());
        assert!(avatar
            .complete(
                ticket,
                AcquisitionReport::fallback(PersonaError::NoLoaderResolved),
                &mut scene
            )
            .is_err());
        assert_eq!(fallback_roots(&scene), 1);
    }

    #[test]
    fn test_failed_fallback_attach_can_be_retried() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());

        let gone = scene
            .attach_tree(NodeTree::new(NodeData::group("anchor")), scene.root())
            .unwrap()[0];
        scene.detach(gone);

        assert!(matches!(
            avatar.attach_fallback(&mut scene, gone),
            Err(PersonaError::StaleNode(_))
        ));
        assert!(!avatar.fallback_built);
        assert!(!avatar.has_model());
        assert_eq!(fallback_roots(&scene), 0);

        let root = scene.root();
        assert_eq!(
            avatar.attach_fallback(&mut scene, root).unwrap(),
            ModelSource::Fallback
        );
        assert!(avatar.has_model());
        assert_eq!(fallback_roots(&scene), 1);
    }

    #[test]
    fn test_loaded_asset_setup() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());
        let ticket = avatar.begin_initialize().unwrap();
        let source = avatar.complete(ticket, loaded(rigged_asset()), &mut scene).unwrap();

        assert_eq!(source, ModelSource::Asset("assets/models/avatar.glb".into()));
        assert!(avatar.rig().is_current(avatar.generation()));
        assert!(avatar.rig().face_mesh().is_some());
        // Asset clip aliased onto the presenting role
        assert_eq!(
            avatar.actions().role(ClipRole::Presenting),
            avatar.mixer().find("Talking_01")
        );

        let suit = scene.find_by_name(scene.root(), "Wolf3D_Outfit_Suit").unwrap();
        let data = scene.get(suit).unwrap().mesh_data().unwrap();
        assert_eq!(data.material.roughness, 0.7);
        assert_eq!(data.material.metalness, 0.1);
        assert!(data.cast_shadow && data.receive_shadow);
    }

    #[test]
    fn test_transition_applies_expression() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());
        let ticket = avatar.begin_initialize().unwrap();
        avatar.complete(ticket, loaded(rigged_asset()), &mut scene).unwrap();

        let transition = avatar.set_state(SemanticState::Talking, &mut scene).unwrap();
        assert_eq!(transition.to_role, ClipRole::Presenting);
        let talking = transition.faded_in.unwrap();
        assert_eq!(
            avatar.mixer().action(talking).unwrap().fade_state(),
            FadeState::FadingIn
        );

        let face = avatar.rig().face_mesh().unwrap();
        let morph = scene.get(face).unwrap().morph().unwrap();
        assert!((morph.influence("mouthSmile").unwrap() - 0.3).abs() < 1e-6);
        assert!((morph.influence("eyesConfident").unwrap() - 0.4).abs() < 1e-6);

        assert!(avatar.set_state(SemanticState::Talking, &mut scene).is_none());
    }

    #[test]
    fn test_state_before_load_is_honored() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());
        let ticket = avatar.begin_initialize().unwrap();

        assert!(avatar.update(0.016, Some(&[255.0]), &mut scene).is_none());
        let t = avatar.set_state(SemanticState::Listening, &mut scene).unwrap();
        assert!(t.faded_in.is_none());
        assert_eq!(avatar.state(), SemanticState::Listening);

        avatar
            .complete(
                ticket,
                AcquisitionReport::fallback(PersonaError::NoLoaderResolved),
                &mut scene,
            )
            .unwrap();
        let attentive = avatar.actions().role(ClipRole::Attentive).unwrap();
        assert!(avatar.mixer().action(attentive).unwrap().is_playing());
    }

    #[test]
    fn test_destroy_before_completion() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());
        let ticket = avatar.begin_initialize().unwrap();

        assert!(avatar.destroy(&mut scene));
        assert!(!avatar.is_loading());
        let err = avatar
            .complete(ticket, loaded(rigged_asset()), &mut scene)
            .unwrap_err();
        assert!(matches!(err, PersonaError::AcquisitionSuperseded { .. }));
        assert_eq!(scene.node_count(), 1);
        assert!(!avatar.has_model());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());
        let ticket = avatar.begin_initialize().unwrap();
        avatar
            .complete(
                ticket,
                AcquisitionReport::fallback(PersonaError::NoLoaderResolved),
                &mut scene,
            )
            .unwrap();
        let root = avatar.model_root().unwrap();

        assert!(avatar.destroy(&mut scene));
        assert!(!scene.contains(root));
        assert_eq!(scene.node_count(), 1);
        assert!(!avatar.destroy(&mut scene));
        assert!(avatar.set_state(SemanticState::Talking, &mut scene).is_none());
        assert!(avatar.update(0.016, Some(&[255.0]), &mut scene).is_none());
        assert!(avatar.begin_initialize().is_none());
    }

    #[test]
    fn test_update_drives_fallback_mouth() {
        let mut scene = Scene::new();
        let mut avatar = Avatar::new(&config());
        let ticket = avatar.begin_initialize().unwrap();
        avatar
            .complete(
                ticket,
                AcquisitionReport::fallback(PersonaError::NoLoaderResolved),
                &mut scene,
            )
            .unwrap();
        let mouth = avatar.rig().mouth_meshes()[0];
        let before = scene.get(mouth).unwrap().transform.scale.y;

        let report = avatar.update(0.016, Some(&[255.0; 8]), &mut scene).unwrap();
        assert_eq!(report.scaled_meshes, 1);
        assert!(scene.get(mouth).unwrap().transform.scale.y > before);
        assert!(avatar.update(0.016, None, &mut scene).is_none());
    }
}
