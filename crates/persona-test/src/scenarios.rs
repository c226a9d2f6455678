//! End-to-end scenarios
//!
//! Each scenario wires real pipeline, avatar and scene manager code to
//! scripted collaborators and reports what happened. The tests at the
//! bottom assert on those reports.

use std::time::Duration;

use persona_anim::{ActionId, FadeState};
use persona_core::{ClipRole, NodeId, PersonaResult, SemanticState};
use persona_runtime::{
    AcquisitionPipeline, AcquisitionPlan, HeadlessSurface, ModelSource, PersonaConfig,
    SceneManager,
};
use persona_scene::{Scene, FALLBACK_ROOT_NAME};

use crate::{
    conversation_turn, AssetScript, ConversationSession, ScriptedFetcher, ScriptedLoaderSource,
    SessionStep, SessionTrace, RIGGED_GLTF,
};

/// Loader location served by the fixture decoder
pub const FIXTURE_LOADER: &str = "fixtures";

// ============================================================================
// HELPERS
// ============================================================================

/// Deterministic configuration with the given candidates and loaders
pub fn scenario_config(loaders: &[&str], candidates: &[&str]) -> PersonaConfig {
    PersonaConfig {
        loader_sources: loaders.iter().map(|s| s.to_string()).collect(),
        asset_candidates: candidates.iter().map(|s| s.to_string()).collect(),
        seed: Some(42),
        ..PersonaConfig::default()
    }
}

/// Fallback figures hanging directly under the scene root
pub fn fallback_roots(scene: &Scene) -> usize {
    scene
        .children(scene.root())
        .iter()
        .filter(|id| scene.get(**id).map_or(false, |n| n.name == FALLBACK_ROOT_NAME))
        .count()
}

fn fixture_pipeline(
    config: &PersonaConfig,
    fetcher: ScriptedFetcher,
) -> AcquisitionPipeline<ScriptedLoaderSource, ScriptedFetcher> {
    AcquisitionPipeline::new(
        AcquisitionPlan::from_config(config),
        ScriptedLoaderSource::unavailable().with_fixtures(FIXTURE_LOADER),
        fetcher,
    )
}

// ============================================================================
// FALLBACK
// ============================================================================

#[derive(Debug, Clone)]
pub struct FallbackReport {
    pub source: Option<ModelSource>,
    pub fallback_roots: usize,
    pub loading: bool,
    pub second_ticket_issued: bool,
    pub late_result_rejected: bool,
    pub loader_attempts: Vec<String>,
    pub probes: usize,
    pub fetches: usize,
}

/// Every candidate probe fails while two acquisitions race
pub async fn scenario_all_probes_fail() -> PersonaResult<FallbackReport> {
    let config = scenario_config(
        &["https://cdn-a/loader.js", "https://cdn-b/loader.js"],
        &["assets/models/business-character.glb", "assets/models/avatar.glb"],
    );
    let pipeline = AcquisitionPipeline::new(
        AcquisitionPlan::from_config(&config),
        ScriptedLoaderSource::unavailable().with_gltf("https://cdn-b/loader.js"),
        ScriptedFetcher::new()
            .with_asset("assets/models/avatar.glb", AssetScript::Missing)
            .with_latency(Duration::from_millis(5)),
    );
    let mut manager = SceneManager::new(config, HeadlessSurface::new(640, 480))?;

    let first = manager.begin_initialize();
    let second = manager.begin_initialize();
    let (a, b) = tokio::join!(pipeline.run(), pipeline.run());

    let mut source = None;
    let mut late_result_rejected = false;
    if let Some(ticket) = first {
        source = manager.complete(ticket, a).ok();
        late_result_rejected = manager.complete(ticket, b).is_err();
    }

    Ok(FallbackReport {
        source,
        fallback_roots: fallback_roots(manager.scene()),
        loading: manager.is_loading(),
        second_ticket_issued: second.is_some(),
        late_result_rejected,
        loader_attempts: pipeline.loader().attempts(),
        probes: pipeline.fetcher().probe_count(),
        fetches: pipeline.fetcher().fetch_count(),
    })
}

// ============================================================================
// TRANSITIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct TransitionReport {
    pub talking: Option<ActionId>,
    pub listening: Option<ActionId>,
    pub talking_fade: Option<FadeState>,
    pub listening_fade: Option<FadeState>,
    pub listening_time: Option<f32>,
    pub professional_fade: Option<FadeState>,
    pub transitions: u64,
    /// Weights after the fades have completed, by action
    pub settled_weights: Vec<(ActionId, f32)>,
}

/// `talking` immediately followed by `listening` on a fully rigged model
pub async fn scenario_talking_then_listening() -> PersonaResult<TransitionReport> {
    let config = scenario_config(&[FIXTURE_LOADER], &["assets/models/avatar.glb"]);
    let pipeline = fixture_pipeline(
        &config,
        ScriptedFetcher::new().with_bytes("assets/models/avatar.glb", &b"fixture:rigged"[..]),
    );
    let mut session = ConversationSession::start(config, &pipeline).await?;
    session.run(&[SessionStep::Ticks(10)]);

    let m = session.manager_mut();
    m.set_state(SemanticState::Talking);
    m.set_state(SemanticState::Listening);

    let avatar = m.avatar();
    let actions = avatar.actions();
    let mixer = avatar.mixer();
    let talking = actions.role(ClipRole::Presenting);
    let listening = actions.role(ClipRole::Attentive);
    let professional = actions.role(ClipRole::Professional);
    let fade = |id: Option<ActionId>| id.and_then(|id| mixer.action(id)).map(|a| a.fade_state());

    let mut report = TransitionReport {
        talking,
        listening,
        talking_fade: fade(talking),
        listening_fade: fade(listening),
        listening_time: listening.and_then(|id| mixer.action(id)).map(|a| a.time()),
        professional_fade: fade(professional),
        transitions: avatar.machine().transition_count(),
        settled_weights: Vec::new(),
    };

    // Past the longest fade
    session.run(&[SessionStep::Ticks(60)]);
    let mixer = session.manager().avatar().mixer();
    report.settled_weights = mixer
        .actions()
        .map(|(id, a)| (id, a.effective_weight()))
        .collect();
    Ok(report)
}

// ============================================================================
// LIP SYNC
// ============================================================================

#[derive(Debug, Clone)]
pub struct MouthReport {
    pub source: Option<ModelSource>,
    pub mouth: Option<NodeId>,
    /// Vertical scale of the mouth mesh after every tick
    pub scales: Vec<f32>,
    pub blend_shapes_touched: bool,
}

/// Uniform full-scale input on a model whose only mouth is a plain mesh
pub async fn scenario_mouth_piece(ticks: usize) -> PersonaResult<MouthReport> {
    let config = scenario_config(&[FIXTURE_LOADER], &["props/mouth_piece.glb"]);
    let pipeline = fixture_pipeline(
        &config,
        ScriptedFetcher::new().with_bytes("props/mouth_piece.glb", &b"fixture:mouth_piece"[..]),
    );
    let mut session = ConversationSession::start(config, &pipeline).await?;
    let mouth = session.manager().avatar().rig().mouth_meshes().first().copied();

    session.step(SessionStep::Sample(vec![255.0; 32]));
    let mut scales = Vec::with_capacity(ticks);
    let mut blend_shapes_touched = false;
    for _ in 0..ticks {
        session.step(SessionStep::Ticks(1));
        let scene = session.manager().scene();
        if let Some(y) = mouth.and_then(|id| scene.get(id)).map(|n| n.transform.scale.y) {
            scales.push(y);
        }
        blend_shapes_touched |= !session.manager().avatar().rig().morph_meshes().is_empty();
    }

    Ok(MouthReport {
        source: session.source().cloned(),
        mouth,
        scales,
        blend_shapes_touched,
    })
}

#[derive(Debug, Clone)]
pub struct GltfReport {
    pub source: Option<ModelSource>,
    pub probes: Vec<String>,
    pub joints: usize,
    pub face_indexed: bool,
    pub mouth_open: Option<f32>,
}

/// A real glTF document behind a missing first candidate
pub async fn scenario_gltf_asset() -> PersonaResult<GltfReport> {
    let config = scenario_config(
        &["builtin:gltf"],
        &["assets/models/business-character.glb", "assets/models/avatar.gltf"],
    );
    let pipeline = AcquisitionPipeline::new(
        AcquisitionPlan::from_config(&config),
        ScriptedLoaderSource::unavailable().with_gltf("builtin:gltf"),
        ScriptedFetcher::new().with_bytes("assets/models/avatar.gltf", RIGGED_GLTF.as_bytes()),
    );
    let mut session = ConversationSession::start(config, &pipeline).await?;
    session.run(&[SessionStep::Sample(vec![255.0; 16]), SessionStep::Ticks(1)]);

    let manager = session.manager();
    let rig = manager.avatar().rig();
    let mouth_open = rig
        .face_mesh()
        .and_then(|id| manager.scene().get(id))
        .and_then(|n| n.morph())
        .and_then(|m| m.influence("mouthOpen"));

    Ok(GltfReport {
        source: session.source().cloned(),
        probes: pipeline.fetcher().probed_paths(),
        joints: rig.joint_count(),
        face_indexed: rig.face_mesh().is_some(),
        mouth_open,
    })
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[derive(Debug, Clone)]
pub struct RaceReport {
    pub rejected: bool,
    pub node_count: usize,
    pub has_model: bool,
    pub loading: bool,
    pub second_destroy: bool,
}

/// The avatar is destroyed while its acquisition is still in flight
pub async fn scenario_destroy_races_load() -> PersonaResult<RaceReport> {
    let config = scenario_config(&[FIXTURE_LOADER], &["assets/models/avatar.glb"]);
    let pipeline = fixture_pipeline(
        &config,
        ScriptedFetcher::new()
            .with_bytes("assets/models/avatar.glb", &b"fixture:rigged"[..])
            .with_latency(Duration::from_millis(20)),
    );
    let mut manager = SceneManager::new(config, HeadlessSurface::new(640, 480))?;

    let ticket = manager.begin_initialize();
    let in_flight = pipeline.run();
    manager.destroy();
    let report = in_flight.await;

    let rejected = match ticket {
        Some(ticket) => manager.complete(ticket, report).is_err(),
        None => false,
    };
    manager.tick()?;

    Ok(RaceReport {
        rejected,
        node_count: manager.scene().node_count(),
        has_model: manager.avatar().has_model(),
        loading: manager.is_loading(),
        second_destroy: manager.destroy(),
    })
}

// ============================================================================
// CONVERSATION
// ============================================================================

/// One full turn on the fallback figure
pub async fn scenario_conversation_turn() -> PersonaResult<(Option<ModelSource>, SessionTrace)> {
    let config = scenario_config(&[FIXTURE_LOADER], &[]);
    let pipeline = fixture_pipeline(&config, ScriptedFetcher::new());
    let mut session = ConversationSession::start(config, &pipeline).await?;
    session.run(&conversation_turn(12, 90));
    Ok((session.source().cloned(), session.trace().clone()))
}
