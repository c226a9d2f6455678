//! Scene manager - the render loop
//!
//! Owns the scene, camera, lights, surface and the avatar. One
//! [`SceneManager::tick`] per display refresh:
//!
//! 1. the voice feed refreshes the audio sample slot
//! 2. the avatar advances its mixer by the nominal timestep
//! 3. lip sync re-applies the latest sample
//! 4. idle motion layers on top
//! 5. the frame is drawn
//!
//! Everything runs on the caller's thread. Only [`SceneManager::initialize`]
//! awaits.

use std::time::{Duration, Instant};

use persona_anim::Transition;
use persona_core::{FrameClock, PersonaResult, SemanticState};
use persona_lipsync::AudioSampleSlot;
use persona_scene::Scene;
use tracing::{debug, info, warn};

use crate::{
    AcquisitionPipeline, AcquisitionReport, AcquisitionTicket, AssetFetcher, Avatar, FrameView,
    Light, LoaderSource, ModelSource, PerspectiveCamera, PersonaConfig, RenderSurface,
    VoiceEvent, VoiceFeed,
};

#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub draws: u64,
    pub draw_errors: u64,
    /// Ticks where lip sync had a frame to apply
    pub lipsync_frames: u64,
    pub synthetic_frames: u64,
    pub samples_stored: u64,
    pub state_changes: u64,
    pub last_tick_duration: Duration,
}

/// Scene, camera, surface and avatar, driven one frame at a time
pub struct SceneManager<S: RenderSurface> {
    config: PersonaConfig,
    scene: Scene,
    camera: PerspectiveCamera,
    lights: Vec<Light>,
    surface: S,
    avatar: Avatar,
    slot: AudioSampleSlot,
    voice: VoiceFeed,
    clock: FrameClock,
    stats: RuntimeStats,
}

impl<S: RenderSurface> SceneManager<S> {
    /// Validate `config` and set up an empty scene around `surface`
    pub fn new(config: PersonaConfig, surface: S) -> PersonaResult<Self> {
        config.validate()?;
        let (width, height) = surface.size();
        let seed = config.seed.unwrap_or_else(rand::random);
        let avatar = Avatar::new(&PersonaConfig {
            seed: Some(seed),
            ..config.clone()
        });
        let voice = VoiceFeed::new(config.synthetic, seed.wrapping_add(1));
        debug!(width, height, profile = %config.profile, "scene manager created");

        Ok(Self {
            scene: Scene::new(),
            camera: PerspectiveCamera::new(width, height),
            lights: Light::default_rig(),
            surface,
            avatar,
            slot: AudioSampleSlot::new(),
            voice,
            clock: FrameClock::new(),
            stats: RuntimeStats::default(),
            config,
        })
    }

    // --- Accessors ---

    pub fn config(&self) -> &PersonaConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn slot(&self) -> &AudioSampleSlot {
        &self.slot
    }

    pub fn voice(&self) -> &VoiceFeed {
        &self.voice
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn state(&self) -> SemanticState {
        self.avatar.state()
    }

    pub fn is_loading(&self) -> bool {
        self.avatar.is_loading()
    }

    // --- Initialization ---

    /// Acquire and attach the model. See [`Avatar::initialize`].
    pub async fn initialize<L, F>(
        &mut self,
        pipeline: &AcquisitionPipeline<L, F>,
    ) -> Option<ModelSource>
    where
        L: LoaderSource,
        F: AssetFetcher,
    {
        self.avatar.initialize(pipeline, &mut self.scene).await
    }

    /// Start an acquisition driven by the caller
    pub fn begin_initialize(&mut self) -> Option<AcquisitionTicket> {
        self.avatar.begin_initialize()
    }

    /// Hand back the result of a caller-driven acquisition
    pub fn complete(
        &mut self,
        ticket: AcquisitionTicket,
        report: AcquisitionReport,
    ) -> PersonaResult<ModelSource> {
        self.avatar.complete(ticket, report, &mut self.scene)
    }

    // --- Inputs ---

    pub fn set_state(&mut self, state: SemanticState) -> Option<Transition> {
        let transition = self.avatar.set_state(state, &mut self.scene);
        if transition.is_some() {
            self.stats.state_changes += 1;
        }
        transition
    }

    /// Store a magnitude frame for the next tick. Only the last frame
    /// stored before a tick is used.
    pub fn store_sample(&mut self, magnitudes: Vec<f32>) {
        self.slot.store(magnitudes);
        self.stats.samples_stored += 1;
    }

    /// Feed a voice lifecycle event. Returns the state the avatar moved to.
    pub fn handle_voice(&mut self, event: VoiceEvent) -> Option<SemanticState> {
        let next = self.voice.handle(event, &mut self.slot)?;
        self.set_state(next);
        Some(next)
    }

    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.avatar.set_pointer(x, y);
    }

    // --- Frame loop ---

    /// Advance one frame by the configured timestep and draw it
    pub fn tick(&mut self) -> PersonaResult<()> {
        self.tick_with(self.config.animation.timestep_secs)
    }

    /// Advance one frame by `dt` seconds and draw it
    pub fn tick_with(&mut self, dt: f32) -> PersonaResult<()> {
        let started = Instant::now();

        if self.voice.poll(dt, &mut self.slot) {
            self.stats.synthetic_frames += 1;
        }
        if self
            .avatar
            .update(dt, self.slot.latest(), &mut self.scene)
            .is_some()
        {
            self.stats.lipsync_frames += 1;
        }
        self.clock.advance(dt);

        let view = FrameView {
            scene: &self.scene,
            camera: &self.camera,
            lights: &self.lights,
            frame: self.clock.frames(),
        };
        let drawn = self.surface.draw(&view);
        match &drawn {
            Ok(()) => self.stats.draws += 1,
            Err(e) => {
                self.stats.draw_errors += 1;
                warn!(frame = self.clock.frames(), error = %e, "draw failed");
            }
        }

        self.stats.ticks += 1;
        self.stats.last_tick_duration = started.elapsed();
        drawn
    }

    /// Follow a container resize. Avatar state is untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
        self.surface.resize(width, height);
        debug!(width, height, aspect = self.camera.aspect, "resized");
    }

    /// Destroy the avatar and drop any pending sample. Idempotent.
    pub fn destroy(&mut self) -> bool {
        let destroyed = self.avatar.destroy(&mut self.scene);
        if destroyed {
            self.slot.clear();
            info!(ticks = self.stats.ticks, "scene manager torn down");
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AcquisitionPlan, BuiltinLoaderSource, FsFetcher, HeadlessSurface};
    use persona_core::PersonaError;

    fn config() -> PersonaConfig {
        PersonaConfig {
            seed: Some(5),
            ..PersonaConfig::default()
        }
    }

    fn manager() -> SceneManager<HeadlessSurface> {
        SceneManager::new(config(), HeadlessSurface::new(800, 600)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut bad = config();
        bad.loader_sources.clear();
        let err = SceneManager::new(bad, HeadlessSurface::new(1, 1)).err().unwrap();
        assert!(matches!(err, PersonaError::InvalidConfig(_)));
    }

    #[test]
    fn test_tick_before_model() {
        let mut m = manager();
        m.store_sample(vec![255.0; 4]);
        m.tick().unwrap();
        assert_eq!(m.stats().ticks, 1);
        assert_eq!(m.stats().draws, 1);
        assert_eq!(m.stats().lipsync_frames, 0);
        assert_eq!(m.surface().draws(), 1);
    }

    #[tokio::test]
    async fn test_initialize_without_assets_falls_back() {
        let mut m = manager();
        let dir = std::env::temp_dir().join(format!("persona-empty-{}", std::process::id()));
        let pipeline = AcquisitionPipeline::new(
            AcquisitionPlan::from_config(m.config()),
            BuiltinLoaderSource,
            FsFetcher::new(dir),
        );

        assert_eq!(m.initialize(&pipeline).await, Some(ModelSource::Fallback));
        assert!(!m.is_loading());
        assert_eq!(m.initialize(&pipeline).await, None);

        m.store_sample(vec![200.0; 16]);
        m.tick().unwrap();
        assert_eq!(m.stats().lipsync_frames, 1);
        assert!(m.surface().last_draw().unwrap().nodes > 1);
    }

    #[test]
    fn test_voice_drives_state() {
        let mut m = manager();
        let ticket = m.begin_initialize().unwrap();
        m.complete(ticket, AcquisitionReport::fallback(PersonaError::NoLoaderResolved))
            .unwrap();

        assert_eq!(m.handle_voice(VoiceEvent::SpeechStarted), Some(SemanticState::Talking));
        assert_eq!(m.state(), SemanticState::Talking);
        for _ in 0..20 {
            m.tick().unwrap();
        }
        assert!(m.stats().synthetic_frames >= 2);
        assert!(m.avatar().lipsync().last_intensity() > 0.0);

        assert_eq!(m.handle_voice(VoiceEvent::SpeechEnded), Some(SemanticState::Idle));
        m.tick().unwrap();
        assert_eq!(m.avatar().lipsync().last_intensity(), 0.0);
        assert_eq!(m.stats().state_changes, 2);
    }

    #[test]
    fn test_resize_keeps_state() {
        let mut m = manager();
        m.set_state(SemanticState::Thinking);
        m.resize(1920, 1080);
        assert_eq!(m.surface().size(), (1920, 1080));
        assert!((m.camera().aspect - 16.0 / 9.0).abs() < 1e-6);
        m.resize(1920, 0);
        assert!((m.camera().aspect - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(m.state(), SemanticState::Thinking);
    }

    #[test]
    fn test_destroy_twice() {
        let mut m = manager();
        let ticket = m.begin_initialize().unwrap();
        m.complete(ticket, AcquisitionReport::fallback(PersonaError::NoLoaderResolved))
            .unwrap();
        m.store_sample(vec![1.0]);
        assert!(m.destroy());
        assert!(m.slot().latest().is_none());
        assert_eq!(m.scene().node_count(), 1);
        assert!(!m.destroy());
        m.tick().unwrap();
    }
}
