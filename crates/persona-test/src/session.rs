//! Scripted conversation sessions
//!
//! Drives a headless [`SceneManager`] through a list of steps the way an
//! orchestration layer would, and records what the avatar did.

use persona_core::{PersonaResult, SemanticState};
use persona_runtime::{
    AcquisitionPipeline, AssetFetcher, HeadlessSurface, LoaderSource, ModelSource, PersonaConfig,
    SceneManager, VoiceEvent,
};
use tracing::debug;

// ============================================================================
// STEPS
// ============================================================================

/// One thing that happens during a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    Voice(VoiceEvent),
    SetState(SemanticState),
    /// Store a magnitude frame directly, bypassing the voice feed
    Sample(Vec<f32>),
    /// Run this many nominal ticks
    Ticks(usize),
    Pointer(f32, f32),
    Resize(u32, u32),
}

/// The steps of one conversational turn: the user speaks, the avatar
/// thinks, then answers.
pub fn conversation_turn(capture_frames: usize, speech_ticks: usize) -> Vec<SessionStep> {
    let mut steps = vec![SessionStep::Voice(VoiceEvent::CaptureStarted)];
    for i in 0..capture_frames {
        let level = 60.0 + (i % 8) as f32 * 20.0;
        steps.push(SessionStep::Voice(VoiceEvent::CaptureFrame(vec![level; 32])));
        steps.push(SessionStep::Ticks(1));
    }
    steps.push(SessionStep::Voice(VoiceEvent::CaptureEnded));
    steps.push(SessionStep::Ticks(30));
    steps.push(SessionStep::Voice(VoiceEvent::SpeechStarted));
    steps.push(SessionStep::Ticks(speech_ticks));
    steps.push(SessionStep::Voice(VoiceEvent::SpeechEnded));
    steps.push(SessionStep::Ticks(30));
    steps
}

// ============================================================================
// TRACE
// ============================================================================

/// What a session observed
#[derive(Debug, Clone, Default)]
pub struct SessionTrace {
    /// State after every state change, in order
    pub states: Vec<SemanticState>,
    /// Lip-sync intensity after every tick
    pub intensities: Vec<f32>,
    pub ticks: u64,
    pub draw_errors: u64,
}

impl SessionTrace {
    pub fn peak_intensity(&self) -> f32 {
        self.intensities.iter().copied().fold(0.0, f32::max)
    }

    pub fn final_intensity(&self) -> f32 {
        self.intensities.last().copied().unwrap_or(0.0)
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// A headless avatar plus a trace of its behavior
pub struct ConversationSession {
    manager: SceneManager<HeadlessSurface>,
    source: Option<ModelSource>,
    trace: SessionTrace,
}

impl ConversationSession {
    /// Build the manager and run acquisition to completion
    pub async fn start<L, F>(
        config: PersonaConfig,
        pipeline: &AcquisitionPipeline<L, F>,
    ) -> PersonaResult<Self>
    where
        L: LoaderSource,
        F: AssetFetcher,
    {
        let mut manager = SceneManager::new(config, HeadlessSurface::new(800, 600))?;
        let source = manager.initialize(pipeline).await;
        debug!(source = ?source, "session started");
        Ok(Self {
            manager,
            source,
            trace: SessionTrace::default(),
        })
    }

    pub fn manager(&self) -> &SceneManager<HeadlessSurface> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SceneManager<HeadlessSurface> {
        &mut self.manager
    }

    pub fn source(&self) -> Option<&ModelSource> {
        self.source.as_ref()
    }

    pub fn trace(&self) -> &SessionTrace {
        &self.trace
    }

    pub fn run(&mut self, steps: &[SessionStep]) {
        for step in steps {
            self.step(step.clone());
        }
    }

    pub fn step(&mut self, step: SessionStep) {
        match step {
            SessionStep::Voice(event) => {
                if let Some(state) = self.manager.handle_voice(event) {
                    self.trace.states.push(state);
                }
            }
            SessionStep::SetState(state) => {
                if self.manager.set_state(state).is_some() {
                    self.trace.states.push(state);
                }
            }
            SessionStep::Sample(frame) => self.manager.store_sample(frame),
            SessionStep::Ticks(n) => {
                for _ in 0..n {
                    if self.manager.tick().is_err() {
                        self.trace.draw_errors += 1;
                    }
                    self.trace.ticks += 1;
                    self.trace
                        .intensities
                        .push(self.manager.avatar().lipsync().last_intensity());
                }
            }
            SessionStep::Pointer(x, y) => self.manager.set_pointer(x, y),
            SessionStep::Resize(w, h) => self.manager.resize(w, h),
        }
    }

    /// Tear the avatar down. Returns false if it already was.
    pub fn end(&mut self) -> bool {
        self.manager.destroy()
    }
}
