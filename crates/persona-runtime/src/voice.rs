//! Voice lifecycle feed
//!
//! Bridges capture and speech-synthesis events to the audio sample slot
//! and tells the caller which semantic state fits the new phase:
//!
//! | event            | slot                     | state       |
//! |------------------|--------------------------|-------------|
//! | capture started  | untouched                | listening   |
//! | capture frame    | frame stored             | unchanged   |
//! | capture ended    | silence stored           | thinking    |
//! | speech started   | synthetic frame stored   | talking     |
//! | speech ended     | silence stored           | idle        |
//!
//! While speech is active, [`VoiceFeed::poll`] keeps the slot fed from the
//! synthetic generator.

use persona_core::SemanticState;
use persona_lipsync::{AudioSampleSlot, SyntheticParams, SyntheticSpeech};
use tracing::debug;

/// Input from the capture and synthesis collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    CaptureStarted,
    /// Magnitude frame from the live capture analysis
    CaptureFrame(Vec<f32>),
    CaptureEnded,
    SpeechStarted,
    SpeechEnded,
}

/// What the voice feed is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePhase {
    #[default]
    Quiet,
    Capturing,
    Speaking,
}

/// Turns capture and speech lifecycle events into sample-slot writes and avatar states
#[derive(Debug, Clone)]
pub struct VoiceFeed {
    synthetic: SyntheticSpeech,
    phase: VoicePhase,
}

impl VoiceFeed {
    pub fn new(params: SyntheticParams, seed: u64) -> Self {
        Self {
            synthetic: SyntheticSpeech::new(params, seed),
            phase: VoicePhase::Quiet,
        }
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    /// Apply one event. Returns the state the avatar should move to, if
    /// the event changes it.
    pub fn handle(&mut self, event: VoiceEvent, slot: &mut AudioSampleSlot) -> Option<SemanticState> {
        let bins = self.synthetic.params().bins;
        let next = match event {
            VoiceEvent::CaptureStarted => {
                self.synthetic.stop();
                self.phase = VoicePhase::Capturing;
                Some(SemanticState::Listening)
            }
            VoiceEvent::CaptureFrame(frame) => {
                // Late frames after capture ended would reopen the mouth
                if self.phase == VoicePhase::Capturing {
                    slot.store(frame);
                }
                None
            }
            VoiceEvent::CaptureEnded => {
                if self.phase != VoicePhase::Capturing {
                    return None;
                }
                self.phase = VoicePhase::Quiet;
                slot.store_silence(bins);
                Some(SemanticState::Thinking)
            }
            VoiceEvent::SpeechStarted => {
                self.phase = VoicePhase::Speaking;
                self.synthetic.start();
                slot.store(self.synthetic.frame());
                Some(SemanticState::Talking)
            }
            VoiceEvent::SpeechEnded => {
                if self.phase != VoicePhase::Speaking {
                    return None;
                }
                self.phase = VoicePhase::Quiet;
                self.synthetic.stop();
                slot.store_silence(bins);
                Some(SemanticState::Idle)
            }
        };
        if let Some(state) = next {
            debug!(phase = ?self.phase, state = %state, "voice phase changed");
        }
        next
    }

    /// Advance the synthetic generator. Returns whether a frame was stored.
    pub fn poll(&mut self, dt: f32, slot: &mut AudioSampleSlot) -> bool {
        if self.phase != VoicePhase::Speaking {
            return false;
        }
        match self.synthetic.poll(dt) {
            Some(frame) => {
                slot.store(frame);
                true
            }
            None => false,
        }
    }
}
