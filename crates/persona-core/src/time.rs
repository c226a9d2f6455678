//! Frame time primitives
//!
//! The render loop advances time in nominal steps rather than reading a
//! wall clock, so animation is reproducible in tests.

use std::time::Duration;

/// Nominal timestep of one rendered frame (60 Hz)
pub const NOMINAL_TIMESTEP: f32 = 0.016;

/// Accumulated frame time
#[derive(Clone, Copy, PartialEq, Default)]
pub struct FrameClock {
    elapsed: f64,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame of `dt` seconds
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt as f64;
        }
        self.frames += 1;
    }

    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed)
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame#{}({:.3}s)", self.frames, self.elapsed)
    }
}
