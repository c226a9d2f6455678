//! Synthetic speech magnitudes
//!
//! Stands in for a live capture analysis while speech is being synthesized
//! and no real signal exists. Emits a frame of bounded random levels once
//! per interval.

use std::time::Duration;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Shape of the generated frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    /// Values per frame
    pub bins: usize,
    /// Time between frames
    pub interval_ms: u64,
    /// Lowest generated level
    pub low: f32,
    /// Width of the level range above `low`
    pub span: f32,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            bins: 32,
            interval_ms: 100,
            low: 64.0,
            span: 128.0,
        }
    }
}

impl SyntheticParams {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Interval-driven generator of random magnitude frames
#[derive(Debug, Clone)]
pub struct SyntheticSpeech {
    params: SyntheticParams,
    rng: StdRng,
    low: f32,
    /// `None` when the span is empty and every level equals `low`
    levels: Option<Uniform<f32>>,
    elapsed: f32,
    active: bool,
}

impl SyntheticSpeech {
    /// Deterministic generator
    pub fn new(params: SyntheticParams, seed: u64) -> Self {
        let low = if params.low.is_finite() { params.low } else { 0.0 };
        let levels = (params.span.is_finite() && low + params.span > low)
            .then(|| Uniform::new(low, low + params.span));
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
            low,
            levels,
            elapsed: 0.0,
            active: false,
        }
    }

    pub fn from_entropy(params: SyntheticParams) -> Self {
        Self::new(params, rand::random())
    }

    pub fn params(&self) -> &SyntheticParams {
        &self.params
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        self.active = true;
        self.elapsed = 0.0;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.elapsed = 0.0;
    }

    /// One frame of levels in `[low, low + span)`
    pub fn frame(&mut self) -> Vec<f32> {
        let bins = self.params.bins.max(1);
        match self.levels {
            Some(levels) => (0..bins).map(|_| levels.sample(&mut self.rng)).collect(),
            None => vec![self.low; bins],
        }
    }

    /// Advance by `dt` seconds; returns a frame whenever an interval has
    /// elapsed. Several missed intervals still yield a single frame.
    pub fn poll(&mut self, dt: f32) -> Option<Vec<f32>> {
        if !self.active || !dt.is_finite() || dt <= 0.0 {
            return None;
        }
        let interval = self.params.interval().as_secs_f32();
        self.elapsed += dt;
        if self.elapsed < interval {
            return None;
        }
        self.elapsed = if interval > 0.0 {
            self.elapsed % interval
        } else {
            0.0
        };
        Some(self.frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bounds() {
        let mut gen = SyntheticSpeech::new(SyntheticParams::default(), 7);
        for _ in 0..20 {
            let frame = gen.frame();
            assert_eq!(frame.len(), 32);
            assert!(frame.iter().all(|v| (64.0..192.0).contains(v)));
        }
    }

    #[test]
    fn test_poll_interval() {
        let mut gen = SyntheticSpeech::new(SyntheticParams::default(), 1);
        assert!(gen.poll(0.2).is_none(), "inactive generator emits nothing");

        gen.start();
        assert!(gen.poll(0.05).is_none());
        assert!(gen.poll(0.06).is_some());
        assert!(gen.poll(0.05).is_none());
        // A long stall produces one frame, not a burst
        assert!(gen.poll(1.0).is_some());
        assert!(gen.poll(0.0).is_none());

        gen.stop();
        assert!(gen.poll(0.5).is_none());
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = SyntheticSpeech::new(SyntheticParams::default(), 42);
        let mut b = SyntheticSpeech::new(SyntheticParams::default(), 42);
        assert_eq!(a.frame(), b.frame());
    }

    #[test]
    fn test_degenerate_span() {
        let params = SyntheticParams {
            span: 0.0,
            ..Default::default()
        };
        let mut gen = SyntheticSpeech::new(params, 3);
        assert_eq!(gen.frame(), vec![64.0; 32]);
    }
}
