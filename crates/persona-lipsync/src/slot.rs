//! Last-write-wins audio sample slot

/// Holds the most recent magnitude frame.
///
/// Writers overwrite; the render tick reads whatever is there. Frames
/// written between two ticks are dropped except the last.
#[derive(Debug, Clone, Default)]
pub struct AudioSampleSlot {
    latest: Option<Vec<f32>>,
    writes: u64,
}

impl AudioSampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame
    pub fn store(&mut self, frame: Vec<f32>) {
        self.latest = Some(frame);
        self.writes += 1;
    }

    /// Store a frame of `bins` zeros so the mouth settles closed
    pub fn store_silence(&mut self, bins: usize) {
        self.store(vec![0.0; bins.max(1)]);
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn latest(&self) -> Option<&[f32]> {
        self.latest.as_deref()
    }

    pub fn take(&mut self) -> Option<Vec<f32>> {
        self.latest.take()
    }

    /// Total frames stored since creation
    pub fn writes(&self) -> u64 {
        self.writes
    }
}
