//! Frame timing
//!
//! The host advances [`Time`] once per frame; update-interval throttling
//! reads the frame counter.

use std::time::Duration;

/// Frame counter and clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time {
    frame_count: u64,
    delta: f32,
    elapsed: f64,
    /// Longest delta accepted, so a stall does not produce a huge step
    max_delta: f32,
}

impl Time {
    const DEFAULT_MAX_DELTA: f32 = 0.25;

    #[must_use]
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            delta: 0.0,
            elapsed: 0.0,
            max_delta: Self::DEFAULT_MAX_DELTA,
        }
    }

    #[must_use]
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.max_delta = max_delta.max(0.0);
        self
    }

    /// Start a new frame that lasted `delta` seconds
    pub fn advance(&mut self, delta: f32) {
        self.frame_count += 1;
        self.delta = delta.clamp(0.0, self.max_delta);
        self.elapsed += f64::from(self.delta);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        self.advance(delta.as_secs_f32());
    }

    /// Frames advanced so far
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Seconds covered by the current frame
    #[must_use]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Seconds since the clock started
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
