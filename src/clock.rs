//! Simulated time.
//!
//! The scene does not read the wall clock. Each frame advances a
//! [`SimClock`] by a fixed step, so playback speed is the same on a 30 Hz
//! and a 144 Hz display and tests can replay exact frame counts.
//!
//! # Example
//!
//! ```ignore
//! let mut clock = SimClock::new();
//! clock.tick();
//! assert_eq!(clock.frame(), 1);
//! ```

/// Nominal simulated seconds per frame.
pub const FRAME_DELTA: f32 = 0.016;

/// Fixed-step simulation clock.
///
/// Elapsed time is recomputed from the frame count on every tick rather
/// than summed, so it stays within `f32` rounding of `frame * delta` no
/// matter how long the scene runs.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Total simulated seconds.
    elapsed: f64,
    /// Step added per tick.
    delta: f32,
    /// Ticks that advanced time.
    frame_count: u64,
    /// Whether ticks are ignored.
    paused: bool,
}

impl SimClock {
    /// Clock at zero stepping by [`FRAME_DELTA`].
    pub fn new() -> Self {
        Self::with_delta(FRAME_DELTA)
    }

    /// Clock at zero with a custom step. Negative steps clamp to zero.
    pub fn with_delta(delta: f32) -> Self {
        Self {
            elapsed: 0.0,
            delta: delta.max(0.0),
            frame_count: 0,
            paused: false,
        }
    }

    /// Advance one frame. Returns the new elapsed time.
    ///
    /// While paused this returns the current time unchanged.
    pub fn tick(&mut self) -> f32 {
        if !self.paused {
            self.frame_count += 1;
            self.elapsed = self.frame_count as f64 * self.delta as f64;
        }
        self.elapsed()
    }

    /// Total simulated seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    /// Total simulated seconds at full precision.
    #[inline]
    pub fn elapsed_f64(&self) -> f64 {
        self.elapsed
    }

    /// Seconds added per tick.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Frames advanced so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Back to zero, unpaused. The step is kept.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.frame_count = 0;
        self.paused = false;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}
