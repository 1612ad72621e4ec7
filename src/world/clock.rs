//! Frame clock shared by every per-tick component.
//!
//! The clock is a pure accumulator: the driver feeds it either wall time
//! (`tick_wall`) or simulated deltas (`advance`), and everything else reads
//! `elapsed()`/`delta()` from it so tests can step time deterministically.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FrameClock {
    elapsed: Duration,
    delta: Duration,
    last_wall: Option<Instant>,
    ticks: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            last_wall: None,
            ticks: 0,
        }
    }

    /// Advance by a simulated delta.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.ticks += 1;
    }

    /// Advance by the wall time since the previous call. The first call yields a zero delta.
    pub fn tick_wall(&mut self, now: Instant) {
        let delta = match self.last_wall {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_wall = Some(now);
        self.advance(delta);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
