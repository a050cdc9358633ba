//! Pacing clock: wall-time bookkeeping for the HUD.
//!
//! The pacing clock never gates simulated time. It only records how much
//! real time passed between ticks so the HUD can show frame rate.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PacingClock {
    started:    Instant,
    last:       Instant,
    last_delta: Duration,
    frames:     u64,
}

impl PacingClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started:    now,
            last:       now,
            last_delta: Duration::ZERO,
            frames:     0,
        }
    }

    /// Record one frame. Returns the wall time since the previous call.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        self.last_delta = now.duration_since(self.last);
        self.last = now;
        self.frames += 1;
        self.last_delta
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_delta(&self) -> Duration {
        self.last_delta
    }

    pub fn elapsed(&self) -> Duration {
        self.last.duration_since(self.started)
    }

    /// Average frames per wall second since start. Zero before the first tick.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if self.frames == 0 || secs <= 0.0 {
            return 0.0;
        }
        self.frames as f64 / secs
    }
}
