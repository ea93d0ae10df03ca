//! Frame-driven countdown timer for multi-frame behavior in scripts and managers.

use serde::{Deserialize, Serialize};

/// Duration-based timer advanced by the frame delta.
///
/// Scripts keep timers in their persistent context to express "wait N seconds"
/// without suspending: call [`Timer::tick`] every frame and act when it returns `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    duration: f32,
    looping: bool,
    elapsed: f32,
    running: bool,
    finished: bool,
}

impl Timer {
    /// Create a running timer.
    pub fn new(duration: f32, looping: bool) -> Self {
        Self {
            duration: duration.max(0.0),
            looping,
            elapsed: 0.0,
            running: true,
            finished: false,
        }
    }

    /// Restart from zero and run.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.running = true;
        self.finished = false;
    }

    /// Stop advancing, keeping elapsed time.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Continue after [`Timer::pause`]. A finished one-shot timer stays finished.
    pub fn resume(&mut self) {
        if !self.finished {
            self.running = true;
        }
    }

    /// Reset to zero elapsed time, stopped.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.running = false;
        self.finished = false;
    }

    /// Advance by `dt` seconds. Returns `true` on the frame the duration is reached.
    ///
    /// Looping timers carry the overshoot into the next period; one-shot timers stop.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed < self.duration {
            return false;
        }
        if self.looping {
            if self.duration > 0.0 {
                self.elapsed %= self.duration;
            } else {
                self.elapsed = 0.0;
            }
        } else {
            self.elapsed = self.duration;
            self.running = false;
            self.finished = true;
        }
        true
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Elapsed time as a fraction of the duration, in [0, 1].
    pub fn ratio(&self) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.elapsed / self.duration).min(1.0)
    }
}
