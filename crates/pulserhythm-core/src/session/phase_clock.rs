//! Per-phase countdown clock.
//!
//! Counts whole seconds for the current breathing phase. The clock only
//! decrements its own counter and reports expiry; phase transition logic
//! lives in the session engine.

/// One-second-granularity countdown for a single phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseClock {
    remaining_secs: u32,
    armed: bool,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the remaining time and start ticking.
    pub fn arm(&mut self, duration_secs: u32) {
        self.remaining_secs = duration_secs;
        self.armed = true;
    }

    /// Decrement by one second. Returns `true` exactly once, on the tick
    /// that reaches zero; after that the clock is inert until re-armed.
    pub fn tick(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.armed = false;
            return true;
        }
        false
    }

    /// Stop ticking with no expiry signal.
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
