//! Whole-session countdown timer.
//!
//! Runs at millisecond granularity, independent of phase boundaries.
//! Stays consistent even when several phase changes land between two
//! ticks -- the two clocks share no state.

/// Sub-second countdown for the overall session duration.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    remaining_ms: u64,
    armed: bool,
    expired: bool,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the remaining time and start counting down.
    pub fn arm(&mut self, duration_ms: u64) {
        self.remaining_ms = duration_ms;
        self.armed = true;
        self.expired = false;
    }

    /// Advance by `delta_ms`. Returns `true` exactly once, on the tick
    /// that crosses zero. Underflow is clamped at zero.
    pub fn tick(&mut self, delta_ms: u64) -> bool {
        if !self.armed {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(delta_ms);
        if self.remaining_ms == 0 {
            self.armed = false;
            self.expired = true;
            return true;
        }
        false
    }

    /// Stop counting down with no expiry signal.
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Whether the countdown has already reached zero.
    pub fn expired(&self) -> bool {
        self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_by_delta() {
        let mut timer = SessionTimer::new();
        timer.arm(1_000);
        assert!(!timer.tick(300));
        assert_eq!(timer.remaining_ms(), 700);
        assert!(!timer.tick(300));
        assert!(timer.tick(500)); // clamped, crosses zero
        assert_eq!(timer.remaining_ms(), 0);
    }

    #[test]
    fn expires_exactly_once() {
        let mut timer = SessionTimer::new();
        timer.arm(100);
        assert!(timer.tick(150));
        assert!(!timer.tick(150));
        assert!(timer.expired());
    }

    #[test]
    fn cancel_suppresses_expiry() {
        let mut timer = SessionTimer::new();
        timer.arm(100);
        timer.cancel();
        assert!(!timer.tick(1_000));
        assert!(!timer.expired());
    }

    #[test]
    fn large_delta_clamps_at_zero() {
        let mut timer = SessionTimer::new();
        timer.arm(250);
        assert!(timer.tick(u64::MAX));
        assert_eq!(timer.remaining_ms(), 0);
    }
}
