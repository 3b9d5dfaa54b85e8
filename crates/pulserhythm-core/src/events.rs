use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionState;
use crate::technique::Phase;

/// Every state change in the session engine produces an Event.
/// The caller renders cues from these; nothing else is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        technique: String,
        session_duration_secs: u64,
        target_cycles: u32,
        at: DateTime<Utc>,
    },
    /// A new phase was entered. This is the "fire a cue" hook.
    PhaseChanged {
        phase: Phase,
        duration_secs: u32,
        /// Seconds since session start, excluding paused time.
        offset_secs: f64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase_remaining_secs: u32,
        session_remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        phase_remaining_secs: u32,
        session_remaining_ms: u64,
        at: DateTime<Utc>,
    },
    CycleCompleted {
        completed_cycles: u32,
        target_cycles: u32,
        at: DateTime<Utc>,
    },
    SessionFinished {
        completed_cycles: u32,
        total_time_secs: f64,
        rhythm_stability: f64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        phase: Phase,
        phase_remaining_secs: u32,
        session_remaining_ms: u64,
        completed_cycles: u32,
        target_cycles: u32,
        at: DateTime<Utc>,
    },
}
