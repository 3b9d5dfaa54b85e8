//! Collaborator seams for finished sessions.
//!
//! The engine hands each finalized [`SessionResult`] to these injected
//! interfaces fire-and-forget: it neither reads history back nor decides
//! achievement unlocks. Implementations live in `storage::Database` and
//! `achievements::AchievementBook`; tests inject in-memory fakes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::session::SessionResult;

/// Aggregate numbers the achievement evaluator consumes alongside a
/// single session. Supplied by the history store, not the engine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_sessions: u64,
    pub total_time_secs: f64,
    pub current_streak_days: u32,
}

/// Append-only sink for finished sessions.
pub trait HistoryStore {
    /// Record one finalized session.
    fn record(&mut self, result: &SessionResult) -> Result<(), CoreError>;

    /// Aggregate stats across all recorded sessions, including the one
    /// just recorded.
    fn aggregate(&self) -> Result<AggregateStats, CoreError>;
}

/// Consumes a finalized result plus aggregates and mutates persisted
/// unlock state. Policy lives here, never in the engine.
pub trait AchievementEvaluator {
    fn evaluate(&mut self, result: &SessionResult, stats: &AggregateStats)
        -> Result<(), CoreError>;
}
