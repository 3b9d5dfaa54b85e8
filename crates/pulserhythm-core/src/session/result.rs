//! Final session summary assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rhythm::calmness_level;
use crate::technique::Technique;

/// Immutable summary of one finished session. The sole externally
/// visible payload of the engine; serializes losslessly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub technique: Technique,
    /// Unpaused time actually spent, in seconds.
    pub total_time_secs: f64,
    pub completed_cycles: u32,
    /// Percentage 0-100.
    pub rhythm_stability: f64,
    /// Percentage 0-100. Currently always equal to `rhythm_stability`.
    pub calmness_level: f64,
    /// Session-local achievement tags, in computation order.
    pub achievements: Vec<String>,
    pub session_date: DateTime<Utc>,
}

impl SessionResult {
    /// Package final counters and the stability metric into a result.
    pub fn assemble(
        technique: Technique,
        total_time_secs: f64,
        completed_cycles: u32,
        rhythm_stability: f64,
    ) -> Self {
        let achievements = session_achievements(completed_cycles, rhythm_stability);
        Self {
            technique,
            total_time_secs,
            completed_cycles,
            rhythm_stability,
            calmness_level: calmness_level(rhythm_stability),
            achievements,
            session_date: Utc::now(),
        }
    }
}

/// Session-local achievement tags computed from simple thresholds.
/// Independent of the persisted achievement book's global unlock state.
fn session_achievements(completed_cycles: u32, stability: f64) -> Vec<String> {
    let mut tags = Vec::new();
    if completed_cycles >= 1 {
        tags.push("First Session".to_string());
    }
    if completed_cycles >= 10 {
        tags.push("10 Cycles in a Row".to_string());
    }
    if stability >= 90.0 {
        tags.push("Perfect Rhythm".to_string());
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coherent() -> Technique {
        Technique::new("Coherent", "For balance", 6, 0, 6, 0).unwrap()
    }

    #[test]
    fn no_cycles_earns_no_tags() {
        let r = SessionResult::assemble(coherent(), 3.0, 0, 0.0);
        assert!(r.achievements.is_empty());
    }

    #[test]
    fn one_cycle_earns_first_session() {
        let r = SessionResult::assemble(coherent(), 12.0, 1, 50.0);
        assert_eq!(r.achievements, vec!["First Session"]);
    }

    #[test]
    fn tags_follow_computation_order() {
        let r = SessionResult::assemble(coherent(), 120.0, 10, 95.0);
        assert_eq!(
            r.achievements,
            vec!["First Session", "10 Cycles in a Row", "Perfect Rhythm"]
        );
    }

    #[test]
    fn calmness_mirrors_stability() {
        let r = SessionResult::assemble(coherent(), 60.0, 5, 80.0);
        assert_eq!(r.calmness_level, r.rhythm_stability);
    }

    #[test]
    fn serializes_losslessly() {
        let r = SessionResult::assemble(coherent(), 60.0, 5, 80.0);
        let json = serde_json::to_string(&r).unwrap();
        let back: SessionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.completed_cycles, 5);
        assert_eq!(back.rhythm_stability, 80.0);
        assert_eq!(back.session_date, r.session_date);
    }
}
