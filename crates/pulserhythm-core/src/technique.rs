//! Breathing techniques and phase definitions.
//!
//! A technique is an immutable record of the four phase durations of one
//! breathing cycle. Hold phases may be zero, which removes them from the
//! cycle entirely; inhale and exhale must be positive.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// One named segment of a breathing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inhale,
    Hold1,
    Exhale,
    Hold2,
}

impl Phase {
    /// User-facing label for phase cues.
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Inhale => "Inhale",
            Phase::Hold1 => "Hold",
            Phase::Exhale => "Exhale",
            Phase::Hold2 => "Pause",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Immutable phase-duration record. Identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technique {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Durations in seconds.
    pub inhale_secs: u32,
    pub hold1_secs: u32,
    pub exhale_secs: u32,
    pub hold2_secs: u32,
}

impl Technique {
    /// Create a validated technique with a fresh id.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if inhale or exhale is zero -- a
    /// degenerate cycle with no air moving is never started.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        inhale_secs: u32,
        hold1_secs: u32,
        exhale_secs: u32,
        hold2_secs: u32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if inhale_secs == 0 || exhale_secs == 0 {
            return Err(ValidationError::InvalidTechnique {
                name,
                message: "inhale and exhale durations must be positive".into(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description: description.into(),
            inhale_secs,
            hold1_secs,
            exhale_secs,
            hold2_secs,
        })
    }

    /// Re-check the invariant, e.g. after deserializing from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.inhale_secs == 0 || self.exhale_secs == 0 {
            return Err(ValidationError::InvalidTechnique {
                name: self.name.clone(),
                message: "inhale and exhale durations must be positive".into(),
            });
        }
        Ok(())
    }

    /// The cyclic list of nonzero phases in order. Zero-duration phases
    /// never appear, so "skip this phase" is just "next list element".
    pub fn phase_cycle(&self) -> Vec<(Phase, u32)> {
        let all = [
            (Phase::Inhale, self.inhale_secs),
            (Phase::Hold1, self.hold1_secs),
            (Phase::Exhale, self.exhale_secs),
            (Phase::Hold2, self.hold2_secs),
        ];
        all.into_iter().filter(|(_, secs)| *secs > 0).collect()
    }

    /// The nonzero per-phase durations in cyclic order, as paired with
    /// the transition log by the rhythm metric.
    pub fn expected_phase_secs(&self) -> Vec<u32> {
        self.phase_cycle().into_iter().map(|(_, secs)| secs).collect()
    }

    pub fn total_cycle_secs(&self) -> u32 {
        self.inhale_secs + self.hold1_secs + self.exhale_secs + self.hold2_secs
    }

    /// The built-in technique set.
    pub fn builtins() -> Vec<Technique> {
        vec![
            Technique {
                id: Uuid::new_v4(),
                name: "4-7-8".into(),
                description: "For falling asleep".into(),
                inhale_secs: 4,
                hold1_secs: 7,
                exhale_secs: 8,
                hold2_secs: 0,
            },
            Technique {
                id: Uuid::new_v4(),
                name: "Box Breathing".into(),
                description: "For concentration".into(),
                inhale_secs: 4,
                hold1_secs: 4,
                exhale_secs: 4,
                hold2_secs: 4,
            },
            Technique {
                id: Uuid::new_v4(),
                name: "Boxing".into(),
                description: "For energy".into(),
                inhale_secs: 4,
                hold1_secs: 0,
                exhale_secs: 4,
                hold2_secs: 4,
            },
            Technique {
                id: Uuid::new_v4(),
                name: "Coherent".into(),
                description: "For balance".into(),
                inhale_secs: 6,
                hold1_secs: 0,
                exhale_secs: 6,
                hold2_secs: 0,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_inhale() {
        let err = Technique::new("bad", "", 0, 4, 4, 0);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_zero_exhale() {
        let err = Technique::new("bad", "", 4, 4, 0, 0);
        assert!(err.is_err());
    }

    #[test]
    fn hold_phases_may_be_zero() {
        let t = Technique::new("Coherent", "", 6, 0, 6, 0).unwrap();
        assert_eq!(t.total_cycle_secs(), 12);
    }

    #[test]
    fn phase_cycle_skips_zero_durations() {
        let t = Technique::new("Boxing", "", 4, 0, 4, 4).unwrap();
        assert_eq!(
            t.phase_cycle(),
            vec![(Phase::Inhale, 4), (Phase::Exhale, 4), (Phase::Hold2, 4)]
        );
        assert_eq!(t.expected_phase_secs(), vec![4, 4, 4]);
    }

    #[test]
    fn full_cycle_keeps_all_phases() {
        let t = Technique::new("Box Breathing", "", 4, 4, 4, 4).unwrap();
        assert_eq!(t.phase_cycle().len(), 4);
    }

    #[test]
    fn builtins_are_valid() {
        for t in Technique::builtins() {
            assert!(t.validate().is_ok(), "builtin {} invalid", t.name);
        }
    }

    #[test]
    fn serde_roundtrip() {
        let t = Technique::new("4-7-8", "For falling asleep", 4, 7, 8, 0).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Technique = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, t.id);
        assert_eq!(back.expected_phase_secs(), vec![4, 7, 8]);
    }
}
