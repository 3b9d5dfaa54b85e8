//! Breathing session state machine.
//!
//! The engine is a caller-driven state machine. It does not use internal
//! threads or timers -- the caller's scheduler invokes `tick()` at a fixed
//! cadence (e.g. every 100 ms) and the engine advances both countdown
//! clocks from the supplied delta.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Finished (terminal)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = BreathingSession::new(technique, 300, 10)?;
//! session.start()?;
//! // In a loop:
//! for event in session.tick(100) { /* render cue */ }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::phase_clock::PhaseClock;
use super::result::SessionResult;
use super::rhythm::rhythm_stability;
use super::session_timer::SessionTimer;
use crate::error::{StateError, ValidationError};
use crate::events::Event;
use crate::history::{AchievementEvaluator, HistoryStore};
use crate::technique::{Phase, Technique};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Finished,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Finished => "finished",
        }
    }
}

/// Collaborators the engine hands the finalized result to. Both calls
/// are fire-and-forget: failures are logged and never propagated.
#[derive(Default)]
pub struct Collaborators {
    pub history: Option<Box<dyn HistoryStore>>,
    pub achievements: Option<Box<dyn AchievementEvaluator>>,
}

/// Core session engine.
///
/// Owns the phase/cycle state, the two countdown clocks, and the
/// phase-transition log the rhythm metric is computed from. All mutation
/// happens through `start`/`toggle_pause`/`tick`/`finish`, which the
/// caller must serialize.
pub struct BreathingSession {
    technique: Technique,
    /// Nonzero phases in cyclic order, fixed at creation.
    phase_cycle: Vec<(Phase, u32)>,
    expected_secs: Vec<u32>,
    state: SessionState,
    phase_index: usize,
    completed_cycles: u32,
    target_cycles: u32,
    session_duration_ms: u64,
    session_timer: SessionTimer,
    phase_clock: PhaseClock,
    /// Unpaused milliseconds since start; the engine's own clock.
    clock_ms: u64,
    /// Sub-second remainder carried between whole-second phase ticks.
    phase_accum_ms: u64,
    /// Entry instant of each nonzero phase, in seconds since start.
    transition_log: Vec<f64>,
    collaborators: Collaborators,
    result: Option<SessionResult>,
}

impl BreathingSession {
    /// Create an idle session for one technique.
    ///
    /// Takes its own snapshot of the technique: later catalog edits do
    /// not affect a session in flight.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for a degenerate technique, a
    /// zero session duration, or a zero cycle target.
    pub fn new(
        technique: Technique,
        session_duration_secs: u64,
        target_cycles: u32,
    ) -> Result<Self, ValidationError> {
        technique.validate()?;
        if session_duration_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "session_duration_secs".into(),
                message: "must be positive".into(),
            });
        }
        if target_cycles == 0 {
            return Err(ValidationError::InvalidValue {
                field: "target_cycles".into(),
                message: "must be positive".into(),
            });
        }
        let phase_cycle = technique.phase_cycle();
        let expected_secs = technique.expected_phase_secs();
        Ok(Self {
            technique,
            phase_cycle,
            expected_secs,
            state: SessionState::Idle,
            phase_index: 0,
            completed_cycles: 0,
            target_cycles,
            session_duration_ms: session_duration_secs * 1_000,
            session_timer: SessionTimer::new(),
            phase_clock: PhaseClock::new(),
            clock_ms: 0,
            phase_accum_ms: 0,
            transition_log: Vec::new(),
            collaborators: Collaborators::default(),
            result: None,
        })
    }

    pub fn with_history(mut self, history: Box<dyn HistoryStore>) -> Self {
        self.collaborators.history = Some(history);
        self
    }

    pub fn with_achievements(mut self, achievements: Box<dyn AchievementEvaluator>) -> Self {
        self.collaborators.achievements = Some(achievements);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn technique(&self) -> &Technique {
        &self.technique
    }

    pub fn current_phase(&self) -> Phase {
        self.phase_cycle[self.phase_index].0
    }

    pub fn phase_remaining_secs(&self) -> u32 {
        self.phase_clock.remaining_secs()
    }

    pub fn session_remaining_ms(&self) -> u64 {
        self.session_timer.remaining_ms()
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    pub fn target_cycles(&self) -> u32 {
        self.target_cycles
    }

    /// The result, if the session has finished.
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            phase: self.current_phase(),
            phase_remaining_secs: self.phase_remaining_secs(),
            session_remaining_ms: self.session_remaining_ms(),
            completed_cycles: self.completed_cycles,
            target_cycles: self.target_cycles,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the session. Valid only from `Idle`.
    ///
    /// Arms both clocks, enters the initial inhale (logging its entry
    /// instant), and returns the start events.
    ///
    /// # Errors
    /// Returns a [`StateError`] if the session has already started.
    pub fn start(&mut self) -> Result<Vec<Event>, StateError> {
        if self.state != SessionState::Idle {
            return Err(StateError::InvalidTransition {
                operation: "start",
                state: self.state.name(),
            });
        }
        self.state = SessionState::Running;
        self.session_timer.arm(self.session_duration_ms);

        let mut events = vec![Event::SessionStarted {
            technique: self.technique.name.clone(),
            session_duration_secs: self.session_duration_ms / 1_000,
            target_cycles: self.target_cycles,
            at: Utc::now(),
        }];
        self.enter_phase(0, &mut events);
        Ok(events)
    }

    /// Pause or resume. Valid only in `Running`/`Paused`.
    ///
    /// While paused both clocks stop advancing (ticks are no-ops) and no
    /// log entries are produced; resuming continues the current phase
    /// with its remaining time intact.
    ///
    /// # Errors
    /// Returns a [`StateError`] from `Idle` or `Finished`.
    pub fn toggle_pause(&mut self) -> Result<Event, StateError> {
        match self.state {
            SessionState::Running => {
                self.state = SessionState::Paused;
                Ok(Event::SessionPaused {
                    phase_remaining_secs: self.phase_remaining_secs(),
                    session_remaining_ms: self.session_remaining_ms(),
                    at: Utc::now(),
                })
            }
            SessionState::Paused => {
                self.state = SessionState::Running;
                Ok(Event::SessionResumed {
                    phase_remaining_secs: self.phase_remaining_secs(),
                    session_remaining_ms: self.session_remaining_ms(),
                    at: Utc::now(),
                })
            }
            other => Err(StateError::InvalidTransition {
                operation: "toggle pause",
                state: other.name(),
            }),
        }
    }

    /// Advance the session by `delta_ms` of wall-clock time.
    ///
    /// No-op unless `Running`. The session timer runs at millisecond
    /// granularity; the phase clock ticks once per accumulated whole
    /// second, so several phase transitions may be processed in order
    /// within a single large delta.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state != SessionState::Running {
            return events;
        }

        self.clock_ms += delta_ms;
        if self.session_timer.tick(delta_ms) {
            // Duration exhaustion forces an immediate finish, mid-phase
            // or not.
            self.finish_internal(&mut events);
            return events;
        }

        self.phase_accum_ms += delta_ms;
        while self.phase_accum_ms >= 1_000 {
            self.phase_accum_ms -= 1_000;
            if self.phase_clock.tick() {
                self.advance_phase(&mut events);
                if self.state == SessionState::Finished {
                    break;
                }
            }
        }
        events
    }

    /// End the session, assemble the result, and hand it off.
    ///
    /// Valid from `Running` or `Paused`. Idempotent: calling again after
    /// `Finished` returns the same result with no further side effects.
    ///
    /// # Errors
    /// Returns a [`StateError`] if the session never started.
    pub fn finish(&mut self) -> Result<SessionResult, StateError> {
        match self.state {
            SessionState::Idle => Err(StateError::InvalidTransition {
                operation: "finish",
                state: self.state.name(),
            }),
            SessionState::Finished => Ok(self
                .result
                .clone()
                .unwrap_or_else(|| self.assemble_result())),
            SessionState::Running | SessionState::Paused => {
                let mut events = Vec::new();
                self.finish_internal(&mut events);
                // finish_internal always stores a result.
                Ok(self.result.clone().unwrap_or_else(|| self.assemble_result()))
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Enter the phase at `index`: log the entry instant, re-arm the
    /// phase clock, emit the cue event.
    fn enter_phase(&mut self, index: usize, events: &mut Vec<Event>) {
        self.phase_index = index;
        let (phase, secs) = self.phase_cycle[index];
        self.transition_log.push(self.clock_ms as f64 / 1_000.0);
        self.phase_clock.arm(secs);
        events.push(Event::PhaseChanged {
            phase,
            duration_secs: secs,
            offset_secs: self.clock_ms as f64 / 1_000.0,
            at: Utc::now(),
        });
    }

    /// Move to the next nonzero phase in cyclic order. Wrapping back to
    /// the cycle head completes a cycle; cycle exhaustion (or an already
    /// expired session timer) finishes instead of re-entering inhale.
    fn advance_phase(&mut self, events: &mut Vec<Event>) {
        let next = (self.phase_index + 1) % self.phase_cycle.len();
        if next == 0 {
            self.completed_cycles += 1;
            events.push(Event::CycleCompleted {
                completed_cycles: self.completed_cycles,
                target_cycles: self.target_cycles,
                at: Utc::now(),
            });
            if self.completed_cycles >= self.target_cycles || self.session_timer.expired() {
                self.finish_internal(events);
                return;
            }
        }
        self.enter_phase(next, events);
    }

    fn assemble_result(&self) -> SessionResult {
        let total_time_secs =
            (self.session_duration_ms - self.session_timer.remaining_ms()) as f64 / 1_000.0;
        let stability = rhythm_stability(&self.transition_log, &self.expected_secs);
        SessionResult::assemble(
            self.technique.clone(),
            total_time_secs,
            self.completed_cycles,
            stability,
        )
    }

    /// Stop both clocks, store the result, and dispatch it to the
    /// collaborators. Collaborator failures are their own concern: they
    /// are logged and never block the finish.
    fn finish_internal(&mut self, events: &mut Vec<Event>) {
        if self.state == SessionState::Finished {
            return;
        }
        self.phase_clock.cancel();
        self.session_timer.cancel();
        self.state = SessionState::Finished;

        let result = self.assemble_result();
        events.push(Event::SessionFinished {
            completed_cycles: result.completed_cycles,
            total_time_secs: result.total_time_secs,
            rhythm_stability: result.rhythm_stability,
            at: Utc::now(),
        });

        let mut stats = None;
        if let Some(history) = self.collaborators.history.as_mut() {
            if let Err(e) = history.record(&result) {
                log::warn!("history store rejected session record: {e}");
            }
            match history.aggregate() {
                Ok(s) => stats = Some(s),
                Err(e) => log::warn!("history store failed to aggregate stats: {e}"),
            }
        }
        if let Some(evaluator) = self.collaborators.achievements.as_mut() {
            let stats = stats.unwrap_or_default();
            if let Err(e) = evaluator.evaluate(&result, &stats) {
                log::warn!("achievement evaluator failed: {e}");
            }
        }

        self.result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::history::AggregateStats;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn coherent_like() -> Technique {
        Technique::new("Coherent", "", 4, 0, 4, 0).unwrap()
    }

    fn box_breathing() -> Technique {
        Technique::new("Box Breathing", "", 4, 4, 4, 4).unwrap()
    }

    /// Advance the engine in 100 ms ticks, collecting events.
    fn advance_secs(session: &mut BreathingSession, secs: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..secs * 10 {
            events.extend(session.tick(100));
        }
        events
    }

    fn phases_entered(events: &[Event]) -> Vec<Phase> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    #[derive(Default)]
    struct RecordingStore {
        records: Rc<RefCell<Vec<SessionResult>>>,
    }

    impl HistoryStore for RecordingStore {
        fn record(&mut self, result: &SessionResult) -> Result<(), CoreError> {
            self.records.borrow_mut().push(result.clone());
            Ok(())
        }
        fn aggregate(&self) -> Result<AggregateStats, CoreError> {
            Ok(AggregateStats {
                total_sessions: self.records.borrow().len() as u64,
                total_time_secs: self.records.borrow().iter().map(|r| r.total_time_secs).sum(),
                current_streak_days: 1,
            })
        }
    }

    struct FailingStore;

    impl HistoryStore for FailingStore {
        fn record(&mut self, _result: &SessionResult) -> Result<(), CoreError> {
            Err(CoreError::Custom("disk on fire".into()))
        }
        fn aggregate(&self) -> Result<AggregateStats, CoreError> {
            Err(CoreError::Custom("disk still on fire".into()))
        }
    }

    #[test]
    fn start_valid_only_from_idle() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        let events = s.start().unwrap();
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.current_phase(), Phase::Inhale);
        assert_eq!(phases_entered(&events), vec![Phase::Inhale]);
        assert!(s.start().is_err());
    }

    #[test]
    fn rejects_zero_duration_and_cycles() {
        assert!(BreathingSession::new(coherent_like(), 0, 10).is_err());
        assert!(BreathingSession::new(coherent_like(), 60, 0).is_err());
    }

    #[test]
    fn rejects_degenerate_technique() {
        let mut t = coherent_like();
        t.inhale_secs = 0;
        assert!(BreathingSession::new(t, 60, 10).is_err());
    }

    #[test]
    fn zero_duration_phases_are_never_entered() {
        // Boxing {4, 0, 4, 4}: hold1 is skipped.
        let t = Technique::new("Boxing", "", 4, 0, 4, 4).unwrap();
        let mut s = BreathingSession::new(t, 120, 2).unwrap();
        s.start().unwrap();
        let events = advance_secs(&mut s, 24);
        let phases = phases_entered(&events);
        assert!(!phases.contains(&Phase::Hold1));
        // Visited order equals the declared nonzero cycle.
        assert_eq!(
            phases[..5],
            [
                Phase::Exhale,
                Phase::Hold2,
                Phase::Inhale,
                Phase::Exhale,
                Phase::Hold2,
            ]
        );
    }

    #[test]
    fn hold_collapse_gives_inhale_exhale_cycle() {
        let mut s = BreathingSession::new(coherent_like(), 120, 3).unwrap();
        let mut events = s.start().unwrap();
        events.extend(advance_secs(&mut s, 16));
        assert_eq!(
            phases_entered(&events),
            vec![
                Phase::Inhale,
                Phase::Exhale,
                Phase::Inhale,
                Phase::Exhale,
                Phase::Inhale,
            ]
        );
        assert_eq!(s.completed_cycles(), 2);
    }

    #[test]
    fn cycle_counts_once_per_full_traversal() {
        let mut s = BreathingSession::new(box_breathing(), 300, 10).unwrap();
        s.start().unwrap();
        // One full 16s cycle plus a bit.
        advance_secs(&mut s, 17);
        assert_eq!(s.completed_cycles(), 1);
        advance_secs(&mut s, 16);
        assert_eq!(s.completed_cycles(), 2);
    }

    #[test]
    fn cycle_exhaustion_finishes_early() {
        // {4,0,4,0}, 12s budget, 1 target cycle: finishes at 8s, not 12s.
        let mut s = BreathingSession::new(coherent_like(), 12, 1).unwrap();
        s.start().unwrap();
        let events = advance_secs(&mut s, 9);
        assert_eq!(s.state(), SessionState::Finished);
        let result = s.result().unwrap();
        assert_eq!(result.completed_cycles, 1);
        assert!((result.total_time_secs - 8.0).abs() < 0.2);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionFinished { .. })));
    }

    #[test]
    fn duration_expiry_finishes_mid_phase() {
        // 5s budget with a {4,4} cycle: expires during the exhale.
        let mut s = BreathingSession::new(coherent_like(), 5, 10).unwrap();
        s.start().unwrap();
        let events = advance_secs(&mut s, 6);
        assert_eq!(s.state(), SessionState::Finished);
        let result = s.result().unwrap();
        // No full cycle completed at that instant.
        assert_eq!(result.completed_cycles, 0);
        assert!((result.total_time_secs - 5.0).abs() < 0.2);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionFinished { .. })));
    }

    #[test]
    fn pause_freezes_both_clocks_and_the_log() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        s.start().unwrap();
        advance_secs(&mut s, 2);
        let phase_before = s.phase_remaining_secs();
        let session_before = s.session_remaining_ms();
        let log_before = s.transition_log.len();

        s.toggle_pause().unwrap();
        assert_eq!(s.state(), SessionState::Paused);
        let events = advance_secs(&mut s, 30);
        assert!(events.is_empty());
        assert_eq!(s.phase_remaining_secs(), phase_before);
        assert_eq!(s.session_remaining_ms(), session_before);
        assert_eq!(s.transition_log.len(), log_before);

        s.toggle_pause().unwrap();
        assert_eq!(s.state(), SessionState::Running);
        // Phase continues with remaining time intact, not reset.
        advance_secs(&mut s, 2);
        assert_eq!(s.current_phase(), Phase::Exhale);
    }

    #[test]
    fn toggle_pause_invalid_when_idle_or_finished() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        assert!(s.toggle_pause().is_err());
        s.start().unwrap();
        s.finish().unwrap();
        assert!(s.toggle_pause().is_err());
    }

    #[test]
    fn finish_is_idempotent_and_records_once() {
        let store = RecordingStore::default();
        let records = Rc::clone(&store.records);
        let mut s = BreathingSession::new(coherent_like(), 60, 10)
            .unwrap()
            .with_history(Box::new(store));
        s.start().unwrap();
        advance_secs(&mut s, 9);

        let first = s.finish().unwrap();
        let second = s.finish().unwrap();
        assert_eq!(first.completed_cycles, second.completed_cycles);
        assert_eq!(first.total_time_secs, second.total_time_secs);
        assert_eq!(first.session_date, second.session_date);
        assert_eq!(records.borrow().len(), 1);
    }

    #[test]
    fn finish_from_idle_is_an_error() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        assert!(s.finish().is_err());
    }

    #[test]
    fn finish_valid_while_paused() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        s.start().unwrap();
        advance_secs(&mut s, 3);
        s.toggle_pause().unwrap();
        let result = s.finish().unwrap();
        assert_eq!(s.state(), SessionState::Finished);
        assert!((result.total_time_secs - 3.0).abs() < 0.2);
    }

    #[test]
    fn collaborator_failure_never_blocks_finish() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10)
            .unwrap()
            .with_history(Box::new(FailingStore));
        s.start().unwrap();
        advance_secs(&mut s, 9);
        let result = s.finish().unwrap();
        assert_eq!(result.completed_cycles, 1);
    }

    #[test]
    fn zero_jitter_run_scores_perfect_stability() {
        let mut s = BreathingSession::new(coherent_like(), 120, 3).unwrap();
        s.start().unwrap();
        advance_secs(&mut s, 25);
        assert_eq!(s.state(), SessionState::Finished);
        let result = s.result().unwrap();
        assert_eq!(result.rhythm_stability, 100.0);
        assert_eq!(result.calmness_level, 100.0);
    }

    #[test]
    fn session_ended_before_any_transition_scores_zero() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        s.start().unwrap();
        advance_secs(&mut s, 1);
        let result = s.finish().unwrap();
        assert_eq!(result.rhythm_stability, 0.0);
    }

    #[test]
    fn ticks_are_noops_when_idle_or_finished() {
        let mut s = BreathingSession::new(coherent_like(), 60, 10).unwrap();
        assert!(s.tick(1_000).is_empty());
        s.start().unwrap();
        s.finish().unwrap();
        assert!(s.tick(1_000).is_empty());
        assert_eq!(s.state(), SessionState::Finished);
    }

    #[test]
    fn one_large_delta_processes_multiple_transitions_in_order() {
        let mut s = BreathingSession::new(coherent_like(), 120, 10).unwrap();
        s.start().unwrap();
        // 9 seconds in one tick: inhale expires at 4s, exhale at 8s.
        let events = s.tick(9_000);
        assert_eq!(
            phases_entered(&events),
            vec![Phase::Exhale, Phase::Inhale]
        );
        assert_eq!(s.completed_cycles(), 1);
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let mut s = BreathingSession::new(box_breathing(), 300, 10).unwrap();
        s.start().unwrap();
        match s.snapshot() {
            Event::StateSnapshot {
                state,
                phase,
                completed_cycles,
                target_cycles,
                ..
            } => {
                assert_eq!(state, SessionState::Running);
                assert_eq!(phase, Phase::Inhale);
                assert_eq!(completed_cycles, 0);
                assert_eq!(target_cycles, 10);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
