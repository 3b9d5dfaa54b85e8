//! Rhythm stability metric.
//!
//! Compares the observed gaps between phase-entry timestamps against the
//! technique's expected phase durations. A gap is "correct" when it lands
//! within half a second of expected, which treats timer-tick jitter as
//! acceptable. Indexing into the expected sequence is modular, so the
//! comparison stays aligned with the technique's cyclic pattern; the log
//! only contains entries for nonzero phases, keeping both sequences in
//! lockstep even when hold phases are skipped.

/// Tolerance for a phase gap to count as on-rhythm, in seconds.
pub const GAP_TOLERANCE_SECS: f64 = 0.5;

/// Percentage (0-100) of observed phase gaps within tolerance of the
/// expected durations. Fewer than two log entries yields 0.0 -- a session
/// ended before any full phase is a valid, low-quality result.
pub fn rhythm_stability(transition_log: &[f64], expected_secs: &[u32]) -> f64 {
    if transition_log.len() < 2 || expected_secs.is_empty() {
        return 0.0;
    }

    let mut correct = 0usize;
    let mut total = 0usize;
    for i in 1..transition_log.len() {
        let observed = transition_log[i] - transition_log[i - 1];
        let expected = f64::from(expected_secs[(i - 1) % expected_secs.len()]);
        if (observed - expected).abs() <= GAP_TOLERANCE_SECS {
            correct += 1;
        }
        total += 1;
    }

    correct as f64 / total as f64 * 100.0
}

/// Calmness is currently defined as equal to stability. Placeholder
/// metric: no independent signal is computed.
pub fn calmness_level(stability: f64) -> f64 {
    stability
}
