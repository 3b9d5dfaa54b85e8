mod engine;
mod phase_clock;
mod result;
pub mod rhythm;
mod session_timer;

pub use engine::{BreathingSession, Collaborators, SessionState};
pub use phase_clock::PhaseClock;
pub use result::SessionResult;
pub use rhythm::{calmness_level, rhythm_stability, GAP_TOLERANCE_SECS};
pub use session_timer::SessionTimer;
