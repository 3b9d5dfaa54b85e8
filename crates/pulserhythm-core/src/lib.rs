//! # PulseRhythm Core Library
//!
//! Core business logic for PulseRhythm, a guided-breathing session timer.
//! All operations are available via the standalone CLI binary; any GUI
//! would be a thin layer over this same library.
//!
//! ## Architecture
//!
//! - **Session Engine**: A caller-driven state machine that advances
//!   through breathing phases and cycles; the caller periodically invokes
//!   `tick()` for forward progress
//! - **Rhythm Metric**: Stability/calmness scoring from the observed
//!   phase-transition timestamps versus the technique's expected durations
//! - **Catalog**: Built-in and user-defined breathing techniques
//! - **Storage**: SQLite-based session history and TOML-based configuration
//! - **Achievements**: Progress tracking and unlocks fed by finished sessions
//!
//! ## Key Components
//!
//! - [`BreathingSession`]: Core session state machine
//! - [`Technique`]: Immutable phase-duration record
//! - [`Database`]: Session history persistence and aggregate statistics
//! - [`AchievementBook`]: Persisted achievement progress and unlock state
//! - [`Config`]: Application configuration management

pub mod achievements;
pub mod catalog;
pub mod error;
pub mod events;
pub mod history;
pub mod session;
pub mod storage;
pub mod technique;

pub use achievements::{Achievement, AchievementBook, AchievementCategory};
pub use catalog::TechniqueCatalog;
pub use error::{ConfigError, CoreError, DatabaseError, StateError, ValidationError};
pub use events::Event;
pub use history::{AchievementEvaluator, AggregateStats, HistoryStore};
pub use session::{BreathingSession, SessionResult, SessionState};
pub use storage::{Config, Database};
pub use technique::{Phase, Technique};
