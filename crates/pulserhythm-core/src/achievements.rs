//! Achievement catalog and unlock tracking.
//!
//! The achievement book consumes finalized session results plus aggregate
//! history stats and mutates persisted unlock state. The session engine
//! only supplies the raw numbers; all unlock policy lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::history::{AchievementEvaluator, AggregateStats};
use crate::session::SessionResult;
use crate::storage::Database;

/// Key under which the book is persisted in the kv store.
const BOOK_KEY: &str = "achievement_book";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Sessions,
    Time,
    Cycles,
    Streak,
    Stability,
}

/// One achievement with its persisted progress and unlock state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    pub target_value: u64,
    pub current_progress: u64,
    pub is_unlocked: bool,
    pub unlocked_date: Option<DateTime<Utc>>,
}

impl Achievement {
    fn new(
        id: &str,
        title: &str,
        description: &str,
        icon: &str,
        category: AchievementCategory,
        target_value: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
            category,
            target_value,
            current_progress: 0,
            is_unlocked: false,
            unlocked_date: None,
        }
    }

    /// 0-100, clamped.
    pub fn progress_percentage(&self) -> f64 {
        if self.target_value == 0 {
            return 0.0;
        }
        (self.current_progress as f64 / self.target_value as f64 * 100.0).min(100.0)
    }
}

/// The full achievement catalog with default (locked) state.
pub fn catalog() -> Vec<Achievement> {
    use AchievementCategory::*;
    vec![
        Achievement::new("first_session", "First Steps", "Complete your first breathing session", "star.fill", Sessions, 1),
        Achievement::new("10_sessions", "Dedicated", "Complete 10 sessions", "flame.fill", Sessions, 10),
        Achievement::new("50_sessions", "Committed", "Complete 50 sessions", "trophy.fill", Sessions, 50),
        Achievement::new("100_sessions", "Master", "Complete 100 sessions", "crown.fill", Sessions, 100),
        Achievement::new("1_hour", "Hour of Peace", "Meditate for 1 hour total", "clock.fill", Time, 3_600),
        Achievement::new("10_hours", "Zen Master", "Meditate for 10 hours total", "moon.stars.fill", Time, 36_000),
        Achievement::new("perfect_10", "Perfect 10", "Complete 10 cycles in one session", "10.circle.fill", Cycles, 10),
        Achievement::new("perfect_50", "Endurance", "Complete 50 cycles in one session", "infinity", Cycles, 50),
        Achievement::new("3_day_streak", "Three Day Streak", "Meditate for 3 days in a row", "calendar", Streak, 3),
        Achievement::new("7_day_streak", "Week Warrior", "Meditate for 7 days in a row", "calendar.badge.clock", Streak, 7),
        Achievement::new("30_day_streak", "Monthly Master", "Meditate for 30 days in a row", "calendar.badge.exclamationmark", Streak, 30),
        Achievement::new("perfect_rhythm", "Perfect Rhythm", "Achieve 90% rhythm stability", "waveform.path", Stability, 90),
        Achievement::new("zen_master", "Zen Master", "Achieve 95% rhythm stability", "leaf.fill", Stability, 95),
    ]
}

/// Persisted achievement progress and unlock state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementBook {
    achievements: Vec<Achievement>,
}

impl Default for AchievementBook {
    fn default() -> Self {
        Self {
            achievements: catalog(),
        }
    }
}

impl AchievementBook {
    /// Load from the kv store, falling back to the default catalog.
    pub fn load(db: &Database) -> Result<Self, CoreError> {
        match db.kv_get(BOOK_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Self::default()),
        }
    }

    /// Persist to the kv store.
    pub fn save(&self, db: &Database) -> Result<(), CoreError> {
        let json = serde_json::to_string(self)?;
        db.kv_set(BOOK_KEY, &json)
    }

    pub fn all(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn unlocked(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| a.is_unlocked).collect()
    }

    pub fn locked(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| !a.is_unlocked).collect()
    }

    pub fn by_category(&self, category: AchievementCategory) -> Vec<&Achievement> {
        self.achievements
            .iter()
            .filter(|a| a.category == category)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    /// Fold one finished session plus aggregates into progress state.
    pub fn apply(&mut self, result: &SessionResult, stats: &AggregateStats) {
        let session_count = stats.total_sessions;
        self.update("first_session", session_count);
        self.update("10_sessions", session_count);
        self.update("50_sessions", session_count);
        self.update("100_sessions", session_count);

        let total_secs = stats.total_time_secs.max(0.0) as u64;
        self.update("1_hour", total_secs);
        self.update("10_hours", total_secs);

        let cycles = u64::from(result.completed_cycles);
        self.update("perfect_10", cycles);
        self.update("perfect_50", cycles);

        let streak = u64::from(stats.current_streak_days);
        self.update("3_day_streak", streak);
        self.update("7_day_streak", streak);
        self.update("30_day_streak", streak);

        let stability = result.rhythm_stability.clamp(0.0, 100.0) as u64;
        self.update("perfect_rhythm", stability);
        self.update("zen_master", stability);
    }

    /// Progress only ever moves forward; an unlocked achievement never
    /// regresses.
    fn update(&mut self, id: &str, progress: u64) {
        if let Some(a) = self.achievements.iter_mut().find(|a| a.id == id) {
            if a.is_unlocked {
                return;
            }
            a.current_progress = a.current_progress.max(progress);
            if a.current_progress >= a.target_value {
                a.is_unlocked = true;
                a.unlocked_date = Some(Utc::now());
            }
        }
    }
}

impl AchievementEvaluator for AchievementBook {
    fn evaluate(
        &mut self,
        result: &SessionResult,
        stats: &AggregateStats,
    ) -> Result<(), CoreError> {
        self.apply(result, stats);
        Ok(())
    }
}

/// Database-backed evaluator: loads the book, applies the session, and
/// persists the updated state.
pub struct PersistentAchievements {
    db: Database,
}

impl PersistentAchievements {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl AchievementEvaluator for PersistentAchievements {
    fn evaluate(
        &mut self,
        result: &SessionResult,
        stats: &AggregateStats,
    ) -> Result<(), CoreError> {
        let mut book = AchievementBook::load(&self.db)?;
        book.apply(result, stats);
        book.save(&self.db)
    }
}
