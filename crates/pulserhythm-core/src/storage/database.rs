//! SQLite-based session history and statistics.
//!
//! Provides persistent storage for:
//! - Finished breathing sessions (append-only history)
//! - Custom breathing techniques
//! - Key-value store for application state (achievement book)

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::history::{AggregateStats, HistoryStore};
use crate::session::SessionResult;
use crate::technique::Technique;

/// One row of session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub technique_id: Uuid,
    pub technique_name: String,
    pub total_time_secs: f64,
    pub completed_cycles: u32,
    pub rhythm_stability: f64,
    pub calmness_level: f64,
    pub achievements: Vec<String>,
    pub session_date: DateTime<Utc>,
}

/// Aggregate history statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryStats {
    pub total_sessions: u64,
    pub total_time_secs: f64,
    pub average_stability: f64,
    pub average_calmness: f64,
    pub sessions_this_week: u64,
    pub current_streak_days: u32,
}

/// SQLite database for session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pulserhythm/pulserhythm.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("pulserhythm.db");
        let conn = Connection::open(&path).map_err(|source| {
            CoreError::Database(DatabaseError::OpenFailed { path, source })
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    technique_id     TEXT NOT NULL,
                    technique_name   TEXT NOT NULL,
                    total_time_secs  REAL NOT NULL,
                    completed_cycles INTEGER NOT NULL,
                    rhythm_stability REAL NOT NULL,
                    calmness_level   REAL NOT NULL,
                    achievements     TEXT NOT NULL DEFAULT '[]',
                    session_date     TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS techniques (
                    id           TEXT PRIMARY KEY,
                    name         TEXT NOT NULL,
                    description  TEXT NOT NULL DEFAULT '',
                    inhale_secs  INTEGER NOT NULL,
                    hold1_secs   INTEGER NOT NULL,
                    exhale_secs  INTEGER NOT NULL,
                    hold2_secs   INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_session_date ON sessions(session_date);
                CREATE INDEX IF NOT EXISTS idx_sessions_technique_id ON sessions(technique_id);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Session history ──────────────────────────────────────────────

    /// Append one finished session to history.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, result: &SessionResult) -> Result<i64, CoreError> {
        let achievements = serde_json::to_string(&result.achievements)?;
        self.conn
            .execute(
                "INSERT INTO sessions (technique_id, technique_name, total_time_secs,
                    completed_cycles, rhythm_stability, calmness_level, achievements, session_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    result.technique.id.to_string(),
                    result.technique.name,
                    result.total_time_secs,
                    result.completed_cycles,
                    result.rhythm_stability,
                    result.calmness_level,
                    achievements,
                    result.session_date.to_rfc3339(),
                ],
            )
            .map_err(DatabaseError::from)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List recorded sessions, newest first, optionally filtered to one
    /// technique.
    pub fn list_sessions(
        &self,
        technique_id: Option<Uuid>,
        limit: Option<u32>,
    ) -> Result<Vec<SessionRecord>, CoreError> {
        let limit = i64::from(limit.unwrap_or(u32::MAX));
        let mut out = Vec::new();

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(i64, String, String, f64, u32, f64, f64, String, String)> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        };

        let rows: Vec<_> = match technique_id {
            Some(id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, technique_id, technique_name, total_time_secs, completed_cycles,
                            rhythm_stability, calmness_level, achievements, session_date
                     FROM sessions WHERE technique_id = ?1
                     ORDER BY session_date DESC LIMIT ?2",
                ).map_err(DatabaseError::from)?;
                let mapped = stmt
                    .query_map(params![id.to_string(), limit], map_row)
                    .map_err(DatabaseError::from)?;
                mapped.collect::<rusqlite::Result<_>>().map_err(DatabaseError::from)?
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, technique_id, technique_name, total_time_secs, completed_cycles,
                            rhythm_stability, calmness_level, achievements, session_date
                     FROM sessions ORDER BY session_date DESC LIMIT ?1",
                ).map_err(DatabaseError::from)?;
                let mapped = stmt
                    .query_map(params![limit], map_row)
                    .map_err(DatabaseError::from)?;
                mapped.collect::<rusqlite::Result<_>>().map_err(DatabaseError::from)?
            }
        };

        for (id, tid, name, total, cycles, stability, calmness, achievements, date) in rows {
            out.push(SessionRecord {
                id,
                technique_id: Uuid::parse_str(&tid)
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?,
                technique_name: name,
                total_time_secs: total,
                completed_cycles: cycles,
                rhythm_stability: stability,
                calmness_level: calmness,
                achievements: serde_json::from_str(&achievements)?,
                session_date: parse_date(&date)?,
            });
        }
        Ok(out)
    }

    /// Delete all session history.
    pub fn delete_all_sessions(&self) -> Result<usize, CoreError> {
        let n = self
            .conn
            .execute("DELETE FROM sessions", [])
            .map_err(DatabaseError::from)?;
        Ok(n)
    }

    /// Aggregate statistics across all recorded sessions.
    pub fn history_stats(&self) -> Result<HistoryStats, CoreError> {
        let (total_sessions, total_time_secs, average_stability, average_calmness) = self
            .conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(total_time_secs), 0),
                        COALESCE(AVG(rhythm_stability), 0),
                        COALESCE(AVG(calmness_level), 0)
                 FROM sessions",
                [],
                |row| {
                    Ok((
                        row.get::<_, u64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                    ))
                },
            )
            .map_err(DatabaseError::from)?;

        let week_ago = (Utc::now() - Duration::days(7)).to_rfc3339();
        let sessions_this_week = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sessions WHERE session_date >= ?1",
                params![week_ago],
                |row| row.get::<_, u64>(0),
            )
            .map_err(DatabaseError::from)?;

        Ok(HistoryStats {
            total_sessions,
            total_time_secs,
            average_stability,
            average_calmness,
            sessions_this_week,
            current_streak_days: self.current_streak()?,
        })
    }

    /// Consecutive days with at least one session, counting back from
    /// today. A day without a session breaks the streak; today without a
    /// session yields zero.
    pub fn current_streak(&self) -> Result<u32, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_date FROM sessions ORDER BY session_date DESC")
            .map_err(DatabaseError::from)?;
        let dates = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(DatabaseError::from)?;

        let mut streak = 0u32;
        let mut current = Utc::now().date_naive();
        for date in dates {
            let date = date.map_err(DatabaseError::from)?;
            let day = parse_date(&date)?.date_naive();
            if day == current {
                streak += 1;
                match current.pred_opt() {
                    Some(prev) => current = prev,
                    None => break,
                }
            } else if day < current {
                break;
            }
            // A second session on the already-counted day falls through.
        }
        Ok(streak)
    }

    // ── Custom techniques ────────────────────────────────────────────

    /// Insert a custom technique.
    pub fn insert_technique(&self, technique: &Technique) -> Result<(), CoreError> {
        technique.validate()?;
        self.conn
            .execute(
                "INSERT INTO techniques (id, name, description, inhale_secs, hold1_secs,
                    exhale_secs, hold2_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    technique.id.to_string(),
                    technique.name,
                    technique.description,
                    technique.inhale_secs,
                    technique.hold1_secs,
                    technique.exhale_secs,
                    technique.hold2_secs,
                ],
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Replace a stored technique by id. Returns whether a row changed.
    pub fn update_technique(&self, technique: &Technique) -> Result<bool, CoreError> {
        technique.validate()?;
        let n = self
            .conn
            .execute(
                "UPDATE techniques SET name = ?2, description = ?3, inhale_secs = ?4,
                    hold1_secs = ?5, exhale_secs = ?6, hold2_secs = ?7
                 WHERE id = ?1",
                params![
                    technique.id.to_string(),
                    technique.name,
                    technique.description,
                    technique.inhale_secs,
                    technique.hold1_secs,
                    technique.exhale_secs,
                    technique.hold2_secs,
                ],
            )
            .map_err(DatabaseError::from)?;
        Ok(n > 0)
    }

    /// Delete a stored technique by id. Returns whether a row changed.
    pub fn delete_technique(&self, id: Uuid) -> Result<bool, CoreError> {
        let n = self
            .conn
            .execute("DELETE FROM techniques WHERE id = ?1", params![id.to_string()])
            .map_err(DatabaseError::from)?;
        Ok(n > 0)
    }

    /// All stored custom techniques, in name order.
    pub fn custom_techniques(&self) -> Result<Vec<Technique>, CoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, inhale_secs, hold1_secs, exhale_secs, hold2_secs
                 FROM techniques ORDER BY name",
            )
            .map_err(DatabaseError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, u32>(6)?,
                ))
            })
            .map_err(DatabaseError::from)?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, description, inhale, hold1, exhale, hold2) =
                row.map_err(DatabaseError::from)?;
            out.push(Technique {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?,
                name,
                description,
                inhale_secs: inhale,
                hold1_secs: hold1,
                exhale_secs: exhale,
                hold2_secs: hold2,
            });
        }
        Ok(out)
    }

    // ── Key-value store ──────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv WHERE key = ?1")
            .map_err(DatabaseError::from)?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e).into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad session_date '{raw}': {e}")))
}

impl HistoryStore for Database {
    fn record(&mut self, result: &SessionResult) -> Result<(), CoreError> {
        self.record_session(result)?;
        Ok(())
    }

    fn aggregate(&self) -> Result<AggregateStats, CoreError> {
        let stats = self.history_stats()?;
        Ok(AggregateStats {
            total_sessions: stats.total_sessions,
            total_time_secs: stats.total_time_secs,
            current_streak_days: stats.current_streak_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coherent() -> Technique {
        Technique::new("Coherent", "For balance", 6, 0, 6, 0).unwrap()
    }

    fn result_on(date: DateTime<Utc>, cycles: u32, stability: f64) -> SessionResult {
        let mut r = SessionResult::assemble(coherent(), 120.0, cycles, stability);
        r.session_date = date;
        r
    }

    #[test]
    fn record_and_list_roundtrip() {
        let db = Database::open_memory().unwrap();
        let r = result_on(Utc::now(), 5, 80.0);
        db.record_session(&r).unwrap();

        let rows = db.list_sessions(None, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].technique_name, "Coherent");
        assert_eq!(rows[0].completed_cycles, 5);
        assert_eq!(rows[0].rhythm_stability, 80.0);
        assert_eq!(rows[0].achievements, vec!["First Session"]);
    }

    #[test]
    fn list_newest_first_and_filters_by_technique() {
        let db = Database::open_memory().unwrap();
        let older = result_on(Utc::now() - Duration::hours(2), 1, 50.0);
        let newer = result_on(Utc::now(), 2, 60.0);
        db.record_session(&older).unwrap();
        db.record_session(&newer).unwrap();

        let rows = db.list_sessions(None, None).unwrap();
        assert_eq!(rows[0].completed_cycles, 2);
        assert_eq!(rows[1].completed_cycles, 1);

        let filtered = db
            .list_sessions(Some(newer.technique.id), None)
            .unwrap();
        assert_eq!(filtered.len(), 1);

        let none = db.list_sessions(Some(Uuid::new_v4()), None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn stats_aggregate_sessions() {
        let db = Database::open_memory().unwrap();
        db.record_session(&result_on(Utc::now(), 5, 80.0)).unwrap();
        db.record_session(&result_on(Utc::now(), 3, 60.0)).unwrap();

        let stats = db.history_stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_time_secs, 240.0);
        assert_eq!(stats.average_stability, 70.0);
        assert_eq!(stats.average_calmness, 70.0);
        assert_eq!(stats.sessions_this_week, 2);
        assert_eq!(stats.current_streak_days, 1);
    }

    #[test]
    fn empty_history_stats_are_zero() {
        let db = Database::open_memory().unwrap();
        let stats = db.history_stats().unwrap();
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.current_streak_days, 0);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let db = Database::open_memory().unwrap();
        db.record_session(&result_on(Utc::now(), 1, 0.0)).unwrap();
        db.record_session(&result_on(Utc::now() - Duration::days(1), 1, 0.0))
            .unwrap();
        db.record_session(&result_on(Utc::now() - Duration::days(2), 1, 0.0))
            .unwrap();
        assert_eq!(db.current_streak().unwrap(), 3);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let db = Database::open_memory().unwrap();
        db.record_session(&result_on(Utc::now(), 1, 0.0)).unwrap();
        db.record_session(&result_on(Utc::now() - Duration::days(2), 1, 0.0))
            .unwrap();
        assert_eq!(db.current_streak().unwrap(), 1);
    }

    #[test]
    fn streak_requires_session_today() {
        let db = Database::open_memory().unwrap();
        db.record_session(&result_on(Utc::now() - Duration::days(1), 1, 0.0))
            .unwrap();
        assert_eq!(db.current_streak().unwrap(), 0);
    }

    #[test]
    fn same_day_sessions_count_once() {
        let db = Database::open_memory().unwrap();
        db.record_session(&result_on(Utc::now(), 1, 0.0)).unwrap();
        db.record_session(&result_on(Utc::now(), 2, 0.0)).unwrap();
        assert_eq!(db.current_streak().unwrap(), 1);
    }

    #[test]
    fn delete_all_clears_history() {
        let db = Database::open_memory().unwrap();
        db.record_session(&result_on(Utc::now(), 1, 0.0)).unwrap();
        assert_eq!(db.delete_all_sessions().unwrap(), 1);
        assert!(db.list_sessions(None, None).unwrap().is_empty());
    }

    #[test]
    fn technique_crud_roundtrip() {
        let db = Database::open_memory().unwrap();
        let mut t = Technique::new("My Custom", "slow evening", 5, 2, 7, 0).unwrap();
        db.insert_technique(&t).unwrap();

        let stored = db.custom_techniques().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].inhale_secs, 5);

        t.exhale_secs = 8;
        assert!(db.update_technique(&t).unwrap());
        assert_eq!(db.custom_techniques().unwrap()[0].exhale_secs, 8);

        assert!(db.delete_technique(t.id).unwrap());
        assert!(!db.delete_technique(t.id).unwrap());
        assert!(db.custom_techniques().unwrap().is_empty());
    }

    #[test]
    fn kv_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.kv_get("missing").unwrap(), None);
        db.kv_set("k", "v1").unwrap();
        db.kv_set("k", "v2").unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn history_store_trait_records_and_aggregates() {
        let mut db = Database::open_memory().unwrap();
        let r = result_on(Utc::now(), 4, 90.0);
        HistoryStore::record(&mut db, &r).unwrap();
        let agg = db.aggregate().unwrap();
        assert_eq!(agg.total_sessions, 1);
        assert_eq!(agg.total_time_secs, 120.0);
        assert_eq!(agg.current_streak_days, 1);
    }
}
