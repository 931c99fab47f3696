//! Storage layer for the focus tracker.
//!
//! Provides persistence for finalized sessions and per-user aggregate stats
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! Per-user serialization of [`Database::apply_session`] is enforced with an
//! optimistic version token on the `user_stats` row: a concurrent writer
//! (another process on the same file) makes the conditional update miss, and
//! the apply is re-run from a freshly read state. The reducer itself is pure,
//! so re-running it is always safe.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2024-01-15T10:30:00Z`), so lexicographic ordering matches chronological
//! ordering and values stay human-readable. The `data` columns store the
//! full record as JSON; code reading old rows must tolerate unknown fields,
//! and removed or renamed fields require a migration.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use ft_core::{
    AggregateConfig, Milestone, SessionRecord, StatsError, UserId, UserStats, apply_session,
};

/// Attempts before giving up on an optimistic-concurrency conflict.
const MAX_APPLY_ATTEMPTS: u32 = 3;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored JSON document failed to encode or decode.
    #[error("invalid document for {key}: {source}")]
    Document {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stats row changed underneath an apply and retries ran out.
    /// The caller may re-read and retry; nothing was written.
    #[error("concurrent update on stats for user {user_id}")]
    Conflict { user_id: String },

    /// The session could not be applied.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Outcome of [`Database::apply_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedSession {
    /// The user's stats after the apply (or the stored stats when the
    /// session had already been ingested).
    pub stats: UserStats,
    /// Milestones newly unlocked by this session.
    pub unlocked: Vec<Milestone>,
    /// False when the session ID was already present and nothing changed.
    pub newly_ingested: bool,
}

/// Per-user row summary for status listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatsRow {
    pub user_id: String,
    pub updated_at: String,
    pub version: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Sessions table: append-only record of finalized sessions.
            -- data: the full SessionRecord as JSON
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                status TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);

            -- Per-user aggregate record with an optimistic version token.
            -- data: the full UserStats as JSON
            CREATE TABLE IF NOT EXISTS user_stats (
                user_id TEXT PRIMARY KEY,
                version INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a finalized session, ignoring duplicates by ID.
    ///
    /// Returns true if the row was inserted, false if the ID already existed.
    pub fn insert_session(&mut self, session: &SessionRecord) -> Result<bool, DbError> {
        let data = serde_json::to_string(session).map_err(|source| DbError::Document {
            key: format!("session {}", session.id),
            source,
        })?;
        let inserted = self.conn.execute(
            "
            INSERT OR IGNORE INTO sessions (id, user_id, started_at, ended_at, status, data)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                session.id.as_str(),
                session.user_id.as_str(),
                iso8601(session.start_time),
                session.end_time.map(iso8601),
                session.status.as_str(),
                data,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Counts stored sessions for a user.
    pub fn session_count(&self, user_id: &UserId) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?",
            params![user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Loads a user's stats and the row's version token.
    pub fn load_stats(&self, user_id: &UserId) -> Result<Option<(UserStats, i64)>, DbError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT data, version FROM user_stats WHERE user_id = ?",
                params![user_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((data, version)) => {
                let stats =
                    serde_json::from_str(&data).map_err(|source| DbError::Document {
                        key: format!("stats for user {user_id}"),
                        source,
                    })?;
                Ok(Some((stats, version)))
            }
        }
    }

    /// Writes a user's stats, guarded by the version read alongside them.
    ///
    /// `expected_version` 0 means "no row existed". Fails with
    /// [`DbError::Conflict`] when another writer bumped the version in
    /// between; the caller must re-read and recompute.
    pub fn save_stats(
        &mut self,
        stats: &UserStats,
        expected_version: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let data = serde_json::to_string(stats).map_err(|source| DbError::Document {
            key: format!("stats for user {}", stats.user_id),
            source,
        })?;
        let changed = self.conn.execute(
            "
            INSERT INTO user_stats (user_id, version, updated_at, data)
            VALUES (?1, 1, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE
            SET version = version + 1, updated_at = ?3, data = ?4
            WHERE version = ?2
            ",
            params![
                stats.user_id.as_str(),
                expected_version,
                iso8601(updated_at),
                data,
            ],
        )?;
        if changed == 0 {
            return Err(DbError::Conflict {
                user_id: stats.user_id.to_string(),
            });
        }
        Ok(())
    }

    /// Applies one finalized session to its user's stats, atomically.
    ///
    /// The full sequence - append the session row, fold it into the stats,
    /// write the stats back - commits as one transaction. A duplicate
    /// session ID is a no-op that returns the stored stats unchanged. On a
    /// version conflict the computation is re-run from a freshly read state,
    /// up to [`MAX_APPLY_ATTEMPTS`] times.
    pub fn apply_session(
        &mut self,
        session: &SessionRecord,
        config: &AggregateConfig,
        now: DateTime<Utc>,
    ) -> Result<AppliedSession, DbError> {
        for attempt in 1..=MAX_APPLY_ATTEMPTS {
            let (stats, version) = match self.load_stats(&session.user_id)? {
                Some((stats, version)) => (stats, version),
                None => (UserStats::new(session.user_id.clone()), 0),
            };

            let result = apply_session(&stats, session, config, now)?;

            let tx = self.conn.transaction()?;
            let inserted = {
                let data =
                    serde_json::to_string(session).map_err(|source| DbError::Document {
                        key: format!("session {}", session.id),
                        source,
                    })?;
                tx.execute(
                    "
                    INSERT OR IGNORE INTO sessions (id, user_id, started_at, ended_at, status, data)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ",
                    params![
                        session.id.as_str(),
                        session.user_id.as_str(),
                        iso8601(session.start_time),
                        session.end_time.map(iso8601),
                        session.status.as_str(),
                        data,
                    ],
                )?
            };

            if inserted == 0 {
                // Already ingested; the stored stats stand.
                tracing::warn!(session = %session.id, "session already ingested, skipping");
                return Ok(AppliedSession {
                    stats,
                    unlocked: Vec::new(),
                    newly_ingested: false,
                });
            }

            let data = serde_json::to_string(&result.stats).map_err(|source| {
                DbError::Document {
                    key: format!("stats for user {}", result.stats.user_id),
                    source,
                }
            })?;
            let changed = tx.execute(
                "
                INSERT INTO user_stats (user_id, version, updated_at, data)
                VALUES (?1, 1, ?3, ?4)
                ON CONFLICT(user_id) DO UPDATE
                SET version = version + 1, updated_at = ?3, data = ?4
                WHERE version = ?2
                ",
                params![
                    result.stats.user_id.as_str(),
                    version,
                    iso8601(now),
                    data,
                ],
            )?;

            if changed == 0 {
                // Lost the race; the transaction rolls back on drop.
                drop(tx);
                tracing::debug!(
                    user = %session.user_id,
                    attempt,
                    "stats version conflict, retrying from fresh state"
                );
                continue;
            }

            tx.commit()?;
            return Ok(AppliedSession {
                stats: result.stats,
                unlocked: result.unlocked,
                newly_ingested: true,
            });
        }

        Err(DbError::Conflict {
            user_id: session.user_id.to_string(),
        })
    }

    /// Lists stats rows for all users, most recently updated first.
    pub fn list_user_stats(&self) -> Result<Vec<UserStatsRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, updated_at, version
            FROM user_stats
            ORDER BY updated_at DESC, user_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserStatsRow {
                user_id: row.get(0)?,
                updated_at: row.get(1)?,
                version: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Formats a timestamp in the stored ISO 8601 form.
fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ft_core::{SessionId, SessionStatus, SessionType, score_session};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn finalized_session(id: &str, start: DateTime<Utc>, minutes: i64) -> SessionRecord {
        let session = SessionRecord {
            id: SessionId::new(id).unwrap(),
            user_id: user(),
            start_time: start,
            end_time: Some(start + Duration::minutes(minutes)),
            planned_minutes: minutes,
            actual_minutes: None,
            status: SessionStatus::Completed,
            completed: true,
            breaks: Vec::new(),
            distractions: Vec::new(),
            total_break_minutes: 0,
            total_distractions: 0,
            focus_score: None,
            session_type: SessionType::Standard,
            ambient_sounds: Vec::new(),
            xp_earned: None,
        };
        score_session(&session).unwrap()
    }

    #[test]
    fn open_creates_schema_idempotently() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ft.db");
        drop(Database::open(&path).unwrap());
        // Second open re-runs init on the same file.
        let db = Database::open(&path).unwrap();
        assert!(db.list_user_stats().unwrap().is_empty());
    }

    #[test]
    fn insert_session_ignores_duplicates() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let session = finalized_session("sess-1", start, 25);

        assert!(db.insert_session(&session).unwrap());
        assert!(!db.insert_session(&session).unwrap());
        assert_eq!(db.session_count(&user()).unwrap(), 1);
    }

    #[test]
    fn apply_session_creates_stats_on_first_use() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let session = finalized_session("sess-1", start, 25);

        let applied = db
            .apply_session(&session, &AggregateConfig::default(), now())
            .unwrap();
        assert!(applied.newly_ingested);
        assert_eq!(applied.stats.total_sessions, 1);
        assert_eq!(applied.unlocked.len(), 1);

        let (stored, version) = db.load_stats(&user()).unwrap().unwrap();
        assert_eq!(stored, applied.stats);
        assert_eq!(version, 1);
    }

    #[test]
    fn reapplying_a_session_does_not_double_count() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let session = finalized_session("sess-1", start, 25);
        let config = AggregateConfig::default();

        db.apply_session(&session, &config, now()).unwrap();
        let second = db.apply_session(&session, &config, now()).unwrap();

        assert!(!second.newly_ingested);
        assert!(second.unlocked.is_empty());
        assert_eq!(second.stats.total_sessions, 1);
        assert_eq!(db.session_count(&user()).unwrap(), 1);
    }

    #[test]
    fn apply_session_accumulates_across_sessions() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let config = AggregateConfig::default();

        for (i, minutes) in [25, 50].into_iter().enumerate() {
            let session =
                finalized_session(&format!("sess-{i}"), start + Duration::hours(i as i64), minutes);
            db.apply_session(&session, &config, now()).unwrap();
        }

        let (stats, version) = db.load_stats(&user()).unwrap().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_focus_minutes, 75);
        assert_eq!(version, 2);
    }

    #[test]
    fn save_stats_rejects_stale_version() {
        let mut db = Database::open_in_memory().unwrap();
        let stats = UserStats::new(user());

        db.save_stats(&stats, 0, now()).unwrap();
        // A second writer with the same stale token must miss.
        let result = db.save_stats(&stats, 0, now());
        assert!(matches!(result, Err(DbError::Conflict { .. })));

        // With the current token it goes through.
        let (_, version) = db.load_stats(&user()).unwrap().unwrap();
        db.save_stats(&stats, version, now()).unwrap();
    }

    #[test]
    fn unfinalized_session_leaves_store_untouched() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut session = finalized_session("sess-1", start, 25);
        session.end_time = None;

        let result = db.apply_session(&session, &AggregateConfig::default(), now());
        assert!(matches!(result, Err(DbError::Stats(_))));
        assert_eq!(db.session_count(&user()).unwrap(), 0);
        assert!(db.load_stats(&user()).unwrap().is_none());
    }

    #[test]
    fn list_user_stats_orders_by_recency() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let config = AggregateConfig::default();

        let mut session_a = finalized_session("sess-a", start, 25);
        session_a.user_id = UserId::new("user-a").unwrap();
        let mut session_b = finalized_session("sess-b", start, 25);
        session_b.user_id = UserId::new("user-b").unwrap();

        db.apply_session(&session_a, &config, now()).unwrap();
        db.apply_session(&session_b, &config, now() + Duration::minutes(1))
            .unwrap();

        let rows = db.list_user_stats().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, "user-b");
        assert_eq!(rows[1].user_id, "user-a");
    }
}
