//! Database operations using rusqlite.

use crate::storage::records::{Attempt, ClimbRecord};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;

/// Outcome of [`Database::record_attempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedAttempt {
    pub attempt_id: i64,
    /// Fastest time before this attempt, if the climb had one
    pub previous_best_ms: Option<u64>,
    /// This attempt now carries the PR flag
    pub is_fastest: bool,
}

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        // Create schema version table
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        // Check current version
        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    // ========== Climb Operations ==========

    /// Insert climb metadata. Fails if the id already exists.
    pub fn insert_climb(&self, climb: &ClimbRecord) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO climbs (id, name, latitude, longitude, length_m, elevation_m,
                                     avg_grade, max_grade, category, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    climb.id,
                    climb.name,
                    climb.latitude,
                    climb.longitude,
                    climb.length_m,
                    climb.elevation_m,
                    climb.avg_grade,
                    climb.max_grade,
                    climb.category,
                    climb.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DatabaseError::ConstraintViolation(format!("Climb {} already exists", climb.id))
                }
                e => DatabaseError::QueryFailed(e.to_string()),
            })?;

        Ok(())
    }

    /// Get climb metadata by id.
    pub fn get_climb(&self, id: &str) -> Result<Option<ClimbRecord>, DatabaseError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM climbs WHERE id = ?1", CLIMB_COLUMNS),
                params![id],
                ClimbRow::from_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .map(ClimbRow::into_climb)
            .transpose()
    }

    /// List all climbs, newest first.
    pub fn list_climbs(&self) -> Result<Vec<ClimbRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM climbs ORDER BY created_at DESC",
                CLIMB_COLUMNS
            ))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], ClimbRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut climbs = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            climbs.push(row.into_climb()?);
        }

        Ok(climbs)
    }

    /// Closest climb whose start lies within `radius_deg` of a position.
    pub fn find_climb_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_deg: f64,
    ) -> Result<Option<ClimbRecord>, DatabaseError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM climbs
                     WHERE ABS(latitude - ?1) < ?3 AND ABS(longitude - ?2) < ?3
                     ORDER BY ABS(latitude - ?1) + ABS(longitude - ?2) ASC
                     LIMIT 1",
                    CLIMB_COLUMNS
                ),
                params![latitude, longitude, radius_deg],
                ClimbRow::from_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .map(ClimbRow::into_climb)
            .transpose()
    }

    /// Delete a climb and its attempts.
    pub fn delete_climb(&self, id: &str) -> Result<(), DatabaseError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM climbs WHERE id = ?1", params![id])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Climb {} not found", id)));
        }

        Ok(())
    }

    // ========== Attempt Operations ==========

    /// Insert an attempt and return its row id.
    pub fn insert_attempt(&self, attempt: &Attempt) -> Result<i64, DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO attempts (climb_id, date, time_ms, avg_power, avg_hr, is_pr)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    attempt.climb_id,
                    attempt.date.to_rfc3339(),
                    attempt.time_ms as i64,
                    attempt.avg_power,
                    attempt.avg_hr,
                    attempt.is_pr as i32,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Fastest attempt on a climb.
    pub fn get_fastest_attempt(&self, climb_id: &str) -> Result<Option<Attempt>, DatabaseError> {
        self.query_attempt(
            "WHERE climb_id = ?1 ORDER BY time_ms ASC, id ASC LIMIT 1",
            climb_id,
        )
    }

    /// Attempt carrying the PR flag.
    pub fn get_pr(&self, climb_id: &str) -> Result<Option<Attempt>, DatabaseError> {
        self.query_attempt("WHERE climb_id = ?1 AND is_pr = 1 LIMIT 1", climb_id)
    }

    fn query_attempt(&self, clause: &str, climb_id: &str) -> Result<Option<Attempt>, DatabaseError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM attempts {}", ATTEMPT_COLUMNS, clause),
                params![climb_id],
                AttemptRow::from_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .map(AttemptRow::into_attempt)
            .transpose()
    }

    /// Attempts on a climb, newest first.
    pub fn list_attempts(&self, climb_id: &str) -> Result<Vec<Attempt>, DatabaseError> {
        self.query_attempts(
            &format!(
                "SELECT {} FROM attempts WHERE climb_id = ?1 ORDER BY date DESC, id DESC",
                ATTEMPT_COLUMNS
            ),
            params![climb_id],
        )
    }

    /// Most recent attempts across all climbs.
    pub fn list_recent_attempts(&self, limit: usize) -> Result<Vec<Attempt>, DatabaseError> {
        self.query_attempts(
            &format!(
                "SELECT {} FROM attempts ORDER BY date DESC, id DESC LIMIT ?1",
                ATTEMPT_COLUMNS
            ),
            params![limit as i64],
        )
    }

    fn query_attempts(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Attempt>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params, AttemptRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut attempts = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            attempts.push(row.into_attempt()?);
        }

        Ok(attempts)
    }

    /// Save an attempt and recompute the PR flag in one transaction.
    ///
    /// Climb metadata is inserted if absent. The attempt is written unflagged
    /// and takes the flag only if it beats every earlier attempt, so exactly
    /// one attempt per climb carries it after a successful commit.
    pub fn record_attempt(
        &self,
        climb: &ClimbRecord,
        attempt: &Attempt,
    ) -> Result<RecordedAttempt, DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        if self.get_climb(&climb.id)?.is_none() {
            self.insert_climb(climb)?;
        }

        let previous_best_ms = self.get_fastest_attempt(&climb.id)?.map(|a| a.time_ms);
        let attempt_id = self.insert_attempt(&Attempt {
            climb_id: climb.id.clone(),
            is_pr: false,
            ..attempt.clone()
        })?;

        let is_fastest = previous_best_ms.map_or(true, |best| attempt.time_ms < best);
        if is_fastest {
            self.set_pr(&climb.id, attempt_id)?;
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        Ok(RecordedAttempt {
            attempt_id,
            previous_best_ms,
            is_fastest,
        })
    }

    /// Move the PR flag of a climb to one attempt. Callers own the transaction.
    fn set_pr(&self, climb_id: &str, attempt_id: i64) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "UPDATE attempts SET is_pr = 0 WHERE climb_id = ?1",
                params![climb_id],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows_affected = self
            .conn
            .execute(
                "UPDATE attempts SET is_pr = 1 WHERE id = ?1 AND climb_id = ?2",
                params![attempt_id, climb_id],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Attempt {} not found",
                attempt_id
            )));
        }

        Ok(())
    }

    // ========== Checkpoint Operations ==========

    /// Store the checkpoint payload, replacing any previous one.
    pub fn save_checkpoint(&self, data_json: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO checkpoint (id, data_json, saved_at)
                 VALUES (1, ?1, datetime('now'))",
                params![data_json],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Load the checkpoint payload, if any.
    pub fn load_checkpoint(&self) -> Result<Option<String>, DatabaseError> {
        let result: Result<String, _> = self.conn.query_row(
            "SELECT data_json FROM checkpoint WHERE id = 1",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(json) => Ok(Some(json)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Remove the checkpoint.
    pub fn clear_checkpoint(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM checkpoint", [])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

// ========== Row Types ==========

const CLIMB_COLUMNS: &str = "id, name, latitude, longitude, length_m, elevation_m, \
                             avg_grade, max_grade, category, created_at";

const ATTEMPT_COLUMNS: &str = "id, climb_id, date, time_ms, avg_power, avg_hr, is_pr";

struct ClimbRow {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    length_m: f64,
    elevation_m: f64,
    avg_grade: f64,
    max_grade: f64,
    category: u8,
    created_at: String,
}

impl ClimbRow {
    fn from_row(row: &rusqlite::Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            length_m: row.get(4)?,
            elevation_m: row.get(5)?,
            avg_grade: row.get(6)?,
            max_grade: row.get(7)?,
            category: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_climb(self) -> Result<ClimbRecord, DatabaseError> {
        let created_at = parse_timestamp(&self.created_at, "created date")?;

        Ok(ClimbRecord {
            id: self.id,
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            length_m: self.length_m,
            elevation_m: self.elevation_m,
            avg_grade: self.avg_grade,
            max_grade: self.max_grade,
            category: self.category,
            created_at,
        })
    }
}

struct AttemptRow {
    id: i64,
    climb_id: String,
    date: String,
    time_ms: i64,
    avg_power: u16,
    avg_hr: u8,
    is_pr: i32,
}

impl AttemptRow {
    fn from_row(row: &rusqlite::Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            climb_id: row.get(1)?,
            date: row.get(2)?,
            time_ms: row.get(3)?,
            avg_power: row.get(4)?,
            avg_hr: row.get(5)?,
            is_pr: row.get(6)?,
        })
    }

    fn into_attempt(self) -> Result<Attempt, DatabaseError> {
        let date = parse_timestamp(&self.date, "attempt date")?;

        Ok(Attempt {
            id: self.id,
            climb_id: self.climb_id,
            date,
            time_ms: self.time_ms.max(0) as u64,
            avg_power: self.avg_power,
            avg_hr: self.avg_hr,
            is_pr: self.is_pr != 0,
        })
    }
}

fn parse_timestamp(value: &str, what: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid {}: {}", what, e)))
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
