//! Climb records: attempts, personal records and live PR comparison.
//!
//! Saving follows one rule: the fastest attempt for a climb carries the PR
//! flag, and only that one. Climb metadata is written the first time a climb
//! is seen and never overwritten.

use crate::climbs::types::ClimbInfo;
use crate::storage::database::{Database, DatabaseError, RecordedAttempt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Search radius for nearby climbs (degrees).
pub const NEARBY_RADIUS_DEG: f64 = 0.005;
/// Default size of the recent attempts list.
pub const RECENT_ATTEMPTS_LIMIT: usize = 50;

/// Static climb metadata as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbRecord {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub length_m: f64,
    pub elevation_m: f64,
    pub avg_grade: f64,
    pub max_grade: f64,
    pub category: u8,
    pub created_at: DateTime<Utc>,
}

impl ClimbRecord {
    /// Metadata for a live climb.
    pub fn from_climb(climb: &ClimbInfo) -> Self {
        Self {
            id: climb.id.clone(),
            name: climb.name.clone(),
            latitude: climb.start_latitude,
            longitude: climb.start_longitude,
            length_m: climb.length_m,
            elevation_m: climb.elevation_m,
            avg_grade: climb.avg_grade,
            max_grade: climb.max_grade,
            category: climb.category,
            created_at: Utc::now(),
        }
    }
}

/// One timed ascent of a climb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Row id (0 before insertion)
    pub id: i64,
    pub climb_id: String,
    pub date: DateTime<Utc>,
    pub time_ms: u64,
    pub avg_power: u16,
    pub avg_hr: u8,
    pub is_pr: bool,
}

/// Result of saving an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub attempt_id: i64,
    /// Beat an existing record (false for the first attempt on a climb)
    pub is_pr: bool,
    /// How much faster than the previous record (ms)
    pub improved_by_ms: u64,
}

/// Persistence operations needed for climb records.
pub trait RecordStore: Send + Sync {
    /// Insert the climb if new, insert the attempt and move the PR flag to
    /// it when it is the fastest, all or nothing.
    fn record_attempt(&self, climb: &ClimbRecord, attempt: &Attempt) -> Result<RecordedAttempt, DatabaseError>;

    fn pr(&self, climb_id: &str) -> Result<Option<Attempt>, DatabaseError>;
    fn attempts(&self, climb_id: &str) -> Result<Vec<Attempt>, DatabaseError>;
    fn climbs(&self) -> Result<Vec<ClimbRecord>, DatabaseError>;
    fn recent_attempts(&self, limit: usize) -> Result<Vec<Attempt>, DatabaseError>;
    fn find_nearby_climb(&self, latitude: f64, longitude: f64) -> Result<Option<ClimbRecord>, DatabaseError>;
}

impl RecordStore for Mutex<Database> {
    fn record_attempt(&self, climb: &ClimbRecord, attempt: &Attempt) -> Result<RecordedAttempt, DatabaseError> {
        lock(self)?.record_attempt(climb, attempt)
    }

    fn pr(&self, climb_id: &str) -> Result<Option<Attempt>, DatabaseError> {
        lock(self)?.get_pr(climb_id)
    }

    fn attempts(&self, climb_id: &str) -> Result<Vec<Attempt>, DatabaseError> {
        lock(self)?.list_attempts(climb_id)
    }

    fn climbs(&self) -> Result<Vec<ClimbRecord>, DatabaseError> {
        lock(self)?.list_climbs()
    }

    fn recent_attempts(&self, limit: usize) -> Result<Vec<Attempt>, DatabaseError> {
        lock(self)?.list_recent_attempts(limit)
    }

    fn find_nearby_climb(&self, latitude: f64, longitude: f64) -> Result<Option<ClimbRecord>, DatabaseError> {
        lock(self)?.find_climb_near(latitude, longitude, NEARBY_RADIUS_DEG)
    }
}

pub(crate) fn lock(db: &Mutex<Database>) -> Result<std::sync::MutexGuard<'_, Database>, DatabaseError> {
    db.lock()
        .map_err(|e| DatabaseError::ConnectionFailed(format!("Database lock poisoned: {}", e)))
}

/// Attempt saving and PR lookups over a [`RecordStore`].
#[derive(Clone)]
pub struct ClimbRecords {
    store: Arc<dyn RecordStore>,
}

impl ClimbRecords {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Save an attempt and update the PR flag.
    pub fn save_attempt(
        &self,
        climb: &ClimbRecord,
        time_ms: u64,
        avg_power: u16,
        avg_hr: u8,
    ) -> Result<SaveOutcome, DatabaseError> {
        let recorded = self.store.record_attempt(
            climb,
            &Attempt {
                id: 0,
                climb_id: climb.id.clone(),
                date: Utc::now(),
                time_ms,
                avg_power,
                avg_hr,
                is_pr: false,
            },
        )?;

        let (is_pr, improved_by_ms) = match recorded.previous_best_ms {
            Some(best) if recorded.is_fastest => (true, best - time_ms),
            _ => (false, 0),
        };
        let attempt_id = recorded.attempt_id;

        if is_pr {
            tracing::info!(
                "New PR on {}: {} ({} faster)",
                climb.name,
                format_duration_ms(time_ms),
                format_duration_ms(improved_by_ms)
            );
        } else {
            tracing::info!("Attempt saved on {}: {}", climb.name, format_duration_ms(time_ms));
        }

        Ok(SaveOutcome {
            attempt_id,
            is_pr,
            improved_by_ms,
        })
    }

    /// Compare elapsed time on a climb against its PR.
    pub fn compare(&self, climb_id: &str, current_time_ms: u64) -> Result<PrComparison, DatabaseError> {
        Ok(match self.store.pr(climb_id)? {
            Some(pr) => PrComparison::new(pr.time_ms, current_time_ms),
            None => PrComparison::default(),
        })
    }

    pub fn pr(&self, climb_id: &str) -> Result<Option<Attempt>, DatabaseError> {
        self.store.pr(climb_id)
    }

    /// Attempts on a climb, newest first.
    pub fn attempts(&self, climb_id: &str) -> Result<Vec<Attempt>, DatabaseError> {
        self.store.attempts(climb_id)
    }

    pub fn climbs(&self) -> Result<Vec<ClimbRecord>, DatabaseError> {
        self.store.climbs()
    }

    pub fn recent_attempts(&self, limit: usize) -> Result<Vec<Attempt>, DatabaseError> {
        self.store.recent_attempts(limit)
    }

    /// Closest stored climb within the search box around a position.
    pub fn find_nearby_climb(&self, latitude: f64, longitude: f64) -> Result<Option<ClimbRecord>, DatabaseError> {
        self.store.find_nearby_climb(latitude, longitude)
    }
}

/// Climb occurrences already saved during the current ride.
///
/// Both the climb-ended and ride-ended paths can observe the same completion;
/// whichever claims the key first gets to save.
#[derive(Debug, Default)]
pub struct SavedClimbs {
    keys: Mutex<HashSet<String>>,
}

impl SavedClimbs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key identifying one occurrence of a climb within a ride.
    pub fn occurrence_key(climb_id: &str, tracking_start_ms: i64) -> String {
        format!("{}@{}", climb_id, tracking_start_ms)
    }

    /// Atomically claim `key`. Returns false if it was already claimed.
    pub fn try_claim(&self, key: &str) -> bool {
        match self.keys.lock() {
            Ok(mut keys) => keys.insert(key.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(key.to_string()),
        }
    }

    /// Forget all claims (new ride).
    pub fn clear(&self) {
        match self.keys.lock() {
            Ok(mut keys) => keys.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.keys.lock() {
            Ok(keys) => keys.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Live comparison against the stored PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrComparison {
    pub has_pr: bool,
    pub pr_time_ms: u64,
    pub current_time_ms: u64,
    /// Current minus PR (ms); negative means ahead
    pub delta_ms: i64,
    pub is_ahead: bool,
}

impl PrComparison {
    pub fn new(pr_time_ms: u64, current_time_ms: u64) -> Self {
        let delta_ms = current_time_ms as i64 - pr_time_ms as i64;
        Self {
            has_pr: true,
            pr_time_ms,
            current_time_ms,
            delta_ms,
            is_ahead: delta_ms < 0,
        }
    }

    /// Delta as "-1m05s" or "+12s".
    pub fn delta_formatted(&self) -> String {
        let secs = self.delta_ms.unsigned_abs() / 1000;
        let sign = if self.is_ahead { "-" } else { "+" };
        let (min, sec) = (secs / 60, secs % 60);
        if min > 0 {
            format!("{}{}m{:02}s", sign, min, sec)
        } else {
            format!("{}{}s", sign, sec)
        }
    }
}

/// Format seconds as "M:SS" or "H:MM:SS"; negative is unknown ("--:--").
pub fn format_duration(seconds: i64) -> String {
    if seconds < 0 {
        return "--:--".to_string();
    }
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Format milliseconds like [`format_duration`].
pub fn format_duration_ms(ms: u64) -> String {
    format_duration((ms / 1000) as i64)
}
