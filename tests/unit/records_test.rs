//! Climb record and PR bookkeeping through the public API.

use chrono::Utc;
use climbwise::storage::{
    Attempt, ClimbRecord, ClimbRecords, Database, DatabaseError, RecordStore, RecordedAttempt,
    SavedClimbs,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Store whose writes can be switched off.
struct FlakyStore {
    db: Mutex<Database>,
    fail_writes: AtomicBool,
}

impl RecordStore for FlakyStore {
    fn record_attempt(&self, climb: &ClimbRecord, attempt: &Attempt) -> Result<RecordedAttempt, DatabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::TransactionFailed("disk full".to_string()));
        }
        self.db.record_attempt(climb, attempt)
    }

    fn pr(&self, climb_id: &str) -> Result<Option<Attempt>, DatabaseError> {
        self.db.pr(climb_id)
    }

    fn attempts(&self, climb_id: &str) -> Result<Vec<Attempt>, DatabaseError> {
        self.db.attempts(climb_id)
    }

    fn climbs(&self) -> Result<Vec<ClimbRecord>, DatabaseError> {
        self.db.climbs()
    }

    fn recent_attempts(&self, limit: usize) -> Result<Vec<Attempt>, DatabaseError> {
        self.db.recent_attempts(limit)
    }

    fn find_nearby_climb(&self, latitude: f64, longitude: f64) -> Result<Option<ClimbRecord>, DatabaseError> {
        self.db.find_nearby_climb(latitude, longitude)
    }
}

fn records() -> ClimbRecords {
    let db = Database::open_in_memory().expect("Failed to create database");
    ClimbRecords::new(Arc::new(Mutex::new(db)))
}

fn climb(id: &str, name: &str, latitude: f64, longitude: f64) -> ClimbRecord {
    ClimbRecord {
        id: id.to_string(),
        name: name.to_string(),
        latitude,
        longitude,
        length_m: 4200.0,
        elevation_m: 350.0,
        avg_grade: 8.3,
        max_grade: 12.0,
        category: 3,
        created_at: Utc::now(),
    }
}

#[test]
fn test_pr_flag_follows_fastest() {
    let records = records();
    let col = climb("col-x", "Col X", 45.0, 6.0);

    let first = records.save_attempt(&col, 600_000, 250, 150).unwrap();
    assert!(!first.is_pr);
    assert_eq!(first.improved_by_ms, 0);
    assert_eq!(records.pr("col-x").unwrap().unwrap().id, first.attempt_id);

    let second = records.save_attempt(&col, 540_000, 262, 156).unwrap();
    assert!(second.is_pr);
    assert_eq!(second.improved_by_ms, 60_000);

    let attempts = records.attempts("col-x").unwrap();
    assert_eq!(attempts.len(), 2);
    let flagged: Vec<i64> = attempts.iter().filter(|a| a.is_pr).map(|a| a.id).collect();
    assert_eq!(flagged, vec![second.attempt_id]);
}

#[test]
fn test_slower_and_equal_times_keep_pr() {
    let records = records();
    let col = climb("col-x", "Col X", 45.0, 6.0);

    let best = records.save_attempt(&col, 540_000, 262, 156).unwrap();
    let slower = records.save_attempt(&col, 600_000, 250, 150).unwrap();
    let equal = records.save_attempt(&col, 540_000, 255, 152).unwrap();

    assert!(!slower.is_pr);
    assert!(!equal.is_pr);
    assert_eq!(records.pr("col-x").unwrap().unwrap().id, best.attempt_id);
    assert_eq!(
        records.attempts("col-x").unwrap().iter().filter(|a| a.is_pr).count(),
        1
    );
}

#[test]
fn test_records_are_per_climb() {
    let records = records();
    records.save_attempt(&climb("col-x", "Col X", 45.0, 6.0), 600_000, 250, 150).unwrap();
    let other = records
        .save_attempt(&climb("col-y", "Col Y", 46.0, 7.0), 900_000, 240, 148)
        .unwrap();

    assert!(!other.is_pr);
    assert_eq!(records.climbs().unwrap().len(), 2);
    assert_eq!(records.recent_attempts(10).unwrap().len(), 2);
    assert_eq!(records.recent_attempts(1).unwrap().len(), 1);
    assert_eq!(records.pr("col-y").unwrap().unwrap().time_ms, 900_000);
}

#[test]
fn test_find_nearby_climb() {
    let records = records();
    records.save_attempt(&climb("col-x", "Col X", 45.0, 6.0), 600_000, 250, 150).unwrap();
    records.save_attempt(&climb("col-y", "Col Y", 45.004, 6.0), 700_000, 250, 150).unwrap();

    let near = records.find_nearby_climb(45.001, 6.0).unwrap().unwrap();
    assert_eq!(near.id, "col-x");
    assert!(records.find_nearby_climb(47.0, 6.0).unwrap().is_none());
}

#[test]
fn test_saved_climbs_dedup_per_occurrence() {
    let saved = SavedClimbs::new();
    let morning = SavedClimbs::occurrence_key("route_0_100", 1_000);
    let repeat = SavedClimbs::occurrence_key("route_0_100", 901_000);

    assert!(saved.try_claim(&morning));
    assert!(!saved.try_claim(&morning));
    assert!(saved.try_claim(&repeat));
    assert_eq!(saved.len(), 2);
}

#[test]
fn test_failed_save_keeps_single_pr() {
    let store = Arc::new(FlakyStore {
        db: Mutex::new(Database::open_in_memory().expect("Failed to create database")),
        fail_writes: AtomicBool::new(false),
    });
    let records = ClimbRecords::new(store.clone());
    let col = climb("col-x", "Col X", 45.0, 6.0);

    let first = records.save_attempt(&col, 600_000, 250, 150).unwrap();
    store.fail_writes.store(true, Ordering::SeqCst);
    assert!(records.save_attempt(&col, 540_000, 262, 156).is_err());

    let flagged: Vec<i64> = records
        .attempts("col-x")
        .unwrap()
        .iter()
        .filter(|a| a.is_pr)
        .map(|a| a.id)
        .collect();
    assert_eq!(flagged, vec![first.attempt_id]);
}

#[test]
fn test_concurrent_saves_flag_fastest() {
    let db = Arc::new(Mutex::new(Database::open_in_memory().expect("Failed to create database")));
    let col = climb("col-x", "Col X", 45.0, 6.0);

    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let records = ClimbRecords::new(db.clone());
            let col = col.clone();
            std::thread::spawn(move || records.save_attempt(&col, 600_000 - i * 10_000, 250, 150).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let records = ClimbRecords::new(db);
    let attempts = records.attempts("col-x").unwrap();
    assert_eq!(attempts.len(), 8);
    let flagged: Vec<u64> = attempts.iter().filter(|a| a.is_pr).map(|a| a.time_ms).collect();
    assert_eq!(flagged, vec![530_000]);
}
