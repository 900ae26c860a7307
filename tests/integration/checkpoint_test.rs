//! W' checkpoints across session restarts.

use crate::common::{athlete_config, database, sample, session};
use climbwise::sensors::{RideState, SessionEvent};
use climbwise::storage::{AppConfig, CheckpointData, CheckpointStore, Database};
use std::sync::{Arc, Mutex};

fn deplete(fixture: &mut crate::common::Fixture) -> f64 {
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));
    for i in 0..30 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(i, i as f64 * 4.0, 100.0, 8.0, 400)));
    }
    fixture.session.balance()
}

#[test]
fn test_pause_checkpoint_restored_by_next_session() {
    let db = database();
    let balance = {
        let mut fixture = session(&db, athlete_config());
        let balance = deplete(&mut fixture);
        fixture.session.handle(SessionEvent::RideState(RideState::Paused));
        balance
    };
    assert!(balance < 20_000.0);

    let fixture = session(&db, athlete_config());
    assert!((fixture.session.balance() - balance).abs() < 1e-6);
    assert!((fixture.session.state().wprime.borrow().balance - balance).abs() < 1e-6);
}

#[test]
fn test_restore_kept_when_profile_arrives_later() {
    let db = database();
    let saved = CheckpointData {
        w_prime_balance: 5_000.0,
        was_recording: true,
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        ..Default::default()
    };
    db.save(&serde_json::to_string(&saved).unwrap()).unwrap();

    let mut fixture = session(&db, AppConfig::default());
    assert_eq!(fixture.session.balance(), 5_000.0);

    fixture.config_tx.send(athlete_config()).unwrap();
    fixture
        .session
        .handle(SessionEvent::Sample(sample(0, 0.0, 100.0, 0.0, 200)));

    assert_eq!(fixture.session.balance(), 5_000.0);
    assert_eq!(fixture.session.state().wprime.borrow().balance, 5_000.0);
}

#[test]
fn test_ride_end_clears_checkpoint() {
    let db = database();
    {
        let mut fixture = session(&db, athlete_config());
        deplete(&mut fixture);
        fixture.session.handle(SessionEvent::RideState(RideState::Paused));
        fixture.session.handle(SessionEvent::RideState(RideState::Idle));
    }

    assert!(CheckpointStore::load(db.as_ref()).unwrap().is_none());
    let fixture = session(&db, athlete_config());
    assert_eq!(fixture.session.balance(), 20_000.0);
}

#[test]
fn test_stale_checkpoint_ignored() {
    let db = database();
    let stale = CheckpointData {
        w_prime_balance: 4_000.0,
        was_recording: true,
        timestamp_ms: chrono::Utc::now().timestamp_millis() - 3 * 60 * 60 * 1000,
        ..Default::default()
    };
    db.save(&serde_json::to_string(&stale).unwrap()).unwrap();

    let fixture = session(&db, athlete_config());
    assert_eq!(fixture.session.balance(), 20_000.0);
    assert!(CheckpointStore::load(db.as_ref()).unwrap().is_none());
}

#[test]
fn test_emergency_checkpoint_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("climbwise.db");

    let balance = {
        let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
        let mut fixture = session(&db, athlete_config());
        let balance = deplete(&mut fixture);
        fixture.session.emergency_shutdown();
        balance
    };

    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let fixture = session(&db, athlete_config());
    assert!((fixture.session.balance() - balance).abs() < 1e-6);
}

#[test]
fn test_emergency_shutdown_outside_ride_writes_nothing() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    fixture.session.emergency_shutdown();
    assert!(CheckpointStore::load(db.as_ref()).unwrap().is_none());
}
