//! Session worker thread lifecycle.

use crate::common::{athlete_config, database, sample, session};
use climbwise::sensors::{RideState, SessionEvent};
use climbwise::session::SessionRunner;
use climbwise::storage::CheckpointStore;

#[test]
fn test_stop_drains_events_and_checkpoints() {
    let db = database();
    let fixture = session(&db, athlete_config());
    let mut handle = SessionRunner::spawn(fixture.session).unwrap();
    assert!(handle.is_running());

    assert!(handle.send(SessionEvent::RideState(RideState::Recording)));
    for i in 0..20 {
        assert!(handle.send(SessionEvent::Sample(sample(i, i as f64 * 4.0, 100.0, 8.0, 400))));
    }
    handle.stop();

    let snapshot = handle.state().snapshot();
    assert_eq!(snapshot.ride_state, RideState::Recording);
    assert_eq!(snapshot.sample.timestamp_ms, sample(19, 0.0, 0.0, 0.0, 0).timestamp_ms);
    assert!(snapshot.wprime.balance < 20_000.0);

    // Ride was still recording, so shutdown wrote a checkpoint
    assert!(CheckpointStore::load(db.as_ref()).unwrap().is_some());
    let restored = session(&db, athlete_config());
    assert!((restored.session.balance() - snapshot.wprime.balance).abs() < 1e-6);
}

#[test]
fn test_no_events_after_stop() {
    let db = database();
    let fixture = session(&db, athlete_config());
    let mut handle = SessionRunner::spawn(fixture.session).unwrap();

    handle.stop();
    assert!(!handle.is_running());
    assert!(!handle.send(SessionEvent::RideState(RideState::Recording)));
    assert_eq!(handle.state().snapshot().ride_state, RideState::Idle);

    // Idle at shutdown, nothing to checkpoint
    assert!(CheckpointStore::load(db.as_ref()).unwrap().is_none());
}

#[test]
fn test_drop_stops_worker() {
    let db = database();
    let fixture = session(&db, athlete_config());
    let state = {
        let handle = SessionRunner::spawn(fixture.session).unwrap();
        handle.send(SessionEvent::RideState(RideState::Recording));
        handle.send(SessionEvent::RideState(RideState::Idle));
        handle.state().clone()
    };

    assert_eq!(state.snapshot().ride_state, RideState::Idle);
}
