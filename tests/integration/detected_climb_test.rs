//! Live-detected climbs through a ride session.

use crate::common::{athlete_config, database, sample, session};
use climbwise::alerts::AlertKind;
use climbwise::climbs::DetectionState;
use climbwise::sensors::{RideState, SessionEvent};
use climbwise::storage::ClimbRecords;

/// 80 s at 8% (320 m, +25.6 m) then `flat_secs` of flat road at 4 m/s.
fn ride_climb_then_flat(fixture: &mut crate::common::Fixture, flat_secs: i64) -> i64 {
    let mut altitude = 100.0;
    let mut distance = 0.0;
    let mut second = 0;

    for _ in 0..80 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(second, distance, altitude, 8.0, 260)));
        second += 1;
        distance += 4.0;
        altitude += 0.32;
    }
    for _ in 0..flat_secs {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(second, distance, altitude, 0.0, 150)));
        second += 1;
        distance += 4.0;
    }
    second
}

#[test]
fn test_detected_climb_saved_once_on_exit() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    ride_climb_then_flat(&mut fixture, 60);

    assert_eq!(*state.detection.borrow(), DetectionState::NotClimbing);
    let saved = state.last_saved.borrow().clone().expect("attempt saved");
    assert!(saved.climb_id.starts_with("detected-"));
    assert_eq!(saved.climb_name, "Climb 1");
    assert!(saved.time_ms >= 80_000);
    assert!(!saved.outcome.is_pr);

    // Ride end must not save the same occurrence again
    fixture.session.handle(SessionEvent::RideState(RideState::Idle));

    let records = ClimbRecords::new(db.clone());
    assert_eq!(records.attempts(&saved.climb_id).unwrap().len(), 1);
    assert_eq!(records.recent_attempts(10).unwrap().len(), 1);

    let attempt = &records.attempts(&saved.climb_id).unwrap()[0];
    assert!(attempt.is_pr);
    // 80 s at 260 W then 41 s at 150 W before the climb ended
    assert!((200..=260).contains(&attempt.avg_power));
    assert_eq!(attempt.avg_hr, 150);

    assert_eq!(fixture.sink.count(AlertKind::ClimbStarted), 1);
}

#[test]
fn test_ride_end_saves_climb_in_progress() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    ride_climb_then_flat(&mut fixture, 0);
    assert_eq!(*state.detection.borrow(), DetectionState::ConfirmedClimb);
    assert!(state.last_saved.borrow().is_none());

    fixture.session.handle(SessionEvent::RideState(RideState::Idle));

    let saved = state.last_saved.borrow().clone().expect("attempt saved at ride end");
    assert_eq!(saved.time_ms, 79_000);
    assert!(state.active_climb.borrow().is_none());
    assert_eq!(state.wprime.borrow().percentage, 100.0);
}

#[test]
fn test_false_alarm_not_saved() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    // Short ramp: 40 m at 8% never confirms
    let mut second = 0;
    let mut distance = 0.0;
    for _ in 0..10 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(second, distance, 100.0 + distance * 0.08, 8.0, 250)));
        second += 1;
        distance += 4.0;
    }
    for _ in 0..60 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(second, distance, 103.2, 0.0, 150)));
        second += 1;
        distance += 4.0;
    }

    assert_eq!(*state.detection.borrow(), DetectionState::NotClimbing);
    assert!(state.active_climb.borrow().is_none());
    assert!(state.last_saved.borrow().is_none());
    assert!(ClimbRecords::new(db).recent_attempts(10).unwrap().is_empty());
}

#[test]
fn test_short_climb_below_minimum_not_saved() {
    let db = database();
    let mut config = athlete_config();
    config.detection.confirm_distance = 50.0;
    config.detection.min_elevation = 3.0;
    let mut fixture = session(&db, config);
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    // 20 s of climbing confirms but is under the 30 s minimum
    let mut distance = 0.0;
    for second in 0..20 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(second, distance, 100.0 + distance * 0.08, 8.0, 250)));
        distance += 4.0;
    }
    assert_eq!(*state.detection.borrow(), DetectionState::ConfirmedClimb);

    fixture.session.handle(SessionEvent::RideState(RideState::Idle));
    assert!(state.last_saved.borrow().is_none());
}

#[test]
fn test_no_save_outside_a_ride() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();

    ride_climb_then_flat(&mut fixture, 60);

    assert!(state.last_saved.borrow().is_none());
    assert!(state.pr_comparison.borrow().is_none());
    assert!(fixture.sink.kinds().is_empty());
}
