//! Route climbs through a ride session: priority, PR comparison, alerts.

use crate::common::{athlete_config, database, sample, session, Fixture};
use climbwise::alerts::AlertKind;
use climbwise::sensors::{RideState, RouteClimb, RouteDefinition, SessionEvent};
use climbwise::storage::ClimbRecords;

const CLIMB_ID: &str = "route_0_100";

fn route() -> RouteDefinition {
    RouteDefinition {
        name: "Test loop".to_string(),
        climbs: vec![RouteClimb {
            start_distance_m: 100.0,
            length_m: 1000.0,
            total_elevation_m: 60.0,
            grade_percent: 6.0,
        }],
        elevation_polyline: None,
    }
}

/// Ride 1200 m at `speed` m/s starting `start_second` seconds after T0.
fn ride(fixture: &mut Fixture, start_second: i64, speed: f64) {
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));
    let mut i = 0;
    loop {
        let distance = i as f64 * speed;
        if distance > 1200.0 {
            break;
        }
        let on_climb = (100.0..1100.0).contains(&distance);
        let grade = if on_climb { 6.0 } else { 0.0 };
        let altitude = 200.0 + (distance.clamp(100.0, 1100.0) - 100.0) * 0.06;
        fixture
            .session
            .handle(SessionEvent::Sample(sample(start_second + i, distance, altitude, grade, 240)));
        i += 1;
    }
    fixture.session.handle(SessionEvent::RideState(RideState::Idle));
}

#[test]
fn test_route_climb_preview_then_active() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::Route(route()));
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    fixture
        .session
        .handle(SessionEvent::Sample(sample(0, 0.0, 200.0, 0.0, 200)));
    let preview = state.active_climb.borrow().clone().expect("preview");
    assert!(!preview.is_active);
    assert_eq!(preview.id, CLIMB_ID);
    assert_eq!(preview.name, "Cat 4 1.0km");
    assert!(state.pr_comparison.borrow().is_none());

    fixture
        .session
        .handle(SessionEvent::Sample(sample(1, 500.0, 224.0, 6.0, 240)));
    let active = state.active_climb.borrow().clone().expect("active");
    assert!(active.is_active);
    assert!(active.is_from_route);
    assert!((active.distance_to_top_m - 600.0).abs() < 1e-9);
    assert!((active.progress - 0.4).abs() < 1e-9);
    assert!(state.climb_stats.borrow().is_tracking);
    assert!(!state.pr_comparison.borrow().expect("comparison").has_pr);
}

#[test]
fn test_route_attempts_and_pr() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::Route(route()));

    ride(&mut fixture, 0, 10.0);
    let first = state.last_saved.borrow().clone().expect("first attempt");
    assert_eq!(first.climb_id, CLIMB_ID);
    assert_eq!(first.time_ms, 100_000);
    assert!(!first.outcome.is_pr);
    assert_eq!(first.outcome.improved_by_ms, 0);

    ride(&mut fixture, 10_000, 20.0);
    let second = state.last_saved.borrow().clone().expect("second attempt");
    assert_eq!(second.time_ms, 50_000);
    assert!(second.outcome.is_pr);
    assert_eq!(second.outcome.improved_by_ms, 50_000);

    let records = ClimbRecords::new(db.clone());
    let attempts = records.attempts(CLIMB_ID).unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts.iter().filter(|a| a.is_pr).count(), 1);
    assert_eq!(records.pr(CLIMB_ID).unwrap().unwrap().time_ms, 50_000);

    assert_eq!(fixture.sink.count(AlertKind::PersonalRecord), 1);
    assert_eq!(fixture.sink.count(AlertKind::SummitApproaching), 2);
}

#[test]
fn test_pr_comparison_while_climbing() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::Route(route()));

    ride(&mut fixture, 0, 10.0);

    fixture.session.handle(SessionEvent::RideState(RideState::Recording));
    for (i, distance) in [50.0, 150.0, 250.0, 350.0].into_iter().enumerate() {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(5_000 + i as i64 * 5, distance, 205.0, 6.0, 260)));
    }

    let comparison = state.pr_comparison.borrow().expect("comparison");
    assert!(comparison.has_pr);
    assert_eq!(comparison.pr_time_ms, 100_000);
    assert_eq!(comparison.current_time_ms, 10_000);
    assert!(comparison.is_ahead);
    assert_eq!(comparison.delta_formatted(), "-1m30s");
}

#[test]
fn test_route_cleared_returns_to_detection() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::Route(route()));

    fixture
        .session
        .handle(SessionEvent::Sample(sample(0, 500.0, 224.0, 6.0, 240)));
    assert!(state.active_climb.borrow().as_ref().unwrap().is_from_route);

    fixture.session.handle(SessionEvent::RouteCleared);
    fixture
        .session
        .handle(SessionEvent::Sample(sample(1, 504.0, 224.3, 6.0, 240)));

    let active = state.active_climb.borrow().clone().expect("detected climb");
    assert!(!active.is_from_route);
    assert!(active.id.starts_with("detected-"));
}

#[test]
fn test_empty_route_leaves_detection_in_charge() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::Route(RouteDefinition::default()));

    fixture
        .session
        .handle(SessionEvent::Sample(sample(0, 0.0, 100.0, 8.0, 240)));
    let active = state.active_climb.borrow().clone().expect("detected climb");
    assert!(!active.is_from_route);
}
