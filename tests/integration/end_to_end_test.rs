//! Sustained effort above CP on a steady climb.

use crate::common::{athlete_config, database, sample, session};
use climbwise::metrics::{PacingAdvice, WPrimeStatus};
use climbwise::sensors::{RideState, SessionEvent};

#[test]
fn test_sustained_effort_above_cp() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    assert_eq!(state.wprime.borrow().status, WPrimeStatus::Fresh);

    let mut balances = Vec::new();
    let mut statuses = Vec::new();
    for i in 0..60 {
        let s = sample(i, i as f64 * 4.0, 100.0 + i as f64 * 0.32, 8.0, 280);
        fixture.session.handle(SessionEvent::Sample(s));
        let wprime = *state.wprime.borrow();
        balances.push(wprime.balance);
        statuses.push(wprime.status);
    }

    // First sample only seeds the clock
    for pair in balances[1..].windows(2) {
        assert!(pair[1] < pair[0], "balance did not decline: {:?}", pair);
    }
    assert!(balances.iter().all(|b| (0.0..=20_000.0).contains(b)));

    assert_eq!(statuses[0], WPrimeStatus::Fresh);
    let last = *statuses.last().unwrap();
    assert!(matches!(last, WPrimeStatus::Good | WPrimeStatus::Working));
    let first_good = statuses.iter().position(|s| *s != WPrimeStatus::Fresh).unwrap();
    assert!(statuses[first_good..].iter().all(|s| *s != WPrimeStatus::Fresh));

    let pacing = *state.pacing.borrow();
    assert!(pacing.has_target());
    assert!(pacing.delta > 10);
    assert_eq!(pacing.advice, PacingAdvice::EaseOff);

    let wprime = *state.wprime.borrow();
    assert!(wprime.time_to_empty.is_some());
    assert!(wprime.time_to_full.is_none());
}

#[test]
fn test_flat_riding_has_no_pacing_target() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();

    for i in 0..10 {
        let s = sample(i, i as f64 * 8.0, 50.0, 0.5, 300);
        fixture.session.handle(SessionEvent::Sample(s));
        assert_eq!(state.pacing.borrow().target_power, 0);
    }
}

#[test]
fn test_unconfigured_profile_is_idle() {
    let db = database();
    let mut fixture = session(&db, Default::default());
    let state = fixture.session.state();

    for i in 0..10 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(i, i as f64 * 4.0, 100.0, 8.0, 400)));
    }

    assert_eq!(state.wprime.borrow().balance, 20_000.0);
    assert_eq!(state.pacing.borrow().target_power, 0);
    assert!(!state.climb_stats.borrow().is_tracking);
}

#[test]
fn test_config_hot_reload() {
    let db = database();
    let mut fixture = session(&db, athlete_config());
    let state = fixture.session.state();

    fixture
        .session
        .handle(SessionEvent::Sample(sample(0, 0.0, 100.0, 8.0, 250)));
    let steady = state.pacing.borrow().target_power;

    let mut race = athlete_config();
    race.pacing.mode = climbwise::metrics::PacingMode::Race;
    fixture.config_tx.send_replace(race);

    fixture
        .session
        .handle(SessionEvent::Sample(sample(1, 4.0, 100.3, 8.0, 250)));
    let raced = state.pacing.borrow().target_power;

    assert!(raced > steady, "race {} vs steady {}", raced, steady);
}

#[test]
fn test_wprime_low_alert_respects_cooldown() {
    let db = database();
    let mut config = athlete_config();
    config.athlete.w_prime_max = 2_000.0;
    let mut fixture = session(&db, config);
    fixture.session.handle(SessionEvent::RideState(RideState::Recording));

    for i in 0..20 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(i, i as f64 * 4.0, 100.0, 8.0, 500)));
    }

    assert_eq!(fixture.sink.count(climbwise::alerts::AlertKind::WPrimeLow), 1);
}

#[test]
fn test_no_alerts_outside_a_ride() {
    let db = database();
    let mut config = athlete_config();
    config.athlete.w_prime_max = 2_000.0;
    let mut fixture = session(&db, config);

    for i in 0..20 {
        fixture
            .session
            .handle(SessionEvent::Sample(sample(i, i as f64 * 4.0, 100.0, 8.0, 500)));
    }

    assert!(fixture.session.state().wprime.borrow().percentage < 20.0);
    assert!(fixture.sink.kinds().is_empty());
}
