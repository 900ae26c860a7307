//! Climb detector hysteresis and confirmation.

use climbwise::climbs::{ClimbDetector, DetectionSettings, DetectionState};
use climbwise::sensors::Sample;

struct Road {
    detector: ClimbDetector,
    distance: f64,
    altitude: f64,
    second: i64,
    states: Vec<DetectionState>,
}

impl Road {
    fn new() -> Self {
        Self {
            detector: ClimbDetector::new(DetectionSettings::default()),
            distance: 0.0,
            altitude: 100.0,
            second: 0,
            states: Vec::new(),
        }
    }

    /// Ride `steps` samples, each `step_m` long, at the given reported grade and real gain.
    fn ride(&mut self, steps: usize, step_m: f64, grade: f64, gain_per_step: f64) {
        for _ in 0..steps {
            let state = self.detector.update(&Sample {
                grade_percent: grade,
                altitude_m: self.altitude,
                distance_m: self.distance,
                timestamp_ms: 1_000_000 + self.second * 1000,
                has_data: true,
                ..Default::default()
            });
            self.states.push(state);
            self.distance += step_m;
            self.altitude += gain_per_step;
            self.second += 1;
        }
    }

    fn ever_confirmed(&self) -> bool {
        self.states.contains(&DetectionState::ConfirmedClimb)
    }
}

#[test]
fn test_isolated_spike_returns_to_not_climbing() {
    let mut road = Road::new();
    road.ride(10, 10.0, 0.0, 0.0);
    road.ride(1, 10.0, 30.0, 0.0);
    assert_eq!(road.detector.state(), DetectionState::PotentialClimb);

    road.ride(40, 10.0, 0.0, 0.0);
    assert_eq!(road.detector.state(), DetectionState::NotClimbing);
    assert!(road.detector.climb().is_none());
    assert!(!road.ever_confirmed());
}

#[test]
fn test_distance_without_gain_never_confirms() {
    let mut road = Road::new();
    // 8% reported for 600 m but the altitude never moves
    road.ride(60, 10.0, 8.0, 0.0);
    assert!(!road.ever_confirmed());
    assert_eq!(road.detector.state(), DetectionState::PotentialClimb);
}

#[test]
fn test_gain_without_distance_never_confirms() {
    let mut road = Road::new();
    // 27 m of gain over 90 m, then flat
    road.ride(10, 10.0, 25.0, 3.0);
    road.ride(40, 10.0, 0.0, 0.0);
    assert!(!road.ever_confirmed());
    assert_eq!(road.detector.state(), DetectionState::NotClimbing);
}

#[test]
fn test_sustained_climb_confirms_and_ends() {
    let mut road = Road::new();
    road.ride(30, 10.0, 6.0, 0.6);
    assert_eq!(road.detector.state(), DetectionState::ConfirmedClimb);

    let climb = road.detector.climb().cloned().unwrap();
    assert!(climb.is_active);
    assert!(climb.elevation_m >= 15.0);

    road.ride(30, 10.0, 0.0, 0.0);
    assert_eq!(road.detector.state(), DetectionState::NotClimbing);
    let ended = road.detector.climb().unwrap();
    assert!(!ended.is_active);
    assert_eq!(ended.id, climb.id);
}
