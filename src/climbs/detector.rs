//! Live climb detection from terrain signal alone.
//!
//! States: NotClimbing -> PotentialClimb -> ConfirmedClimb, with both climbing
//! states able to fall back to NotClimbing after enough flat distance.
//!
//! A potential climb is confirmed only when it has covered the confirm
//! distance *and* accumulated the minimum elevation gain. Gain only counts
//! positive altitude deltas so noise cannot cancel out a real ascent.

use crate::climbs::types::{ClimbInfo, DetectionSettings};
use crate::metrics::smoothing::RollingBuffer;
use crate::sensors::types::Sample;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Samples averaged for the smoothed grade
const SMOOTHING_WINDOW: usize = 7;
/// Samples kept in the terrain buffers
const BUFFER_SIZE: usize = SMOOTHING_WINDOW * 2;
/// Flat distance credited when there is no previous distance
const DEFAULT_STEP_M: f64 = 1.0;

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    /// No climb in progress
    #[default]
    NotClimbing,
    /// Grade crossed the start threshold, not yet confirmed
    PotentialClimb,
    /// Distance and elevation thresholds both met
    ConfirmedClimb,
}

impl std::fmt::Display for DetectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionState::NotClimbing => write!(f, "Not climbing"),
            DetectionState::PotentialClimb => write!(f, "Potential climb"),
            DetectionState::ConfirmedClimb => write!(f, "Confirmed climb"),
        }
    }
}

/// Where the current climb started.
#[derive(Debug, Clone, Default)]
struct ClimbStart {
    id: String,
    name: String,
    distance_m: f64,
    altitude_m: f64,
    latitude: f64,
    longitude: f64,
    timestamp_ms: i64,
}

/// Terrain-based climb detector.
pub struct ClimbDetector {
    /// Thresholds
    settings: DetectionSettings,
    /// Current state
    state: DetectionState,
    /// Recent grades
    grades: RollingBuffer,
    /// Recent altitudes
    altitudes: RollingBuffer,
    /// Recent distances
    distances: RollingBuffer,
    /// Start of the climb in progress
    start: ClimbStart,
    /// Consecutive flat distance (m)
    flat_distance_m: f64,
    /// Positive altitude deltas since the climb started (m)
    elevation_gain_m: f64,
    /// Steepest smoothed grade since the climb started (%)
    max_grade: f64,
    /// Climbs started this ride, for naming
    climb_count: u32,
    /// Latest climb snapshot (kept inactive after a confirmed climb ends)
    climb: Option<ClimbInfo>,
}

impl Default for ClimbDetector {
    fn default() -> Self {
        Self::new(DetectionSettings::default())
    }
}

impl ClimbDetector {
    /// Create a detector with the given thresholds.
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            settings,
            state: DetectionState::NotClimbing,
            grades: RollingBuffer::new(BUFFER_SIZE),
            altitudes: RollingBuffer::new(BUFFER_SIZE),
            distances: RollingBuffer::new(BUFFER_SIZE),
            start: ClimbStart::default(),
            flat_distance_m: 0.0,
            elevation_gain_m: 0.0,
            max_grade: 0.0,
            climb_count: 0,
            climb: None,
        }
    }

    /// Swap thresholds without touching detection state.
    pub fn update_settings(&mut self, settings: DetectionSettings) {
        if settings != self.settings {
            tracing::debug!(
                "Detection settings updated: min grade {:.1}%, min gain {:.0}m",
                settings.min_grade,
                settings.min_elevation
            );
            self.settings = settings;
        }
    }

    /// Current thresholds.
    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Process one sample and return the resulting state.
    pub fn update(&mut self, sample: &Sample) -> DetectionState {
        if !sample.has_data {
            return self.state;
        }

        self.grades.push(sample.grade_percent);
        self.altitudes.push(sample.altitude_m);
        self.distances.push(sample.distance_m);

        let smoothed = self
            .grades
            .trailing_average(SMOOTHING_WINDOW)
            .unwrap_or(sample.grade_percent);

        match self.state {
            DetectionState::NotClimbing => {
                if smoothed >= self.settings.min_grade {
                    self.begin_potential(sample, smoothed);
                }
            }
            DetectionState::PotentialClimb => {
                self.accumulate_gain();
                self.max_grade = self.max_grade.max(smoothed);

                if smoothed < self.settings.min_grade_continue() {
                    self.flat_distance_m += self.step_distance(sample);
                    if self.flat_distance_m > self.settings.end_distance {
                        tracing::debug!(
                            "Potential climb at {:.0}m was a false alarm",
                            self.start.distance_m
                        );
                        self.state = DetectionState::NotClimbing;
                        self.climb = None;
                        self.climb_count = self.climb_count.saturating_sub(1);
                        return self.state;
                    }
                } else {
                    self.flat_distance_m = 0.0;
                    let covered = sample.distance_m - self.start.distance_m;
                    if covered >= self.settings.confirm_distance
                        && self.elevation_gain_m >= self.settings.min_elevation
                    {
                        self.state = DetectionState::ConfirmedClimb;
                        tracing::info!(
                            "Climb confirmed: {} after {:.0}m, +{:.0}m",
                            self.start.name,
                            covered,
                            self.elevation_gain_m
                        );
                    }
                }
                self.refresh_climb(sample);
            }
            DetectionState::ConfirmedClimb => {
                self.accumulate_gain();

                if smoothed < self.settings.min_grade_continue() {
                    self.flat_distance_m += self.step_distance(sample);
                    if self.flat_distance_m > self.settings.end_distance {
                        tracing::info!(
                            "Climb ended: {} ({:.0}m, +{:.0}m)",
                            self.start.name,
                            sample.distance_m - self.start.distance_m,
                            self.elevation_gain_m
                        );
                        self.state = DetectionState::NotClimbing;
                        if let Some(climb) = self.climb.as_mut() {
                            climb.is_active = false;
                        }
                    }
                } else {
                    self.flat_distance_m = 0.0;
                    self.max_grade = self.max_grade.max(smoothed);
                    self.refresh_climb(sample);
                }
            }
        }

        self.state
    }

    fn begin_potential(&mut self, sample: &Sample, smoothed: f64) {
        self.climb_count += 1;
        self.start = ClimbStart {
            id: format!("detected-{}", Uuid::new_v4()),
            name: format!("Climb {}", self.climb_count),
            distance_m: sample.distance_m,
            altitude_m: sample.altitude_m,
            latitude: sample.latitude,
            longitude: sample.longitude,
            timestamp_ms: sample.timestamp_ms,
        };
        self.state = DetectionState::PotentialClimb;
        self.flat_distance_m = 0.0;
        self.elevation_gain_m = 0.0;
        self.max_grade = smoothed;

        tracing::debug!(
            "Potential climb at {:.0}m (smoothed grade {:.1}%)",
            sample.distance_m,
            smoothed
        );
        self.refresh_climb(sample);
    }

    fn accumulate_gain(&mut self) {
        if let (Some(current), Some(previous)) = (self.altitudes.last(), self.altitudes.previous()) {
            let delta = current - previous;
            if delta > 0.0 {
                self.elevation_gain_m += delta;
            }
        }
    }

    fn step_distance(&self, sample: &Sample) -> f64 {
        match self.distances.previous() {
            Some(previous) => (sample.distance_m - previous).max(0.0),
            None => DEFAULT_STEP_M,
        }
    }

    fn refresh_climb(&mut self, sample: &Sample) {
        let length = (sample.distance_m - self.start.distance_m).max(0.0);
        let avg_grade = if length > 0.0 {
            self.elevation_gain_m / length * 100.0
        } else {
            0.0
        };

        self.climb = Some(ClimbInfo {
            id: self.start.id.clone(),
            name: self.start.name.clone(),
            category: 0,
            length_m: length,
            elevation_m: self.elevation_gain_m,
            avg_grade,
            max_grade: self.max_grade,
            segments: Vec::new(),
            distance_to_top_m: 0.0,
            elevation_to_top_m: 0.0,
            progress: 0.0,
            is_active: true,
            is_from_route: false,
            start_latitude: self.start.latitude,
            start_longitude: self.start.longitude,
            start_distance_m: self.start.distance_m,
            start_timestamp_ms: self.start.timestamp_ms,
        });
    }

    /// Current state.
    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Latest detected climb, if any.
    pub fn climb(&self) -> Option<&ClimbInfo> {
        self.climb.as_ref()
    }

    /// Return to NotClimbing and clear all buffers.
    pub fn reset(&mut self) {
        self.state = DetectionState::NotClimbing;
        self.grades.reset();
        self.altitudes.reset();
        self.distances.reset();
        self.start = ClimbStart::default();
        self.flat_distance_m = 0.0;
        self.elevation_gain_m = 0.0;
        self.max_grade = 0.0;
        self.climb_count = 0;
        self.climb = None;
    }
}
