//! Sample and route types produced by the host sensor/navigation source.
//!
//! The core never pulls from the host: every value below is pushed in
//! through a [`SessionEvent`].

use serde::{Deserialize, Serialize};

/// One sensor tick (typically 1 Hz).
///
/// `has_data` stays false until the host has delivered its first real
/// reading; every engine ignores samples without data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    /// Instantaneous power in watts
    pub power_watts: u16,
    /// Heart rate in bpm
    pub heart_rate_bpm: u8,
    /// Cadence in rpm
    pub cadence_rpm: u8,
    /// Speed in m/s
    pub speed_mps: f64,
    /// Altitude in meters
    pub altitude_m: f64,
    /// Road gradient in percent
    pub grade_percent: f64,
    /// Distance since ride start in meters (monotonic within a ride)
    pub distance_m: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
    /// False until the first real sample was received
    pub has_data: bool,
}

impl Sample {
    /// Speed converted to km/h.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps * 3.6
    }
}

/// A climb announced by the navigation source for the loaded route.
///
/// Route climbs carry no identity of their own; ids are assigned when the
/// route is translated into [`crate::climbs::ClimbInfo`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteClimb {
    /// Distance from route start where the climb begins (m)
    pub start_distance_m: f64,
    /// Climb length (m)
    pub length_m: f64,
    /// Total elevation gain (m)
    pub total_elevation_m: f64,
    /// Average grade (%)
    pub grade_percent: f64,
}

/// A loaded route: its climbs plus an optional encoded elevation profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Route name, for logging
    pub name: String,
    /// Climbs along the route, in route order
    pub climbs: Vec<RouteClimb>,
    /// Encoded (distance, elevation) polyline covering the whole route
    pub elevation_polyline: Option<String>,
}

/// Recording state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideState {
    /// No ride in progress
    #[default]
    Idle,
    /// Ride is recording
    Recording,
    /// Ride is paused
    Paused,
}

impl std::fmt::Display for RideState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RideState::Idle => write!(f, "Idle"),
            RideState::Recording => write!(f, "Recording"),
            RideState::Paused => write!(f, "Paused"),
        }
    }
}

/// Everything the host can push into a running session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new sensor tick
    Sample(Sample),
    /// A route was loaded
    Route(RouteDefinition),
    /// Navigation went idle
    RouteCleared,
    /// Recording state changed
    RideState(RideState),
}
