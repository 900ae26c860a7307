//! Values pushed in by the host sensor and navigation source.

pub mod types;

pub use types::{RideState, RouteClimb, RouteDefinition, Sample, SessionEvent};
