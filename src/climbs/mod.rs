//! Climb model, live detection, route climbs and tactical lookahead.

pub mod detector;
pub mod polyline;
pub mod route;
pub mod tactical;
pub mod types;

pub use detector::{ClimbDetector, DetectionState};
pub use polyline::{ElevationPoint, PolylineError};
pub use route::RouteClimbs;
pub use tactical::{InsightPriority, InsightType, TacticalInsight};
pub use types::{ClimbInfo, ClimbSegment, DetectionSensitivity, DetectionSettings};
