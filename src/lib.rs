//! Climbwise - climbing intelligence for cycling rides
//!
//! Turns a live stream of cycling sensor samples into W' balance, climb
//! detection, pacing targets, per-climb statistics and tactical lookahead,
//! and keeps personal records per climb in SQLite.

pub mod alerts;
pub mod climbs;
pub mod metrics;
pub mod sensors;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use climbs::{ClimbDetector, ClimbInfo};
pub use metrics::{AnaerobicBalanceModel, PacingCalculator};
pub use sensors::{RideState, Sample, SessionEvent};
pub use session::{RideSession, SessionDeps, SessionRunner};
pub use storage::config::{AppConfig, AthleteProfile};
