//! Ride session orchestration.

pub mod ride;
pub mod runner;
pub mod state;

pub use ride::{RideSession, SessionDeps, MIN_ATTEMPT_MS};
pub use runner::{SessionHandle, SessionRunner};
pub use state::{SavedAttempt, SessionPublisher, SessionSnapshot, SessionState};
