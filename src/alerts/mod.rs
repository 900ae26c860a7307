//! Advisory alerts raised during a ride.

pub mod manager;
pub mod types;

pub use manager::AlertManager;
pub use types::{Alert, AlertError, AlertKind, AlertSettings, AlertSink, AlertUrgency, LogSink};
