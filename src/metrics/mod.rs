//! Real-time metric engines: W' balance, pacing, climb statistics.

pub mod climb_stats;
pub mod pacing;
pub mod physics;
pub mod smoothing;
pub mod wprime;

pub use climb_stats::{ClimbStats, ClimbStatsTracker};
pub use pacing::{PacingAdvice, PacingCalculator, PacingMode, PacingSettings, PacingTarget, PacingTolerance};
pub use wprime::{AnaerobicBalanceModel, AnaerobicBalanceState, WPrimeStatus};
