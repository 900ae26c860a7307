//! Published session outputs.
//!
//! Every engine output is a current value on its own `watch` channel, so
//! readers always see a whole snapshot and never a partial update.

use crate::climbs::{ClimbInfo, DetectionState, TacticalInsight};
use crate::metrics::{AnaerobicBalanceState, ClimbStats, PacingTarget};
use crate::sensors::types::{RideState, Sample};
use crate::storage::records::{PrComparison, SaveOutcome};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The last attempt saved during this ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAttempt {
    pub climb_id: String,
    pub climb_name: String,
    pub time_ms: u64,
    pub outcome: SaveOutcome,
}

/// Write side of the published outputs. Owned by the session.
#[derive(Debug)]
pub struct SessionPublisher {
    sample: watch::Sender<Sample>,
    ride_state: watch::Sender<RideState>,
    wprime: watch::Sender<AnaerobicBalanceState>,
    pacing: watch::Sender<PacingTarget>,
    active_climb: watch::Sender<Option<ClimbInfo>>,
    climb_stats: watch::Sender<ClimbStats>,
    detection: watch::Sender<DetectionState>,
    insights: watch::Sender<Vec<TacticalInsight>>,
    primary_insight: watch::Sender<Option<TacticalInsight>>,
    pr_comparison: watch::Sender<Option<PrComparison>>,
    last_saved: watch::Sender<Option<SavedAttempt>>,
}

impl Default for SessionPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionPublisher {
    pub fn new() -> Self {
        Self {
            sample: watch::channel(Sample::default()).0,
            ride_state: watch::channel(RideState::Idle).0,
            wprime: watch::channel(AnaerobicBalanceState::default()).0,
            pacing: watch::channel(PacingTarget::default()).0,
            active_climb: watch::channel(None).0,
            climb_stats: watch::channel(ClimbStats::default()).0,
            detection: watch::channel(DetectionState::NotClimbing).0,
            insights: watch::channel(Vec::new()).0,
            primary_insight: watch::channel(None).0,
            pr_comparison: watch::channel(None).0,
            last_saved: watch::channel(None).0,
        }
    }

    /// Create a read handle.
    pub fn subscribe(&self) -> SessionState {
        SessionState {
            sample: self.sample.subscribe(),
            ride_state: self.ride_state.subscribe(),
            wprime: self.wprime.subscribe(),
            pacing: self.pacing.subscribe(),
            active_climb: self.active_climb.subscribe(),
            climb_stats: self.climb_stats.subscribe(),
            detection: self.detection.subscribe(),
            insights: self.insights.subscribe(),
            primary_insight: self.primary_insight.subscribe(),
            pr_comparison: self.pr_comparison.subscribe(),
            last_saved: self.last_saved.subscribe(),
        }
    }

    /// Receiver for the W' channel, used by the checkpoint timer.
    pub fn wprime_receiver(&self) -> watch::Receiver<AnaerobicBalanceState> {
        self.wprime.subscribe()
    }

    pub fn sample(&self, sample: Sample) {
        self.sample.send_replace(sample);
    }

    pub fn ride_state(&self, state: RideState) {
        self.ride_state.send_replace(state);
    }

    pub fn wprime(&self, state: AnaerobicBalanceState) {
        self.wprime.send_replace(state);
    }

    pub fn pacing(&self, target: PacingTarget) {
        self.pacing.send_replace(target);
    }

    pub fn active_climb(&self, climb: Option<ClimbInfo>) {
        self.active_climb.send_replace(climb);
    }

    pub fn climb_stats(&self, stats: ClimbStats) {
        self.climb_stats.send_replace(stats);
    }

    pub fn detection(&self, state: DetectionState) {
        self.detection.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Publish the insight list and its primary entry together.
    pub fn insights(&self, insights: Vec<TacticalInsight>, primary: Option<TacticalInsight>) {
        self.insights.send_replace(insights);
        self.primary_insight.send_replace(primary);
    }

    pub fn pr_comparison(&self, comparison: Option<PrComparison>) {
        self.pr_comparison.send_replace(comparison);
    }

    pub fn last_saved(&self, saved: Option<SavedAttempt>) {
        self.last_saved.send_replace(saved);
    }
}

/// Read side of the published outputs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub sample: watch::Receiver<Sample>,
    pub ride_state: watch::Receiver<RideState>,
    pub wprime: watch::Receiver<AnaerobicBalanceState>,
    pub pacing: watch::Receiver<PacingTarget>,
    pub active_climb: watch::Receiver<Option<ClimbInfo>>,
    pub climb_stats: watch::Receiver<ClimbStats>,
    pub detection: watch::Receiver<DetectionState>,
    pub insights: watch::Receiver<Vec<TacticalInsight>>,
    pub primary_insight: watch::Receiver<Option<TacticalInsight>>,
    pub pr_comparison: watch::Receiver<Option<PrComparison>>,
    pub last_saved: watch::Receiver<Option<SavedAttempt>>,
}

impl SessionState {
    /// Copy out the current value of every channel.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sample: *self.sample.borrow(),
            ride_state: *self.ride_state.borrow(),
            wprime: *self.wprime.borrow(),
            pacing: *self.pacing.borrow(),
            active_climb: self.active_climb.borrow().clone(),
            climb_stats: *self.climb_stats.borrow(),
            detection: *self.detection.borrow(),
            insights: self.insights.borrow().clone(),
            primary_insight: self.primary_insight.borrow().clone(),
            pr_comparison: *self.pr_comparison.borrow(),
            last_saved: self.last_saved.borrow().clone(),
        }
    }
}

/// Point-in-time copy of all session outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub sample: Sample,
    pub ride_state: RideState,
    pub wprime: AnaerobicBalanceState,
    pub pacing: PacingTarget,
    pub active_climb: Option<ClimbInfo>,
    pub climb_stats: ClimbStats,
    pub detection: DetectionState,
    pub insights: Vec<TacticalInsight>,
    pub primary_insight: Option<TacticalInsight>,
    pub pr_comparison: Option<PrComparison>,
    pub last_saved: Option<SavedAttempt>,
}
