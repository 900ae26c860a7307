//! Ride session: wires samples through the engines and owns the ride lifecycle.
//!
//! Per sample the W' model, climb detector, stats tracker and pacing
//! calculator are advanced, the active climb is resolved (route climbs win
//! over detected ones), completed climbs are saved as attempts and alerts
//! are raised. All outputs are published through [`SessionPublisher`].

use crate::alerts::{AlertKind, AlertManager, AlertSettings, AlertSink};
use crate::climbs::tactical::{self, InsightType};
use crate::climbs::{ClimbDetector, ClimbInfo, DetectionState, RouteClimbs};
use crate::metrics::{AnaerobicBalanceModel, ClimbStats, ClimbStatsTracker, PacingCalculator};
use crate::sensors::types::{RideState, RouteDefinition, Sample, SessionEvent};
use crate::session::state::{SavedAttempt, SessionPublisher, SessionState};
use crate::storage::checkpoint::{CheckpointManager, CheckpointStore};
use crate::storage::config::AppConfig;
use crate::storage::records::{format_duration_ms, ClimbRecord, ClimbRecords, RecordStore, SavedClimbs};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Attempts shorter than this are detector flicker, not climbs.
pub const MIN_ATTEMPT_MS: i64 = 30_000;
/// Distance to the top that triggers the summit alert (m).
const SUMMIT_ALERT_DISTANCE_M: f64 = 500.0;
/// Steep-ahead alerts only fire for insights this close (m).
const STEEP_ALERT_DISTANCE_M: f64 = 300.0;

/// Collaborators a session is built from.
pub struct SessionDeps {
    /// Latest settings, read at every sample
    pub config: watch::Receiver<AppConfig>,
    pub records: Arc<dyn RecordStore>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub alerts: Arc<dyn AlertSink>,
    /// Runtime for the checkpoint timer (disabled when absent)
    pub runtime: Option<Handle>,
}

/// The climb currently being timed.
#[derive(Debug, Clone)]
struct TrackedClimb {
    /// Latest live snapshot
    climb: ClimbInfo,
    /// Epoch ms when timing started
    start_ms: i64,
    /// Route climb, or a detected climb that reached confirmation
    confirmed: bool,
}

/// One ride's worth of engines and lifecycle.
pub struct RideSession {
    config: watch::Receiver<AppConfig>,
    alert_settings: AlertSettings,

    wprime: AnaerobicBalanceModel,
    detector: ClimbDetector,
    stats: ClimbStatsTracker,
    pacing: PacingCalculator,
    route: Option<RouteClimbs>,

    records: ClimbRecords,
    saved: SavedClimbs,
    alerts: AlertManager,
    checkpoints: CheckpointManager,
    publisher: SessionPublisher,

    ride_state: RideState,
    /// Between ride start and ride end, including pauses
    ride_active: bool,
    tracked: Option<TrackedClimb>,
    /// Climb the summit alert already fired for
    summit_alerted: Option<String>,
    last_sample: Option<Sample>,
}

impl RideSession {
    /// Build a session and restore W' from a recent checkpoint if there is one.
    pub fn new(deps: SessionDeps) -> Self {
        let mut config = deps.config;
        let initial = config.borrow_and_update().clone();

        let mut session = Self {
            alert_settings: initial.alerts.clone(),
            wprime: AnaerobicBalanceModel::new(),
            detector: ClimbDetector::new(initial.detection.clone()),
            stats: ClimbStatsTracker::new(),
            pacing: PacingCalculator::new(),
            route: None,
            records: ClimbRecords::new(deps.records),
            saved: SavedClimbs::new(),
            alerts: AlertManager::new(deps.alerts),
            checkpoints: CheckpointManager::new(deps.checkpoints, &initial.checkpoint, deps.runtime),
            publisher: SessionPublisher::new(),
            ride_state: RideState::Idle,
            ride_active: false,
            tracked: None,
            summit_alerted: None,
            last_sample: None,
            config,
        };

        session.apply_config(&initial);
        if session.checkpoints.try_restore(&mut session.wprime) {
            session.publisher.wprime(*session.wprime.state());
        }
        session
    }

    /// Read handle for the published outputs.
    pub fn state(&self) -> SessionState {
        self.publisher.subscribe()
    }

    pub fn ride_state(&self) -> RideState {
        self.ride_state
    }

    /// True from ride start until ride end, including pauses.
    pub fn is_ride_active(&self) -> bool {
        self.ride_active
    }

    /// Current W' balance in joules.
    pub fn balance(&self) -> f64 {
        self.wprime.balance()
    }

    /// Apply one host event.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Sample(sample) => self.on_sample(sample),
            SessionEvent::Route(route) => self.load_route(&route),
            SessionEvent::RouteCleared => self.clear_route(),
            SessionEvent::RideState(state) => self.set_ride_state(state),
        }
    }

    /// Translate a route's climbs. They take priority over detection.
    pub fn load_route(&mut self, route: &RouteDefinition) {
        self.route = Some(RouteClimbs::load(route));
    }

    /// Drop the route. The detector owns the active climb again.
    pub fn clear_route(&mut self) {
        if let Some(route) = self.route.take() {
            tracing::info!("Route cleared: {}", route.name());
        }
    }

    /// Process one sensor tick.
    pub fn on_sample(&mut self, sample: Sample) {
        self.refresh_config();
        self.publisher.sample(sample);

        if let Some(state) = self.wprime.update(&sample) {
            self.publisher.wprime(state);
            if state.percentage < self.alert_settings.wprime_threshold_percent {
                self.raise_alert(
                    AlertKind::WPrimeLow,
                    "W' low",
                    format!("{:.0}% remaining", state.percentage),
                );
            }
        }

        let detection = self.detector.update(&sample);
        self.publisher.detection(detection);

        let active = self.resolve_active_climb(&sample);
        let active_now = active.as_ref().filter(|c| c.is_active);

        // Completion is judged against the stats before they reset for the next climb
        let finished_stats = *self.stats.stats();
        let finished = match (&self.tracked, active_now) {
            (Some(tracked), Some(current)) => tracked.climb.id != current.id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if finished {
            if let Some(tracked) = self.tracked.take() {
                self.complete_climb(tracked, sample.timestamp_ms, finished_stats);
            }
        }

        if let Some(stats) = self.stats.update(&sample, active.as_ref()) {
            self.publisher.climb_stats(stats);
        }
        self.publisher.pacing(self.pacing.update(&sample, active.as_ref()));

        match active_now {
            Some(current) => self.track_climb(current, &sample, detection),
            None => {
                self.publisher.insights(Vec::new(), None);
                self.publisher.pr_comparison(None);
            }
        }

        self.publisher.active_climb(active);
        self.last_sample = Some(sample);
    }

    /// Apply a recording-state change from the host.
    pub fn set_ride_state(&mut self, state: RideState) {
        let previous = self.ride_state;
        if previous == state {
            return;
        }

        tracing::debug!("Ride state {} -> {}", previous, state);
        self.ride_state = state;
        self.publisher.ride_state(state);

        match (previous, state) {
            (RideState::Idle, RideState::Recording) => self.start_ride(),
            (RideState::Paused, RideState::Recording) => {
                self.checkpoints.start_periodic(self.publisher.wprime_receiver());
            }
            (RideState::Recording, RideState::Paused) => {
                if let Err(e) = self.checkpoints.save(self.wprime.balance(), true) {
                    tracing::warn!("Pause checkpoint failed: {}", e);
                }
            }
            (_, RideState::Idle) => self.end_ride(),
            _ => {}
        }
    }

    /// Blocking checkpoint for process shutdown.
    pub fn emergency_shutdown(&mut self) {
        self.checkpoints.stop_periodic();
        if self.ride_active {
            self.checkpoints.emergency_save(self.wprime.balance());
        }
    }

    fn start_ride(&mut self) {
        tracing::info!("Ride started");
        self.ride_active = true;
        self.saved.clear();
        self.detector.reset();
        self.stats.reset();
        self.tracked = None;
        self.summit_alerted = None;
        self.checkpoints.start_periodic(self.publisher.wprime_receiver());
    }

    fn end_ride(&mut self) {
        if let (Some(tracked), Some(sample)) = (self.tracked.take(), self.last_sample) {
            let stats = *self.stats.stats();
            self.complete_climb(tracked, sample.timestamp_ms, stats);
        }
        self.ride_active = false;

        self.checkpoints.stop_periodic();
        self.checkpoints.clear();

        let wprime = self.wprime.reset();
        self.detector.reset();
        self.stats.reset();
        self.pacing.reset();
        self.alerts.reset();
        self.summit_alerted = None;

        self.publisher.wprime(wprime);
        self.publisher.detection(self.detector.state());
        self.publisher.climb_stats(*self.stats.stats());
        self.publisher.pacing(*self.pacing.target());
        self.publisher.active_climb(None);
        self.publisher.insights(Vec::new(), None);
        self.publisher.pr_comparison(None);

        tracing::info!("Ride ended ({} climbs saved)", self.saved.len());
    }

    fn refresh_config(&mut self) {
        if !self.config.has_changed().unwrap_or(false) {
            return;
        }
        let config = self.config.borrow_and_update().clone();
        self.apply_config(&config);
        self.publisher.wprime(*self.wprime.state());
    }

    fn apply_config(&mut self, config: &AppConfig) {
        self.wprime.set_profile(&config.athlete);
        self.pacing.set_profile(&config.athlete);
        self.pacing.set_settings(&config.pacing);
        self.stats.set_weight(config.athlete.weight_kg);
        self.detector.update_settings(config.detection.clone());
        self.alert_settings = config.alerts.clone();
    }

    fn resolve_active_climb(&self, sample: &Sample) -> Option<ClimbInfo> {
        match &self.route {
            Some(route) if !route.is_empty() => route.track(sample.distance_m),
            _ => self.detector.climb().cloned(),
        }
    }

    fn track_climb(&mut self, current: &ClimbInfo, sample: &Sample, detection: DetectionState) {
        let confirmed_now = current.is_from_route || detection == DetectionState::ConfirmedClimb;

        let same_climb = self
            .tracked
            .as_ref()
            .is_some_and(|tracked| tracked.climb.id == current.id);

        match self.tracked.as_mut() {
            Some(tracked) if same_climb => {
                tracked.climb = current.clone();
                tracked.confirmed |= confirmed_now;
            }
            _ => {
                let start_ms = self.stats.tracking_start_ms().unwrap_or(sample.timestamp_ms);
                tracing::info!("Tracking climb {}", current.name);
                self.tracked = Some(TrackedClimb {
                    climb: current.clone(),
                    start_ms,
                    confirmed: confirmed_now,
                });
                self.raise_alert(
                    AlertKind::ClimbStarted,
                    current.name.clone(),
                    climb_summary(current),
                );
            }
        }

        let insights = tactical::analyze(current, current.progress);
        let primary = tactical::select_primary(insights.clone());
        if let Some(insight) = &primary {
            let steep = matches!(
                insight.insight_type,
                InsightType::SteepSection | InsightType::DangerousSection
            );
            if steep && insight.distance_ahead_m <= STEEP_ALERT_DISTANCE_M {
                self.raise_alert(
                    AlertKind::SteepAhead,
                    insight.insight_type.label(),
                    format!("{}. {}", insight.description, insight.recommendation),
                );
            }
        }
        self.publisher.insights(insights, primary);

        if current.is_from_route
            && current.distance_to_top_m <= SUMMIT_ALERT_DISTANCE_M
            && self.summit_alerted.as_deref() != Some(current.id.as_str())
        {
            self.summit_alerted = Some(current.id.clone());
            self.raise_alert(
                AlertKind::SummitApproaching,
                "Summit approaching",
                format!("{:.0}m to the top of {}", current.distance_to_top_m, current.name),
            );
        }

        if let Some(tracked) = &self.tracked {
            let elapsed_ms = (sample.timestamp_ms - tracked.start_ms).max(0) as u64;
            match self.records.compare(&current.id, elapsed_ms) {
                Ok(comparison) => self.publisher.pr_comparison(Some(comparison)),
                Err(e) => tracing::warn!("PR lookup failed: {}", e),
            }
        }
    }

    /// Save a finished climb as an attempt, at most once per occurrence.
    fn complete_climb(&mut self, tracked: TrackedClimb, now_ms: i64, stats: ClimbStats) {
        if !self.ride_active {
            tracing::debug!("No ride in progress, {} not saved", tracked.climb.name);
            return;
        }
        if !tracked.confirmed {
            tracing::debug!("{} was never confirmed, not saved", tracked.climb.name);
            return;
        }

        let elapsed_ms = now_ms - tracked.start_ms;
        if elapsed_ms < MIN_ATTEMPT_MS {
            tracing::debug!("{} too short to save ({} ms)", tracked.climb.name, elapsed_ms);
            return;
        }

        let key = SavedClimbs::occurrence_key(&tracked.climb.id, tracked.start_ms);
        if !self.saved.try_claim(&key) {
            tracing::debug!("{} already saved this ride", tracked.climb.name);
            return;
        }

        let record = ClimbRecord::from_climb(&tracked.climb);
        let time_ms = elapsed_ms as u64;
        match self
            .records
            .save_attempt(&record, time_ms, stats.avg_power, stats.avg_hr)
        {
            Ok(outcome) => {
                if outcome.is_pr {
                    self.raise_alert(
                        AlertKind::PersonalRecord,
                        format!("New PR on {}", record.name),
                        format!(
                            "{} ({} faster)",
                            format_duration_ms(time_ms),
                            format_duration_ms(outcome.improved_by_ms)
                        ),
                    );
                }
                self.publisher.last_saved(Some(SavedAttempt {
                    climb_id: record.id,
                    climb_name: record.name,
                    time_ms,
                    outcome,
                }));
            }
            Err(e) => tracing::error!("Failed to save attempt on {}: {}", record.name, e),
        }
    }

    /// Alerts are only raised between ride start and ride end.
    fn raise_alert(&self, kind: AlertKind, title: impl Into<String>, detail: impl Into<String>) {
        if self.ride_active {
            self.alerts.raise(kind, title, detail, &self.alert_settings);
        }
    }
}

fn climb_summary(climb: &ClimbInfo) -> String {
    if climb.is_from_route {
        format!(
            "{:.1}km at {:.1}%, +{:.0}m",
            climb.length_m / 1000.0,
            climb.avg_grade,
            climb.elevation_m
        )
    } else {
        format!("{:.1}% average so far", climb.avg_grade)
    }
}
