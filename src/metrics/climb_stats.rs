//! Per-climb performance accumulators.
//!
//! Accumulators are keyed on the active climb. Whenever the active climb
//! changes (including to or from no climb) everything restarts.

use crate::climbs::types::ClimbInfo;
use crate::metrics::smoothing::TimeWindow;
use crate::sensors::types::Sample;
use serde::{Deserialize, Serialize};

/// Rolling VAM window (ms).
const VAM_WINDOW_MS: i64 = 60_000;
/// Rolling VAM needs the window to span more than this (s).
const MIN_ROLLING_SPAN_SECS: f64 = 5.0;
/// Overall VAM needs more elapsed time than this (s).
const MIN_OVERALL_SECS: f64 = 10.0;
/// Largest integration step (s).
const MAX_DT_SECONDS: f64 = 5.0;

/// Climb statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimbStats {
    /// VAM over the last minute (m/h)
    pub vam_rolling: i32,
    /// VAM since the climb started (m/h)
    pub vam_overall: i32,
    /// Work done on the climb (kJ)
    pub energy_kj: f64,
    pub elapsed_seconds: u64,
    pub avg_power: u16,
    pub max_power: u16,
    pub avg_hr: u8,
    pub max_hr: u8,
    pub avg_cadence: u8,
    /// Instantaneous power to weight (W/kg)
    pub w_kg: f64,
    pub avg_w_kg: f64,
    /// False when there is no active climb; only `w_kg` is set then
    pub is_tracking: bool,
}

/// Accumulates statistics for the active climb.
#[derive(Debug, Clone)]
pub struct ClimbStatsTracker {
    /// Rider weight in kg (0 = not configured)
    weight_kg: f64,
    /// Climb being tracked
    climb_id: Option<String>,
    /// When tracking of the current climb started
    start_ms: i64,
    /// Altitude when tracking started
    start_altitude: f64,
    /// Last processed timestamp
    last_update_ms: Option<i64>,
    /// Altitudes over the rolling VAM window
    altitude_window: TimeWindow,

    // ========== Accumulators ==========
    energy_joules: f64,
    power_sum: u64,
    power_count: u32,
    max_power: u16,
    hr_sum: u64,
    hr_count: u32,
    max_hr: u8,
    cadence_sum: u64,
    cadence_count: u32,
    w_kg_sum: f64,
    w_kg_count: u32,

    /// Latest snapshot
    stats: ClimbStats,
}

impl Default for ClimbStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ClimbStatsTracker {
    pub fn new() -> Self {
        Self {
            weight_kg: 0.0,
            climb_id: None,
            start_ms: 0,
            start_altitude: 0.0,
            last_update_ms: None,
            altitude_window: TimeWindow::new(VAM_WINDOW_MS),
            energy_joules: 0.0,
            power_sum: 0,
            power_count: 0,
            max_power: 0,
            hr_sum: 0,
            hr_count: 0,
            max_hr: 0,
            cadence_sum: 0,
            cadence_count: 0,
            w_kg_sum: 0.0,
            w_kg_count: 0,
            stats: ClimbStats::default(),
        }
    }

    /// Set rider weight. Zero or negative disables the tracker.
    pub fn set_weight(&mut self, weight_kg: f64) {
        self.weight_kg = weight_kg;
    }

    /// Process one sample against the current climb context.
    ///
    /// Returns `None` when not configured or without live data.
    pub fn update(&mut self, sample: &Sample, climb: Option<&ClimbInfo>) -> Option<ClimbStats> {
        if self.weight_kg <= 0.0 || !sample.has_data || sample.timestamp_ms == 0 {
            return None;
        }

        let now = sample.timestamp_ms;
        let power = sample.power_watts;
        let instant_w_kg = if power > 0 {
            power as f64 / self.weight_kg
        } else {
            0.0
        };

        let active_id = climb.filter(|c| c.is_active).map(|c| c.id.as_str());
        if active_id != self.climb_id.as_deref() {
            self.reset_accumulators();
            self.climb_id = active_id.map(str::to_string);
            if self.climb_id.is_some() {
                self.start_ms = now;
                self.start_altitude = sample.altitude_m;
                tracing::debug!("Tracking stats for climb {:?}", self.climb_id);
            }
            self.last_update_ms = Some(now);
        }

        if self.climb_id.is_none() {
            self.stats = ClimbStats {
                w_kg: instant_w_kg,
                is_tracking: false,
                ..Default::default()
            };
            self.last_update_ms = Some(now);
            return Some(self.stats);
        }

        let dt = self
            .last_update_ms
            .map(|last| ((now - last) as f64 / 1000.0).clamp(0.0, MAX_DT_SECONDS))
            .unwrap_or(0.0);

        if dt > 0.0 && power > 0 {
            self.energy_joules += power as f64 * dt;
        }
        if power > 0 {
            self.power_sum += power as u64;
            self.power_count += 1;
            self.max_power = self.max_power.max(power);
        }
        if sample.heart_rate_bpm > 0 {
            self.hr_sum += sample.heart_rate_bpm as u64;
            self.hr_count += 1;
            self.max_hr = self.max_hr.max(sample.heart_rate_bpm);
        }
        if sample.cadence_rpm > 0 {
            self.cadence_sum += sample.cadence_rpm as u64;
            self.cadence_count += 1;
        }
        if instant_w_kg > 0.0 {
            self.w_kg_sum += instant_w_kg;
            self.w_kg_count += 1;
        }

        self.altitude_window.push(now, sample.altitude_m);
        let vam_rolling = match self.altitude_window.span() {
            Some((secs, gain)) if secs > MIN_ROLLING_SPAN_SECS => (gain.max(0.0) / secs * 3600.0) as i32,
            _ => 0,
        };

        let elapsed_secs = (now - self.start_ms) as f64 / 1000.0;
        let vam_overall = if elapsed_secs > MIN_OVERALL_SECS {
            let gain = (sample.altitude_m - self.start_altitude).max(0.0);
            (gain / elapsed_secs * 3600.0) as i32
        } else {
            0
        };

        self.stats = ClimbStats {
            vam_rolling,
            vam_overall,
            energy_kj: self.energy_joules / 1000.0,
            elapsed_seconds: ((now - self.start_ms).max(0) / 1000) as u64,
            avg_power: average(self.power_sum, self.power_count) as u16,
            max_power: self.max_power,
            avg_hr: average(self.hr_sum, self.hr_count) as u8,
            max_hr: self.max_hr,
            avg_cadence: average(self.cadence_sum, self.cadence_count) as u8,
            w_kg: instant_w_kg,
            avg_w_kg: if self.w_kg_count > 0 {
                self.w_kg_sum / self.w_kg_count as f64
            } else {
                0.0
            },
            is_tracking: true,
        };
        self.last_update_ms = Some(now);

        Some(self.stats)
    }

    /// Id of the climb being tracked.
    pub fn climb_id(&self) -> Option<&str> {
        self.climb_id.as_deref()
    }

    /// Timestamp when tracking of the current climb started.
    pub fn tracking_start_ms(&self) -> Option<i64> {
        self.climb_id.as_ref().map(|_| self.start_ms)
    }

    /// Latest snapshot.
    pub fn stats(&self) -> &ClimbStats {
        &self.stats
    }

    /// Drop the current climb and all accumulators.
    pub fn reset(&mut self) {
        self.reset_accumulators();
        self.climb_id = None;
        self.stats = ClimbStats::default();
    }

    fn reset_accumulators(&mut self) {
        self.altitude_window.reset();
        self.energy_joules = 0.0;
        self.power_sum = 0;
        self.power_count = 0;
        self.max_power = 0;
        self.hr_sum = 0;
        self.hr_count = 0;
        self.max_hr = 0;
        self.cadence_sum = 0;
        self.cadence_count = 0;
        self.w_kg_sum = 0.0;
        self.w_kg_count = 0;
        self.start_ms = 0;
        self.start_altitude = 0.0;
        self.last_update_ms = None;
    }
}

fn average(sum: u64, count: u32) -> u64 {
    if count > 0 {
        sum / count as u64
    } else {
        0
    }
}
