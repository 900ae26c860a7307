//! Climb pacing targets.
//!
//! The target is a fraction of FTP chosen by pacing mode, adjusted for
//! gradient and altitude, then clamped into the mode's band. The physics
//! model is used afterwards to estimate the speed that target buys on the
//! current grade.

use crate::climbs::types::ClimbInfo;
use crate::metrics::physics;
use crate::sensors::types::Sample;
use crate::storage::config::AthleteProfile;
use serde::{Deserialize, Serialize};

/// Grades below this get no target (%).
const MIN_PACING_GRADE: f64 = 1.0;
/// Altitude above which the target is reduced (m).
const ALTITUDE_THRESHOLD_M: f64 = 1500.0;
/// Reduction per 1000m above the threshold.
const ALTITUDE_REDUCTION_PER_KM: f64 = 0.065;
/// Largest altitude reduction.
const MAX_ALTITUDE_REDUCTION: f64 = 0.25;
/// Minimum speed for a projected time (m/s).
const MIN_PROJECTION_SPEED: f64 = 0.5;
/// Custom tolerance bounds (W).
const MIN_CUSTOM_TOLERANCE: u16 = 3;
const MAX_CUSTOM_TOLERANCE: u16 = 30;

/// How hard to ride the climb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    /// Sustainable threshold-ish effort
    #[default]
    Steady,
    /// Full gas
    Race,
    /// Get to the top
    Survival,
}

impl PacingMode {
    /// Fraction of FTP before adjustments.
    pub fn base_fraction(&self) -> f64 {
        match self {
            PacingMode::Steady => 0.90,
            PacingMode::Race => 1.00,
            PacingMode::Survival => 0.75,
        }
    }

    /// Allowed target band as fractions of FTP.
    pub fn band(&self) -> (f64, f64) {
        match self {
            PacingMode::Steady => (0.60, 1.05),
            PacingMode::Race => (0.70, 1.15),
            PacingMode::Survival => (0.50, 0.90),
        }
    }
}

impl std::fmt::Display for PacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacingMode::Steady => write!(f, "Steady"),
            PacingMode::Race => write!(f, "Race"),
            PacingMode::Survival => write!(f, "Survival"),
        }
    }
}

/// What the rider should do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingAdvice {
    EaseOff,
    #[default]
    Steady,
    Push,
    Perfect,
}

/// Tolerance presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingTolerance {
    Tight,
    #[default]
    Normal,
    Relaxed,
}

impl PacingTolerance {
    /// Tolerance in watts.
    pub fn watts(&self) -> u16 {
        match self {
            PacingTolerance::Tight => 5,
            PacingTolerance::Normal => 10,
            PacingTolerance::Relaxed => 20,
        }
    }
}

/// Pacing preferences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Pacing mode
    pub mode: PacingMode,
    /// Tolerance preset
    pub tolerance: PacingTolerance,
    /// Custom tolerance overriding the preset (W)
    pub custom_watts: Option<u16>,
}

impl PacingSettings {
    /// Effective tolerance in watts.
    pub fn tolerance_watts(&self) -> u16 {
        match self.custom_watts {
            Some(w) => w.clamp(MIN_CUSTOM_TOLERANCE, MAX_CUSTOM_TOLERANCE),
            None => self.tolerance.watts(),
        }
    }
}

/// Pacing output for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PacingTarget {
    /// Target power (W), 0 = no target
    pub target_power: i32,
    pub range_low: i32,
    pub range_high: i32,
    /// Actual minus target (W)
    pub delta: i32,
    pub advice: PacingAdvice,
    /// Time to the top at current speed (s), 0 when unknown
    pub projected_time_seconds: u64,
    pub mode: PacingMode,
    /// Estimated speed at the target power on this grade (m/s)
    pub target_speed_mps: f64,
}

impl PacingTarget {
    /// True when a target is set.
    pub fn has_target(&self) -> bool {
        self.target_power > 0
    }
}

/// Multiplier rewarding steeper grades, where aero drag matters less.
pub fn gradient_factor(grade_percent: f64) -> f64 {
    if grade_percent >= 10.0 {
        1.05
    } else if grade_percent >= 6.0 {
        1.02
    } else if grade_percent >= 3.0 {
        1.00
    } else {
        0.97
    }
}

/// Multiplier for reduced aerobic capacity at altitude.
pub fn altitude_factor(altitude_m: f64) -> f64 {
    if altitude_m <= ALTITUDE_THRESHOLD_M {
        return 1.0;
    }
    let reduction = (altitude_m - ALTITUDE_THRESHOLD_M) / 1000.0 * ALTITUDE_REDUCTION_PER_KM;
    1.0 - reduction.min(MAX_ALTITUDE_REDUCTION)
}

/// Target power (W) for a grade and altitude, or 0 below the pacing grade.
pub fn target_power(ftp: u16, mode: PacingMode, grade_percent: f64, altitude_m: f64) -> i32 {
    if grade_percent < MIN_PACING_GRADE || ftp == 0 {
        return 0;
    }

    let ftp = ftp as f64;
    let raw = ftp * mode.base_fraction() * gradient_factor(grade_percent) * altitude_factor(altitude_m);
    let (low, high) = mode.band();
    raw.clamp(ftp * low, ftp * high).round() as i32
}

/// Advice for a power delta.
pub fn advice_for(delta: i32, tolerance: i32) -> PacingAdvice {
    if delta > tolerance {
        PacingAdvice::EaseOff
    } else if delta < -tolerance {
        PacingAdvice::Push
    } else if delta.abs() * 2 <= tolerance {
        PacingAdvice::Perfect
    } else {
        PacingAdvice::Steady
    }
}

/// Per-sample pacing calculator.
#[derive(Debug, Clone, Default)]
pub struct PacingCalculator {
    profile: AthleteProfile,
    settings: PacingSettings,
    target: PacingTarget,
}

impl PacingCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply athlete parameters.
    pub fn set_profile(&mut self, profile: &AthleteProfile) {
        self.profile = profile.clone();
    }

    /// Apply mode and tolerance.
    pub fn set_settings(&mut self, settings: &PacingSettings) {
        self.settings = settings.clone();
    }

    /// Compute the target for one sample.
    pub fn update(&mut self, sample: &Sample, climb: Option<&ClimbInfo>) -> PacingTarget {
        let mode = self.settings.mode;
        let no_target = PacingTarget {
            mode,
            ..Default::default()
        };

        if !self.profile.is_configured() || !sample.has_data {
            self.target = no_target;
            return self.target;
        }

        let target = target_power(self.profile.ftp, mode, sample.grade_percent, sample.altitude_m);
        if target <= 0 {
            self.target = no_target;
            return self.target;
        }

        let tolerance = self.settings.tolerance_watts() as i32;
        let delta = sample.power_watts as i32 - target;

        let projected_time_seconds = match climb {
            Some(c) if c.is_active && c.distance_to_top_m > 0.0 && sample.speed_mps > MIN_PROJECTION_SPEED => {
                (c.distance_to_top_m / sample.speed_mps) as u64
            }
            _ => 0,
        };

        let target_speed_mps = physics::speed_from_power(
            target as f64,
            self.profile.total_mass_kg(),
            sample.grade_percent,
            self.profile.crr,
            self.profile.cda,
            sample.altitude_m,
        );

        self.target = PacingTarget {
            target_power: target,
            range_low: target - tolerance,
            range_high: target + tolerance,
            delta,
            advice: advice_for(delta, tolerance),
            projected_time_seconds,
            mode,
            target_speed_mps,
        };
        self.target
    }

    /// Latest target.
    pub fn target(&self) -> &PacingTarget {
        &self.target
    }

    /// Clear the latest target.
    pub fn reset(&mut self) {
        self.target = PacingTarget {
            mode: self.settings.mode,
            ..Default::default()
        };
    }
}
