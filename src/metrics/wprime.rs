//! W' (W-prime) balance model.
//!
//! Skiba differential model, integrated once per sample:
//! - P > CP: dW' = ((W'max - W') / tau - (P - CP)) * dt
//! - P <= CP: dW' = ((W'max - W') / tau) * dt
//!
//! with a fixed recovery time constant tau = 546 s.

use crate::sensors::types::Sample;
use crate::storage::config::AthleteProfile;
use serde::{Deserialize, Serialize};

/// Skiba recovery time constant in seconds.
pub const TAU_SECONDS: f64 = 546.0;

/// Largest integration step; longer gaps are treated as this many seconds.
const MAX_DT_SECONDS: f64 = 5.0;

/// Balance bucket derived from the percentage remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WPrimeStatus {
    /// > 90%
    #[default]
    Fresh,
    /// 70-90%
    Good,
    /// 50-70%
    Working,
    /// 30-50%
    Depleting,
    /// 10-30%
    Critical,
    /// <= 10%
    Empty,
}

impl WPrimeStatus {
    /// Bucket a balance percentage.
    pub fn from_percentage(pct: f64) -> Self {
        if pct > 90.0 {
            WPrimeStatus::Fresh
        } else if pct > 70.0 {
            WPrimeStatus::Good
        } else if pct > 50.0 {
            WPrimeStatus::Working
        } else if pct > 30.0 {
            WPrimeStatus::Depleting
        } else if pct > 10.0 {
            WPrimeStatus::Critical
        } else {
            WPrimeStatus::Empty
        }
    }
}

impl std::fmt::Display for WPrimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WPrimeStatus::Fresh => write!(f, "Fresh"),
            WPrimeStatus::Good => write!(f, "Good"),
            WPrimeStatus::Working => write!(f, "Working"),
            WPrimeStatus::Depleting => write!(f, "Depleting"),
            WPrimeStatus::Critical => write!(f, "Critical"),
            WPrimeStatus::Empty => write!(f, "Empty"),
        }
    }
}

/// Snapshot of the anaerobic balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnaerobicBalanceState {
    /// Remaining W' in joules, within [0, max_balance]
    pub balance: f64,
    /// W'max in joules
    pub max_balance: f64,
    /// Balance as a percentage of max (0-100)
    pub percentage: f64,
    /// Watts above CP, 0 when at or below CP
    pub depletion_rate: f64,
    /// Recovery watts, 0 when above CP
    pub recovery_rate: f64,
    /// Seconds until empty at the current net depletion
    pub time_to_empty: Option<u64>,
    /// Seconds until full at the current recovery rate
    pub time_to_full: Option<u64>,
    /// Status bucket
    pub status: WPrimeStatus,
}

impl Default for AnaerobicBalanceState {
    fn default() -> Self {
        Self::from_balance(20_000.0, 20_000.0)
    }
}

impl AnaerobicBalanceState {
    /// Build a state with no rates from a balance.
    pub fn from_balance(balance: f64, max_balance: f64) -> Self {
        let percentage = if max_balance > 0.0 {
            (balance / max_balance * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            balance,
            max_balance,
            percentage,
            depletion_rate: 0.0,
            recovery_rate: 0.0,
            time_to_empty: None,
            time_to_full: None,
            status: WPrimeStatus::from_percentage(percentage),
        }
    }
}

/// Integrates W' balance from a power stream.
#[derive(Debug, Clone)]
pub struct AnaerobicBalanceModel {
    /// Current balance in joules
    balance: f64,
    /// W'max in joules
    w_max: f64,
    /// Effective critical power in watts
    cp: f64,
    /// Whether a configured profile has been applied
    profile_loaded: bool,
    /// Balance restored before any profile arrived
    pending_restore: Option<f64>,
    /// Timestamp of the last integrated sample
    last_update_ms: Option<i64>,
    /// Current snapshot
    state: AnaerobicBalanceState,
}

impl Default for AnaerobicBalanceModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AnaerobicBalanceModel {
    /// Create an unconfigured model.
    pub fn new() -> Self {
        Self {
            balance: 20_000.0,
            w_max: 20_000.0,
            cp: 0.0,
            profile_loaded: false,
            pending_restore: None,
            last_update_ms: None,
            state: AnaerobicBalanceState::default(),
        }
    }

    /// Apply athlete parameters.
    ///
    /// The balance starts full the first time a configured profile arrives,
    /// unless a checkpoint was restored first. Later profile changes keep the
    /// balance, clamped to the new max.
    pub fn set_profile(&mut self, profile: &AthleteProfile) {
        if !profile.is_configured() {
            return;
        }

        self.w_max = profile.w_prime_max.max(0.0);
        self.cp = profile.effective_cp();

        if !self.profile_loaded {
            self.balance = match self.pending_restore.take() {
                Some(restored) => restored.clamp(0.0, self.w_max),
                None => self.w_max,
            };
            self.profile_loaded = true;
            self.state = AnaerobicBalanceState::from_balance(self.balance, self.w_max);
        } else if self.balance > self.w_max {
            self.balance = self.w_max;
            self.state = AnaerobicBalanceState::from_balance(self.balance, self.w_max);
        }
    }

    /// Integrate one sample. Returns the updated snapshot if it changed.
    pub fn update(&mut self, sample: &Sample) -> Option<AnaerobicBalanceState> {
        if !self.profile_loaded || self.cp <= 0.0 || self.w_max <= 0.0 {
            return None;
        }
        if !sample.has_data || sample.power_watts == 0 {
            return None;
        }

        let now = sample.timestamp_ms;
        let last = match self.last_update_ms.replace(now) {
            Some(last) => last,
            None => return None,
        };

        let dt = ((now - last) as f64 / 1000.0).clamp(0.0, MAX_DT_SECONDS);
        if dt <= 0.0 {
            return None;
        }

        let power = sample.power_watts as f64;
        let recovery = (self.w_max - self.balance) / TAU_SECONDS;

        let dw = if power > self.cp {
            (recovery - (power - self.cp)) * dt
        } else {
            recovery * dt
        };

        self.balance = (self.balance + dw).clamp(0.0, self.w_max);

        let depletion_rate = if power > self.cp {
            power - self.cp
        } else {
            0.0
        };
        let recovery_rate = if power <= self.cp { recovery } else { 0.0 };

        let time_to_empty = if depletion_rate > recovery_rate && depletion_rate > 0.0 {
            Some((self.balance / (depletion_rate - recovery_rate)) as u64)
        } else {
            None
        };

        let time_to_full = if recovery_rate > 0.0 && self.balance < self.w_max {
            Some(((self.w_max - self.balance) / recovery_rate) as u64)
        } else {
            None
        };

        let percentage = self.balance / self.w_max * 100.0;
        self.state = AnaerobicBalanceState {
            balance: self.balance,
            max_balance: self.w_max,
            percentage,
            depletion_rate,
            recovery_rate,
            time_to_empty,
            time_to_full,
            status: WPrimeStatus::from_percentage(percentage),
        };

        Some(self.state)
    }

    /// Refill the balance and forget the last timestamp.
    pub fn reset(&mut self) -> AnaerobicBalanceState {
        self.balance = self.w_max;
        self.last_update_ms = None;
        self.pending_restore = None;
        self.state = AnaerobicBalanceState::from_balance(self.balance, self.w_max);
        self.state
    }

    /// Restore a checkpointed balance without touching the last timestamp.
    pub fn restore(&mut self, balance: f64) -> AnaerobicBalanceState {
        if !self.profile_loaded {
            self.pending_restore = Some(balance.max(0.0));
        }
        self.balance = balance.clamp(0.0, self.w_max);
        self.state = AnaerobicBalanceState::from_balance(self.balance, self.w_max);
        tracing::info!("Restored W' balance to {:.0} J", self.balance);
        self.state
    }

    /// Current snapshot.
    pub fn state(&self) -> &AnaerobicBalanceState {
        &self.state
    }

    /// Current balance in joules.
    pub fn balance(&self) -> f64 {
        self.balance
    }
}
