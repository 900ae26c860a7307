//! Alert types, settings and the delivery sink.

use serde::{Deserialize, Serialize};

/// Kinds of advisory alert the session can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// W' balance below the configured threshold
    WPrimeLow,
    /// Steep or dangerous section close ahead
    SteepAhead,
    /// Near the top of a route climb
    SummitApproaching,
    /// A new climb became active
    ClimbStarted,
    /// Fastest attempt on a climb
    PersonalRecord,
}

impl AlertKind {
    /// Get all alert kinds
    pub fn all() -> [AlertKind; 5] {
        [
            AlertKind::WPrimeLow,
            AlertKind::SteepAhead,
            AlertKind::SummitApproaching,
            AlertKind::ClimbStarted,
            AlertKind::PersonalRecord,
        ]
    }

    /// Get display name for this alert kind
    pub fn display_name(&self) -> &'static str {
        match self {
            AlertKind::WPrimeLow => "W' Low",
            AlertKind::SteepAhead => "Steep Ahead",
            AlertKind::SummitApproaching => "Summit Approaching",
            AlertKind::ClimbStarted => "Climb Started",
            AlertKind::PersonalRecord => "Personal Record",
        }
    }

    /// Urgent alerts warn about something the rider must react to.
    pub fn urgency(&self) -> AlertUrgency {
        match self {
            AlertKind::WPrimeLow | AlertKind::SteepAhead => AlertUrgency::Urgent,
            _ => AlertUrgency::Normal,
        }
    }

    /// Cooldown applies to every kind except personal records.
    pub fn has_cooldown(&self) -> bool {
        !matches!(self, AlertKind::PersonalRecord)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertUrgency {
    Normal,
    Urgent,
}

/// A delivered alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub detail: String,
    pub urgent: bool,
    /// Host should play a sound with the alert
    pub sound: bool,
}

/// Alert toggles and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Master switch
    pub enabled: bool,
    pub wprime_low: bool,
    pub steep_ahead: bool,
    pub summit_approaching: bool,
    pub climb_started: bool,
    pub personal_record: bool,
    /// Play sounds with alerts
    pub sound: bool,
    /// W' percentage below which WPrimeLow fires
    pub wprime_threshold_percent: f64,
    /// Minimum seconds between alerts of the same kind
    pub cooldown_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            wprime_low: true,
            steep_ahead: true,
            summit_approaching: true,
            climb_started: true,
            personal_record: true,
            sound: true,
            wprime_threshold_percent: 20.0,
            cooldown_secs: 30,
        }
    }
}

impl AlertSettings {
    /// Whether `kind` may fire, taking the master switch into account.
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        self.enabled
            && match kind {
                AlertKind::WPrimeLow => self.wprime_low,
                AlertKind::SteepAhead => self.steep_ahead,
                AlertKind::SummitApproaching => self.summit_approaching,
                AlertKind::ClimbStarted => self.climb_started,
                AlertKind::PersonalRecord => self.personal_record,
            }
    }
}

/// Receives alerts. Implementations render or forward them.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Sink that writes alerts to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        if alert.urgent {
            tracing::warn!("[{}] {}: {}", alert.kind.display_name(), alert.title, alert.detail);
        } else {
            tracing::info!("[{}] {}: {}", alert.kind.display_name(), alert.title, alert.detail);
        }
        Ok(())
    }
}

/// Alert delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Sink unavailable")]
    Unavailable,
}
