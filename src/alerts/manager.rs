//! Alert dispatch with per-kind cooldown.

use super::types::{Alert, AlertKind, AlertSettings, AlertSink};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Filters alerts by settings and cooldown before handing them to the sink.
pub struct AlertManager {
    sink: Arc<dyn AlertSink>,
    /// When each kind last fired
    last_fired: Mutex<HashMap<AlertKind, Instant>>,
}

impl AlertManager {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self {
            sink,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Raise an alert now. Returns true if it was handed to the sink.
    pub fn raise(
        &self,
        kind: AlertKind,
        title: impl Into<String>,
        detail: impl Into<String>,
        settings: &AlertSettings,
    ) -> bool {
        self.raise_at(kind, title, detail, settings, Instant::now())
    }

    /// Raise an alert at `now`.
    pub fn raise_at(
        &self,
        kind: AlertKind,
        title: impl Into<String>,
        detail: impl Into<String>,
        settings: &AlertSettings,
        now: Instant,
    ) -> bool {
        if !settings.is_enabled(kind) {
            return false;
        }

        if kind.has_cooldown() && !self.claim(kind, Duration::from_secs(settings.cooldown_secs), now) {
            tracing::debug!("Alert {:?} on cooldown", kind);
            return false;
        }

        let alert = Alert {
            kind,
            title: title.into(),
            detail: detail.into(),
            urgent: kind.urgency() == super::types::AlertUrgency::Urgent,
            sound: settings.sound,
        };

        tracing::debug!("Raising alert {:?}: {}", kind, alert.title);
        if let Err(e) = self.sink.deliver(&alert) {
            tracing::warn!("Alert delivery failed: {}", e);
        }
        true
    }

    /// Check and set the cooldown in one step.
    fn claim(&self, kind: AlertKind, cooldown: Duration, now: Instant) -> bool {
        let mut last_fired = match self.last_fired.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(last) = last_fired.get(&kind) {
            if now.saturating_duration_since(*last) < cooldown {
                return false;
            }
        }
        last_fired.insert(kind, now);
        true
    }

    /// Check if a kind is on cooldown.
    pub fn is_on_cooldown(&self, kind: AlertKind, settings: &AlertSettings) -> bool {
        let last_fired = match self.last_fired.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        last_fired
            .get(&kind)
            .is_some_and(|last| last.elapsed() < Duration::from_secs(settings.cooldown_secs))
    }

    /// Forget all cooldowns.
    pub fn reset(&self) {
        match self.last_fired.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
