//! Crash-recovery checkpoints for the W' balance.
//!
//! A small versioned snapshot is written to a durable store once a minute
//! while recording, immediately on pause, and synchronously on emergency
//! shutdown. On startup a recent checkpoint restores the balance; stale or
//! unreadable ones are discarded.

use crate::metrics::wprime::{AnaerobicBalanceModel, AnaerobicBalanceState};
use crate::storage::config::CheckpointSettings;
use crate::storage::database::{Database, DatabaseError};
use crate::storage::records::lock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Snapshot format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Persisted snapshot. Unknown fields are ignored on load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointData {
    pub version: u32,
    pub w_prime_balance: f64,
    pub was_recording: bool,
    /// Epoch ms when written
    pub timestamp_ms: i64,
}

impl Default for CheckpointData {
    fn default() -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            w_prime_balance: 0.0,
            was_recording: false,
            timestamp_ms: 0,
        }
    }
}

/// Durable storage for the checkpoint payload.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, data_json: &str) -> Result<(), CheckpointError>;
    fn load(&self) -> Result<Option<String>, CheckpointError>;
    fn clear(&self) -> Result<(), CheckpointError>;
}

impl CheckpointStore for Mutex<Database> {
    fn save(&self, data_json: &str) -> Result<(), CheckpointError> {
        Ok(lock(self)?.save_checkpoint(data_json)?)
    }

    fn load(&self) -> Result<Option<String>, CheckpointError> {
        Ok(lock(self)?.load_checkpoint()?)
    }

    fn clear(&self) -> Result<(), CheckpointError> {
        Ok(lock(self)?.clear_checkpoint()?)
    }
}

/// Checkpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Checkpoint is {0}s old")]
    Stale(i64),
}

/// Writes, restores and schedules checkpoints.
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    interval: Duration,
    max_age_ms: i64,
    runtime: Option<Handle>,
    task: Option<JoinHandle<()>>,
}

impl CheckpointManager {
    /// Create a manager. Periodic checkpoints need a tokio runtime handle.
    pub fn new(store: Arc<dyn CheckpointStore>, settings: &CheckpointSettings, runtime: Option<Handle>) -> Self {
        Self {
            store,
            interval: Duration::from_secs(settings.interval_secs.max(1)),
            max_age_ms: (settings.max_age_secs as i64).saturating_mul(1000),
            runtime,
            task: None,
        }
    }

    /// Write a checkpoint now.
    pub fn save(&self, balance: f64, was_recording: bool) -> Result<(), CheckpointError> {
        write_checkpoint(self.store.as_ref(), balance, was_recording)
    }

    /// Blocking write used on the shutdown path. Failures are logged.
    pub fn emergency_save(&self, balance: f64) {
        match self.save(balance, true) {
            Ok(()) => tracing::info!("Emergency checkpoint saved ({:.0} J)", balance),
            Err(e) => tracing::error!("Emergency checkpoint failed: {}", e),
        }
    }

    /// Start writing the latest balance on a fixed interval.
    pub fn start_periodic(&mut self, balance_rx: watch::Receiver<AnaerobicBalanceState>) {
        self.stop_periodic();

        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!("No async runtime, periodic checkpoints disabled");
            return;
        };

        let store = Arc::clone(&self.store);
        let period = self.interval;
        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if balance_rx.has_changed().is_err() {
                    break;
                }
                let balance = balance_rx.borrow().balance;
                match write_checkpoint(store.as_ref(), balance, true) {
                    Ok(()) => tracing::debug!("Checkpoint saved ({:.0} J)", balance),
                    Err(e) => tracing::warn!("Checkpoint save failed: {}", e),
                }
            }
        }));
        tracing::debug!("Periodic checkpoints every {:?}", period);
    }

    /// Stop the periodic task.
    pub fn stop_periodic(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// True while the periodic task runs.
    pub fn is_periodic(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Load the checkpoint if it is readable and younger than the max age.
    pub fn load_valid(&self, now_ms: i64) -> Result<Option<CheckpointData>, CheckpointError> {
        let Some(json) = self.store.load()? else {
            return Ok(None);
        };

        let data: CheckpointData =
            serde_json::from_str(&json).map_err(|e| CheckpointError::ParseError(e.to_string()))?;

        let age_ms = now_ms - data.timestamp_ms;
        if age_ms > self.max_age_ms {
            return Err(CheckpointError::Stale(age_ms / 1000));
        }

        Ok(Some(data))
    }

    /// Restore the balance from a valid checkpoint.
    ///
    /// Stale or corrupt checkpoints count as no checkpoint and are cleared.
    pub fn try_restore(&self, model: &mut AnaerobicBalanceModel) -> bool {
        let now_ms = chrono::Utc::now().timestamp_millis();
        match self.load_valid(now_ms) {
            Ok(Some(data)) => {
                model.restore(data.w_prime_balance);
                tracing::info!(
                    "Restored checkpoint (age {}s)",
                    (now_ms - data.timestamp_ms) / 1000
                );
                true
            }
            Ok(None) => false,
            Err(CheckpointError::Storage(e)) => {
                tracing::warn!("Checkpoint read failed: {}", e);
                false
            }
            Err(e) => {
                tracing::info!("Discarding checkpoint: {}", e);
                self.clear();
                false
            }
        }
    }

    /// Remove the stored checkpoint. Failures are logged.
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Checkpoint clear failed: {}", e);
        }
    }
}

impl Drop for CheckpointManager {
    fn drop(&mut self) {
        self.stop_periodic();
    }
}

fn write_checkpoint(store: &dyn CheckpointStore, balance: f64, was_recording: bool) -> Result<(), CheckpointError> {
    let data = CheckpointData {
        version: CHECKPOINT_VERSION,
        w_prime_balance: balance,
        was_recording,
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    };
    let json = serde_json::to_string(&data).map_err(|e| CheckpointError::SerializeError(e.to_string()))?;
    store.save(&json)
}
