//! Shared fixtures for session tests.

use climbwise::alerts::{Alert, AlertError, AlertKind, AlertSink};
use climbwise::sensors::Sample;
use climbwise::session::{RideSession, SessionDeps};
use climbwise::storage::{AppConfig, Database};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Epoch ms of the first sample.
pub const T0: i64 = 1_700_000_000_000;

/// Collects delivered alerts.
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub fn kinds(&self) -> Vec<AlertKind> {
        self.alerts.lock().unwrap().iter().map(|a| a.kind).collect()
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl AlertSink for RecordingSink {
    fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// ftp 250, 70 kg, cp 238, W'max 20 kJ.
pub fn athlete_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.athlete.ftp = 250;
    config.athlete.weight_kg = 70.0;
    config.athlete.cp = 238;
    config.athlete.w_prime_max = 20_000.0;
    config
}

pub fn database() -> Arc<Mutex<Database>> {
    Arc::new(Mutex::new(Database::open_in_memory().expect("Failed to create database")))
}

pub struct Fixture {
    pub session: RideSession,
    pub sink: Arc<RecordingSink>,
    pub config_tx: watch::Sender<AppConfig>,
}

pub fn session(db: &Arc<Mutex<Database>>, config: AppConfig) -> Fixture {
    let sink = Arc::new(RecordingSink::default());
    let (config_tx, config_rx) = watch::channel(config);
    let session = RideSession::new(SessionDeps {
        config: config_rx,
        records: db.clone(),
        checkpoints: db.clone(),
        alerts: sink.clone(),
        runtime: None,
    });
    Fixture {
        session,
        sink,
        config_tx,
    }
}

/// One 1 Hz sample, `second` seconds after [`T0`].
pub fn sample(second: i64, distance_m: f64, altitude_m: f64, grade_percent: f64, power_watts: u16) -> Sample {
    Sample {
        power_watts,
        heart_rate_bpm: 150,
        cadence_rpm: 80,
        speed_mps: 4.0,
        altitude_m,
        grade_percent,
        distance_m,
        latitude: 45.0,
        longitude: 6.0,
        timestamp_ms: T0 + second * 1000,
        has_data: true,
    }
}
