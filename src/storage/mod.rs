//! Storage module for records, checkpoints and configuration.

pub mod checkpoint;
pub mod config;
pub mod database;
pub mod records;
pub mod schema;

pub use checkpoint::{CheckpointData, CheckpointError, CheckpointManager, CheckpointStore};
pub use config::{AppConfig, AthleteProfile, CheckpointSettings, ConfigError, StorageSettings};
pub use database::{Database, DatabaseError, RecordedAttempt};
pub use records::{
    format_duration, format_duration_ms, Attempt, ClimbRecord, ClimbRecords, PrComparison,
    RecordStore, SaveOutcome, SavedClimbs,
};
