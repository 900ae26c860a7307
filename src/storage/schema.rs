//! Database schema definitions.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Climbs table (static metadata, first seen wins)
CREATE TABLE IF NOT EXISTS climbs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    length_m REAL NOT NULL,
    elevation_m REAL NOT NULL,
    avg_grade REAL NOT NULL,
    max_grade REAL NOT NULL DEFAULT 0,
    category INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_climbs_position ON climbs(latitude, longitude);

-- Attempts table
CREATE TABLE IF NOT EXISTS attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    climb_id TEXT NOT NULL REFERENCES climbs(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    time_ms INTEGER NOT NULL,
    avg_power INTEGER NOT NULL DEFAULT 0,
    avg_hr INTEGER NOT NULL DEFAULT 0,
    is_pr INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_attempts_climb_id ON attempts(climb_id);
CREATE INDEX IF NOT EXISTS idx_attempts_date ON attempts(date);

-- Crash-recovery checkpoint (single row)
CREATE TABLE IF NOT EXISTS checkpoint (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    data_json TEXT NOT NULL,
    saved_at TEXT NOT NULL
);
"#;

/// Schema version tracking table
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
