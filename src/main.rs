//! Climbwise replay tool.
//!
//! Replays a JSON-lines sample file through a ride session:
//!
//! ```text
//! climbwise <samples.jsonl> [config.toml]
//! ```

use anyhow::{bail, Context};
use climbwise::alerts::LogSink;
use climbwise::sensors::{RideState, Sample, SessionEvent};
use climbwise::session::{RideSession, SessionDeps};
use climbwise::storage::config::{get_config_path, get_data_dir, load_config};
use climbwise::storage::{ClimbRecords, Database};
use climbwise::storage::records::{format_duration_ms, RECENT_ATTEMPTS_LIMIT};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Climbwise v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let Some(samples_path) = args.next().map(PathBuf::from) else {
        bail!("usage: climbwise <samples.jsonl> [config.toml]");
    };
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(get_config_path);

    let config = load_config(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if !config.athlete.is_configured() {
        tracing::warn!("Athlete profile not configured, W' and pacing stay idle");
    }

    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db_path = data_dir.join(&config.storage.database_file);
    let database = Arc::new(Mutex::new(
        Database::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?,
    ));

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let (_config_tx, config_rx) = watch::channel(config);

    let mut session = RideSession::new(SessionDeps {
        config: config_rx,
        records: database.clone(),
        checkpoints: database.clone(),
        alerts: Arc::new(LogSink),
        runtime: Some(runtime.handle().clone()),
    });
    let state = session.state();

    let file = std::fs::File::open(&samples_path)
        .with_context(|| format!("opening {}", samples_path.display()))?;

    session.handle(SessionEvent::RideState(RideState::Recording));

    let mut replayed = 0usize;
    for (line_no, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.context("reading samples")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Sample>(&line) {
            Ok(sample) => {
                session.handle(SessionEvent::Sample(sample));
                replayed += 1;
            }
            Err(e) => tracing::warn!("Skipping line {}: {}", line_no + 1, e),
        }
    }

    let wprime = *state.wprime.borrow();
    tracing::info!(
        "Replayed {} samples, final W' {:.0} J ({:.0}%, {:?})",
        replayed,
        wprime.balance,
        wprime.percentage,
        wprime.status
    );

    session.handle(SessionEvent::RideState(RideState::Idle));

    let records = ClimbRecords::new(database);
    for attempt in records.recent_attempts(RECENT_ATTEMPTS_LIMIT)? {
        tracing::info!(
            "{} {} {}{}",
            attempt.date.format("%Y-%m-%d %H:%M"),
            attempt.climb_id,
            format_duration_ms(attempt.time_ms),
            if attempt.is_pr { " (PR)" } else { "" }
        );
    }

    Ok(())
}
