//! Tracing setup and structured tick logging.
//!
//! `LOG_FORMAT=json` switches to JSON lines for production; otherwise
//! human-readable coloured output. Filtering follows `RUST_LOG`. Logs go to
//! stderr because stdout carries the bus.

use gaze_arbiter::{GazeError, WinnerChange};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logger for driver lifecycle and per-contributor faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverLogger;

impl DriverLogger {
    pub fn log_start(&self, contributors: usize) {
        info!(contributors, "Gaze driver started");
    }

    pub fn log_winner(&self, change: &WinnerChange) {
        match &change.winner {
            Some(w) => debug!(
                topic = %change.topic,
                contributor = %w.contributor,
                identifier = %w.candidate.identifier,
                frame = %w.frame,
                "Winner published"
            ),
            None => debug!(topic = %change.topic, "Winner cleared"),
        }
    }

    /// Transient faults (an offline frame) repeat every tick, so they stay at debug.
    pub fn fault_level(error: &GazeError) -> Level {
        if error.is_transient() {
            Level::DEBUG
        } else {
            Level::WARN
        }
    }

    pub fn log_fault(&self, contributor: &str, phase: &str, error: &GazeError) {
        if Self::fault_level(error) == Level::DEBUG {
            debug!(contributor, phase, error = %error, "Contributor skipped, retrying next tick");
        } else {
            warn!(contributor, phase, error = %error, "Contributor fault contained");
        }
    }

    pub fn log_shutdown(&self, faults: u64) {
        info!(faults, "Gaze driver stopped");
    }
}
