//! Runtime configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use gaze_arbiter::GazeConfig;
use gaze_models::SensorId;
use tracing::info;

use crate::error::{RuntimeError, RuntimeResult};

/// Runtime configuration, read from `GAZE_*` environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Driver step interval (actuation rate)
    pub tick_interval: Duration,
    /// JSON file with a (partial) `GazeConfig`
    pub config_path: Option<PathBuf>,
    /// Prometheus scrape listener; metrics stay no-ops when unset
    pub metrics_addr: Option<SocketAddr>,
    /// Overrides the RNG seed of the gaze config
    pub seed: Option<u64>,
    /// Overrides the gaze-target store path of the gaze config
    pub target_store: Option<PathBuf>,
    /// Sensors whose camera frames exist at startup (identity placement)
    pub sensors: Vec<SensorId>,
    /// How often a diagnostics snapshot is written; never when unset
    pub diagnostics_interval: Option<Duration>,
    /// Capacity of the inbound event queue
    pub event_queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(20), // 50 Hz
            config_path: None,
            metrics_addr: None,
            seed: None,
            target_store: None,
            sensors: vec![SensorId::from("head")],
            diagnostics_interval: None,
            event_queue_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            tick_interval: Duration::from_millis(
                std::env::var("GAZE_TICK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|ms: &u64| *ms > 0)
                    .unwrap_or(20),
            ),
            config_path: std::env::var("GAZE_CONFIG").ok().map(PathBuf::from),
            metrics_addr: std::env::var("GAZE_METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
            seed: std::env::var("GAZE_SEED").ok().and_then(|s| s.parse().ok()),
            target_store: std::env::var("GAZE_TARGET_STORE").ok().map(PathBuf::from),
            sensors: std::env::var("GAZE_SENSORS")
                .map(|s| parse_sensors(&s))
                .unwrap_or_else(|_| vec![SensorId::from("head")]),
            diagnostics_interval: std::env::var("GAZE_DIAGNOSTICS_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            event_queue_capacity: std::env::var("GAZE_EVENT_QUEUE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1024),
        }
    }

    /// Load the gaze config file (if any) and apply environment overrides.
    pub fn gaze_config(&self) -> RuntimeResult<GazeConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    RuntimeError::config(format!("cannot read {}: {}", path.display(), e))
                })?;
                info!(path = %path.display(), "Loaded gaze config");
                GazeConfig::from_json(&raw)?
            }
            None => GazeConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(path) = &self.target_store {
            config.gaze_target.store_path = Some(path.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

/// Comma-separated sensor list; blanks are skipped.
fn parse_sensors(raw: &str) -> Vec<SensorId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SensorId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_sensors() {
        assert_eq!(
            parse_sensors("head, chest,,"),
            vec![SensorId::from("head"), SensorId::from("chest")]
        );
        assert!(parse_sensors("").is_empty());
    }

    #[test]
    fn test_gaze_config_defaults_without_file() {
        let config = RuntimeConfig {
            seed: Some(4),
            ..RuntimeConfig::default()
        };
        let gaze = config.gaze_config().unwrap();
        assert_eq!(gaze.seed, Some(4));
        assert_eq!(gaze.idle, GazeConfig::default().idle);
    }

    #[test]
    fn test_gaze_config_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"glances": {{"glance_duration_ms": 900}}, "seed": 1}}"#).unwrap();

        let config = RuntimeConfig {
            config_path: Some(file.path().to_path_buf()),
            seed: Some(99),
            target_store: Some(PathBuf::from("/tmp/gaze-targets.json")),
            ..RuntimeConfig::default()
        };
        let gaze = config.gaze_config().unwrap();
        assert_eq!(gaze.glances.glance_duration_ms, 900);
        assert_eq!(gaze.seed, Some(99));
        assert_eq!(
            gaze.gaze_target.store_path,
            Some(PathBuf::from("/tmp/gaze-targets.json"))
        );
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let config = RuntimeConfig {
            config_path: Some(PathBuf::from("/nonexistent/gaze.json")),
            ..RuntimeConfig::default()
        };
        assert!(matches!(config.gaze_config(), Err(RuntimeError::Config(_))));
    }
}
