//! Configuration for the gaze contributors.
//!
//! Every tunable range and threshold lives here instead of being scattered
//! through the contributors. All structs deserialize with defaults so a
//! partial JSON file only overrides what it names.

use std::path::PathBuf;
use std::time::Duration;

use gaze_models::{SensorId, Topic};
use serde::{Deserialize, Serialize};

use crate::error::{GazeError, GazeResult};

/// Exploration behaviour (idle and body look-around).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookAroundConfig {
    // === Scan Envelope ===
    /// Vertical extent of the envelope in metres (y, up).
    /// Default: (-0.2, 0.4)
    pub y_range: (f64, f64),

    /// Horizontal extent of the envelope in metres (z, left).
    /// Default: (-1.0, 1.0)
    pub z_range: (f64, f64),

    /// Forward distance of the envelope plane (x).
    /// Default: 2.0
    pub distance: f64,

    // === Zones ===
    /// Zone rows. 1 together with `n_z = 1` means unconstrained sampling.
    /// Default: 2
    pub n_y: usize,

    /// Zone columns.
    /// Default: 4
    pub n_z: usize,

    /// How long a picked zone stays unavailable (milliseconds).
    /// Default: 8000
    pub zone_cooldown_ms: u64,

    // === Timing ===
    /// Delay between point changes, drawn uniformly (milliseconds).
    /// Default: (1500, 4000)
    pub delay_range_ms: (u64, u64),

    // === Body Motion ===
    /// Largest vertical step between consecutive points (metres).
    /// `None` leaves the vertical coordinate unconstrained.
    /// Default: None
    pub max_y_movement: Option<f64>,
}

impl Default for LookAroundConfig {
    fn default() -> Self {
        Self::idle()
    }
}

impl LookAroundConfig {
    /// Eyes wandering while nothing else is going on.
    pub fn idle() -> Self {
        Self {
            y_range: (-0.2, 0.4),
            z_range: (-1.0, 1.0),
            distance: 2.0,
            n_y: 2,
            n_z: 4,
            zone_cooldown_ms: 8000,
            delay_range_ms: (1500, 4000),
            max_y_movement: None,
        }
    }

    /// Slower, wider whole-body orientation with a capped vertical step.
    pub fn body() -> Self {
        Self {
            y_range: (-0.1, 0.3),
            z_range: (-1.5, 1.5),
            distance: 2.5,
            n_y: 1,
            n_z: 3,
            zone_cooldown_ms: 10_000,
            delay_range_ms: (3000, 7000),
            max_y_movement: Some(0.1),
        }
    }

    pub fn zone_cooldown(&self) -> Duration {
        Duration::from_millis(self.zone_cooldown_ms)
    }

    pub fn validate(&self) -> GazeResult<()> {
        check_range("y_range", self.y_range)?;
        check_range("z_range", self.z_range)?;
        check_positive("distance", self.distance)?;
        if self.n_y == 0 || self.n_z == 0 {
            return Err(GazeError::invalid_config("n_y and n_z must be at least 1"));
        }
        check_delay("delay_range_ms", self.delay_range_ms)?;
        if let Some(max) = self.max_y_movement {
            if !max.is_finite() || max < 0.0 {
                return Err(GazeError::invalid_config("max_y_movement must be non-negative"));
            }
        }
        Ok(())
    }
}

/// Short diversions away from a stable target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlanceConfig {
    /// Stable-target time before a glance fires, redrawn after each glance.
    /// Default: (4000, 12000)
    pub delay_range_ms: (u64, u64),

    /// How long a glance holds before it clears.
    /// Default: 600
    pub glance_duration_ms: u64,

    /// Vertical offset from the sensor's neutral axis (metres).
    /// Default: (-0.15, 0.15)
    pub y_offset_range: (f64, f64),

    /// Horizontal offset from the sensor's neutral axis (metres).
    /// Default: (-0.4, 0.4)
    pub z_offset_range: (f64, f64),

    /// Forward distance of the glance point.
    /// Default: 1.5
    pub distance: f64,
}

impl Default for GlanceConfig {
    fn default() -> Self {
        Self {
            delay_range_ms: (4000, 12_000),
            glance_duration_ms: 600,
            y_offset_range: (-0.15, 0.15),
            z_offset_range: (-0.4, 0.4),
            distance: 1.5,
        }
    }
}

impl GlanceConfig {
    pub fn glance_duration(&self) -> Duration {
        Duration::from_millis(self.glance_duration_ms)
    }

    pub fn validate(&self) -> GazeResult<()> {
        check_delay("delay_range_ms", self.delay_range_ms)?;
        check_range("y_offset_range", self.y_offset_range)?;
        check_range("z_offset_range", self.z_offset_range)?;
        check_positive("distance", self.distance)
    }
}

/// Face and camera object tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// How far landmarks are pulled toward the entity centre (0.0-1.0).
    /// Default: 0.5
    pub squeeze: f64,

    /// Candidates older than this are cleared on tick (milliseconds).
    /// Default: 1500
    pub stale_after_ms: u64,

    /// Whether face tracking starts enabled.
    /// Default: true
    pub face_tracking: bool,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            squeeze: 0.5,
            stale_after_ms: 1500,
            face_tracking: true,
        }
    }
}

impl PerceptionConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn validate(&self) -> GazeResult<()> {
        if !(0.0..=1.0).contains(&self.squeeze) {
            return Err(GazeError::invalid_config("squeeze must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Sound direction-of-arrival look-around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Distance of the sound candidate along the arrival direction.
    /// Default: 1.5
    pub distance: f64,

    /// Events closer than this to a remembered source are duplicates (degrees).
    /// Default: 20.0
    pub angle_threshold_deg: f64,

    /// How long a source is remembered (milliseconds).
    /// Default: 5000
    pub cooldown_ms: u64,

    /// Upper bound on remembered sources.
    /// Default: 8
    pub max_history: usize,

    /// Face height used before any face was seen (metres).
    /// Default: 0.3
    pub default_face_height: f64,

    /// EMA weight of a new face height observation (0.0-1.0).
    /// Default: 0.2
    pub face_height_alpha: f64,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            distance: 1.5,
            angle_threshold_deg: 20.0,
            cooldown_ms: 5000,
            max_history: 8,
            default_face_height: 0.3,
            face_height_alpha: 0.2,
        }
    }
}

impl SoundConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn validate(&self) -> GazeResult<()> {
        check_positive("distance", self.distance)?;
        if !(0.0..=180.0).contains(&self.angle_threshold_deg) {
            return Err(GazeError::invalid_config("angle_threshold_deg must be within [0, 180]"));
        }
        if self.max_history == 0 {
            return Err(GazeError::invalid_config("max_history must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.face_height_alpha) {
            return Err(GazeError::invalid_config("face_height_alpha must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Operator-driven look-at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelepresenceConfig {
    /// Distance used for planar clicks that carry none.
    /// Default: 1.5
    pub default_distance: f64,
}

impl Default for TelepresenceConfig {
    fn default() -> Self {
        Self { default_distance: 1.5 }
    }
}

/// Named gaze-target store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeTargetConfig {
    /// JSON file the store is loaded from and saved to.
    pub store_path: Option<PathBuf>,
}

/// Tick periods of the contributors (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Default: 200 (5 Hz)
    pub exploration_ms: u64,
    /// Default: 166 (6 Hz)
    pub glances_ms: u64,
    /// Default: 100 (10 Hz)
    pub perception_ms: u64,
    /// Default: 1000 (1 Hz)
    pub sound_ms: u64,
    /// Event-driven contributors only check their state this often.
    /// Default: 1000
    pub passive_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            exploration_ms: 200,
            glances_ms: 166,
            perception_ms: 100,
            sound_ms: 1000,
            passive_ms: 1000,
        }
    }
}

/// Everything needed to build the standard contributor set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Topic all standard contributors publish on.
    pub topic: Topic,

    /// Sensor active at startup.
    pub initial_sensor: SensorId,

    pub idle: LookAroundConfig,
    pub body: LookAroundConfig,
    pub glances: GlanceConfig,
    pub perception: PerceptionConfig,
    pub sound: SoundConfig,
    pub telepresence: TelepresenceConfig,
    pub gaze_target: GazeTargetConfig,
    pub schedule: ScheduleConfig,

    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            topic: Topic::look(),
            initial_sensor: SensorId::from("head"),
            idle: LookAroundConfig::idle(),
            body: LookAroundConfig::body(),
            glances: GlanceConfig::default(),
            perception: PerceptionConfig::default(),
            sound: SoundConfig::default(),
            telepresence: TelepresenceConfig::default(),
            gaze_target: GazeTargetConfig::default(),
            schedule: ScheduleConfig::default(),
            seed: None,
        }
    }
}

impl GazeConfig {
    pub fn validate(&self) -> GazeResult<()> {
        self.idle.validate()?;
        self.body.validate()?;
        self.glances.validate()?;
        self.perception.validate()?;
        self.sound.validate()?;
        check_positive("telepresence.default_distance", self.telepresence.default_distance)?;
        Ok(())
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> GazeResult<Self> {
        let config: GazeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn check_range(name: &str, (lo, hi): (f64, f64)) -> GazeResult<()> {
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(GazeError::invalid_config(format!("{name} must be a finite (low, high) pair")));
    }
    Ok(())
}

fn check_delay(name: &str, (lo, hi): (u64, u64)) -> GazeResult<()> {
    if lo > hi {
        return Err(GazeError::invalid_config(format!("{name} low bound exceeds high bound")));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> GazeResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GazeError::invalid_config(format!("{name} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GazeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.topic, Topic::look());
        assert_eq!(config.idle.max_y_movement, None);
    }

    #[test]
    fn test_presets() {
        let idle = LookAroundConfig::idle();
        let body = LookAroundConfig::body();
        assert!(idle.validate().is_ok());
        assert!(body.validate().is_ok());
        assert!(body.max_y_movement.is_some());
        assert!(body.delay_range_ms.0 > idle.delay_range_ms.0);
    }

    #[test]
    fn test_invalid_ranges() {
        let mut config = LookAroundConfig::idle();
        config.y_range = (1.0, -1.0);
        assert!(config.validate().is_err());

        let mut config = LookAroundConfig::idle();
        config.n_z = 0;
        assert!(config.validate().is_err());

        let mut sound = SoundConfig::default();
        sound.max_history = 0;
        assert!(sound.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GazeConfig::from_json(r#"{"sound": {"angle_threshold_deg": 30.0}, "seed": 7}"#).unwrap();
        assert_eq!(config.sound.angle_threshold_deg, 30.0);
        assert_eq!(config.sound.cooldown_ms, 5000);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.idle, LookAroundConfig::idle());
    }

    #[test]
    fn test_json_validation_runs() {
        let err = GazeConfig::from_json(r#"{"perception": {"squeeze": 2.0}}"#).unwrap_err();
        assert!(matches!(err, GazeError::InvalidConfig(_)));
    }
}
