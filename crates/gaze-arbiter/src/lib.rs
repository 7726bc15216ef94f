//! Gaze arbitration for a social robot.
//!
//! Independent contributors (idle and body look-around, glances, face
//! tracking, sound localisation, telepresence, named targets) each propose
//! look-at candidates. The [`ArbitrationRegistry`] merges them per topic into
//! one winner that eye and neck actuation consumes every control tick.
//!
//! # Modules
//!
//! - [`geometry`]: frame table and point conversion between named frames
//! - [`context`]: shared frames and active-sensor selector
//! - [`registry`]: per-topic slots, winner selection, change notification
//! - [`zones`]: scan-envelope partition with cooldown
//! - [`contributors`]: the behaviours themselves
//! - [`config`]: tunables with presets
//! - [`telemetry`]: metrics and diagnostics snapshots

pub mod config;
pub mod context;
pub mod contributors;
pub mod error;
pub mod geometry;
pub mod registry;
pub mod telemetry;
pub mod zones;

pub use config::{
    GazeConfig, GazeTargetConfig, GlanceConfig, LookAroundConfig, PerceptionConfig, ScheduleConfig, SoundConfig,
    TelepresenceConfig,
};
pub use context::{GazeContext, SensorWatch};
pub use contributors::{standard_set, Contributor, Scheduled};
pub use error::{GazeError, GazeResult};
pub use geometry::{FrameTable, SharedFrames};
pub use registry::{ArbitrationRegistry, RegistrySnapshot, WinnerChange};
pub use telemetry::{ContributorDiagnostics, DiagnosticsSnapshot};
