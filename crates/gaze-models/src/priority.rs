//! Contributor priority classes and slot handles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Priority of a contributor within a topic, ordered low to high.
///
/// Priority belongs to the contributor, not to individual candidates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    /// Idle and body look-around
    #[default]
    Exploration,
    /// Face and camera object tracking
    Perception,
    /// Sound direction-of-arrival
    Sound,
    /// Short diversions
    Glance,
    /// Recalled named gaze targets
    GazeTarget,
    /// Operator driven (telepresence)
    Override,
}

impl PriorityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityClass::Exploration => "exploration",
            PriorityClass::Perception => "perception",
            PriorityClass::Sound => "sound",
            PriorityClass::Glance => "glance",
            PriorityClass::GazeTarget => "gaze_target",
            PriorityClass::Override => "override",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle to a registered contributor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SlotHandle(pub Uuid);

impl SlotHandle {
    /// Generate a new random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlotHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
