//! Reference frame and sensor identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a coordinate frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FrameId(pub String);

impl FrameId {
    /// Root frame every other frame is expressed against.
    pub const ROBOT: &'static str = "robot";

    /// Prefix of frames attached to a perception sensor.
    pub const CAMERA_PREFIX: &'static str = "camera:";

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The root robot frame.
    pub fn robot() -> Self {
        Self(Self::ROBOT.to_string())
    }

    /// Frame attached to the given sensor.
    pub fn for_sensor(sensor: &SensorId) -> Self {
        Self(format!("{}{}", Self::CAMERA_PREFIX, sensor.as_str()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_robot(&self) -> bool {
        self.0 == Self::ROBOT
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FrameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a perception sensor (camera).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SensorId(pub String);

impl SensorId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Neutral frame of this sensor.
    pub fn frame(&self) -> FrameId {
        FrameId::for_sensor(self)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SensorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
