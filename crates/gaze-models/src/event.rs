//! Bus events delivered to contributors.
//!
//! The bus is external; these are the only message shapes the subsystem
//! understands. Each contributor handles the variants it cares about and
//! ignores the rest.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::frame::{FrameId, SensorId};
use crate::geometry::{Point3, Position};
use crate::time::Timestamp;

/// Inbound event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GazeEvent {
    /// Perception feed update for one sensor
    Perception { sensor: SensorId, feed: PerceptionFeed },

    /// Voice-activity state with direction-of-arrival when available
    VoiceActivity {
        active: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<DirectionOfArrival>,
        time: Timestamp,
    },

    /// Operator clicked a point (2D or 3D)
    TelepresenceClick {
        frame: FrameId,
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance: Option<f64>,
        time: Timestamp,
    },

    /// Operator clicked a world feature; centre extraction depends on shape
    FeatureClick(FeatureClick),

    /// Operator session started or ended
    TelepresenceSession { active: bool },

    /// Named gaze-target command
    GazeTarget { command: GazeTargetCommand },

    /// Active perception sensor switched
    ActiveSensor { sensor: SensorId },

    /// Robot mode flags relevant to gaze
    RobotMode { face_tracking: bool },

    /// A reference frame went offline, came back, or moved
    FrameStatus(FrameStatus),
}

impl GazeEvent {
    /// Short event kind for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            GazeEvent::Perception { .. } => "perception",
            GazeEvent::VoiceActivity { .. } => "voice_activity",
            GazeEvent::TelepresenceClick { .. } => "telepresence_click",
            GazeEvent::FeatureClick(_) => "feature_click",
            GazeEvent::TelepresenceSession { .. } => "telepresence_session",
            GazeEvent::GazeTarget { .. } => "gaze_target",
            GazeEvent::ActiveSensor { .. } => "active_sensor",
            GazeEvent::RobotMode { .. } => "robot_mode",
            GazeEvent::FrameStatus(_) => "frame_status",
        }
    }
}

/// Perception feed state. `Offline` and an empty entity list are distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", content = "entities", rename_all = "snake_case")]
pub enum PerceptionFeed {
    /// Sensor is not delivering data
    Offline,
    /// Current detections (possibly none)
    Entities(Vec<PerceivedEntity>),
}

/// A detected face or object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerceivedEntity {
    /// Stable per-entity id assigned by the tracker
    pub id: u64,
    /// "face", "object", ...
    #[serde(default = "default_entity_kind")]
    pub kind: String,
    /// Detection centre in the sensor frame
    pub position: Point3,
    /// Secondary points (eyes, mouth, corners)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub landmarks: Vec<Point3>,
    pub time: Timestamp,
}

fn default_entity_kind() -> String {
    "face".to_string()
}

impl PerceivedEntity {
    pub fn face(id: u64, position: Point3, time: Timestamp) -> Self {
        Self {
            id,
            kind: default_entity_kind(),
            position,
            landmarks: Vec::new(),
            time,
        }
    }

    pub fn with_landmarks(mut self, landmarks: Vec<Point3>) -> Self {
        self.landmarks = landmarks;
        self
    }
}

/// Direction-of-arrival estimate from the microphone array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DirectionOfArrival {
    /// Horizontal angle in degrees; 0 is straight ahead, positive to the left
    pub azimuth_deg: f64,
}

/// Feature click payload with a shape discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureClick {
    pub frame: FrameId,
    /// "rectangle", "vector", ...
    pub shape: String,
    #[serde(default)]
    pub points: Vec<Point3>,
    pub time: Timestamp,
}

/// Named gaze-target store commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GazeTargetCommand {
    Create {
        name: String,
        frame: FrameId,
        position: Point3,
    },
    Recall {
        name: String,
    },
    /// Clear the active target; with a name, also forget that target
    Clear {
        #[serde(default)]
        name: Option<String>,
    },
}

/// Reference frame availability and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameStatus {
    pub frame: FrameId,
    pub online: bool,
    /// New placement relative to the robot frame, if it changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<FrameTransform>,
}

/// Rigid placement of a frame relative to the robot frame.
///
/// A point `p` in the frame maps to `translation + Ryaw(Rpitch(p))` in the
/// robot frame. Yaw turns about +y (up), pitch about +z (left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameTransform {
    pub translation: Point3,
    #[serde(default)]
    pub yaw_deg: f64,
    #[serde(default)]
    pub pitch_deg: f64,
}

impl FrameTransform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn translated(translation: Point3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perception_offline_vs_empty() {
        let offline: PerceptionFeed = serde_json::from_str(r#"{"status":"offline"}"#).unwrap();
        assert_eq!(offline, PerceptionFeed::Offline);

        let empty: PerceptionFeed = serde_json::from_str(r#"{"status":"entities","entities":[]}"#).unwrap();
        assert_eq!(empty, PerceptionFeed::Entities(vec![]));
    }

    #[test]
    fn test_event_roundtrip_tagging() {
        let json = r#"{
            "type": "gaze_target",
            "command": {"action": "create", "name": "door", "frame": "robot",
                        "position": {"x": 1.0, "y": 0.2, "z": 0.5}}
        }"#;
        let event: GazeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), "gaze_target");
        match event {
            GazeEvent::GazeTarget {
                command: GazeTargetCommand::Create { name, .. },
            } => assert_eq!(name, "door"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_feature_click_parses_unknown_shape() {
        let json = r#"{"type":"feature_click","frame":"robot","shape":"polygon","points":[],"time":0}"#;
        let event: GazeEvent = serde_json::from_str(json).unwrap();
        match event {
            GazeEvent::FeatureClick(click) => assert_eq!(click.shape, "polygon"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_entity_kind_defaults_to_face() {
        let json = r#"{"id":7,"position":{"x":1.0,"y":0.0,"z":0.0},"time":10}"#;
        let entity: PerceivedEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.kind, "face");
        assert!(entity.landmarks.is_empty());
    }
}
