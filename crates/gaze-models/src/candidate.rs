//! Look-at candidates proposed by contributors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point3, Position};
use crate::time::Timestamp;

/// One proposed attention point.
///
/// `identifier` only needs to be unique within the owning contributor's slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LookCandidate {
    /// Identifier, unique within the owning contributor
    pub identifier: String,
    /// Position in the owning slot's reference frame
    pub position: Position,
    /// When this candidate was sensed or generated
    pub sample_time: Timestamp,
    /// Preferred viewing distance for direction-only or planar positions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Nearby points the actuator may dart between
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saccade_points: Vec<Point3>,
}

impl LookCandidate {
    /// Create a new candidate.
    pub fn new(identifier: impl Into<String>, position: impl Into<Position>, sample_time: Timestamp) -> Self {
        Self {
            identifier: identifier.into(),
            position: position.into(),
            sample_time,
            distance: None,
            saccade_points: Vec::new(),
        }
    }

    /// Set the preferred viewing distance.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Attach saccade points.
    pub fn with_saccades(mut self, points: Vec<Point3>) -> Self {
        self.saccade_points = points;
        self
    }

    /// Resolve the position to 3D, lifting planar points with the candidate's
    /// own distance or `default_distance`.
    pub fn point3(&self, default_distance: f64) -> Point3 {
        self.position.to_point3(self.distance.unwrap_or(default_distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    #[test]
    fn test_point3_prefers_own_distance() {
        let c = LookCandidate::new("click", Point2::new(0.1, 0.2), Timestamp::ZERO).with_distance(2.0);
        assert_eq!(c.point3(1.0), Point3::new(2.0, 0.1, 0.2));

        let c = LookCandidate::new("click", Point2::new(0.1, 0.2), Timestamp::ZERO);
        assert_eq!(c.point3(1.0), Point3::new(1.0, 0.1, 0.2));
    }

    #[test]
    fn test_optional_fields_skipped() {
        let c = LookCandidate::new("a", Point3::new(1.0, 0.0, 0.0), Timestamp::from_millis(5));
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("distance").is_none());
        assert!(json.get("saccade_points").is_none());
    }
}
