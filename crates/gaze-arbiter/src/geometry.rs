//! Reference-frame adapter.
//!
//! Every frame is a rigid placement relative to the root `robot` frame.
//! Frames attached to sensors can go offline; converting into or out of an
//! offline frame fails with [`GazeError::FrameUnavailable`] instead of
//! producing a stale answer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use gaze_models::{FrameId, FrameTransform, Point3, Position};

use crate::error::{GazeError, GazeResult};

#[derive(Debug, Clone, Copy)]
struct FrameEntry {
    transform: FrameTransform,
    online: bool,
}

/// Table of known frames. The robot frame is always present and online.
#[derive(Debug, Clone, Default)]
pub struct FrameTable {
    frames: HashMap<FrameId, FrameEntry>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a frame. New frames start online.
    pub fn insert(&mut self, frame: FrameId, transform: FrameTransform) {
        let online = self.frames.get(&frame).map(|e| e.online).unwrap_or(true);
        self.frames.insert(frame, FrameEntry { transform, online });
    }

    /// Mark a known frame online or offline. Unknown frames are ignored.
    pub fn set_online(&mut self, frame: &FrameId, online: bool) -> bool {
        match self.frames.get_mut(frame) {
            Some(entry) => {
                entry.online = online;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, frame: &FrameId) {
        self.frames.remove(frame);
    }

    /// Whether points can currently be converted into or out of `frame`.
    pub fn is_available(&self, frame: &FrameId) -> bool {
        frame.is_robot() || self.frames.get(frame).map(|e| e.online).unwrap_or(false)
    }

    fn transform_of(&self, frame: &FrameId) -> GazeResult<FrameTransform> {
        if frame.is_robot() {
            return Ok(FrameTransform::identity());
        }
        match self.frames.get(frame) {
            Some(entry) if entry.online => Ok(entry.transform),
            _ => Err(GazeError::frame_unavailable(frame)),
        }
    }

    /// Convert a point from one frame into another.
    pub fn convert(&self, point: Point3, from: &FrameId, to: &FrameId) -> GazeResult<Point3> {
        let from_tf = self.transform_of(from)?;
        let to_tf = self.transform_of(to)?;
        if from == to {
            return Ok(point);
        }
        let in_robot = to_parent(&from_tf, point);
        Ok(from_parent(&to_tf, in_robot))
    }

    /// Convert a candidate position, lifting planar points with `distance`.
    pub fn convert_position(
        &self,
        position: &Position,
        distance: f64,
        from: &FrameId,
        to: &FrameId,
    ) -> GazeResult<Point3> {
        self.convert(position.to_point3(distance), from, to)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Shared handle to the frame table.
///
/// Held by the registry and every contributor through the gaze context.
#[derive(Debug, Clone, Default)]
pub struct SharedFrames {
    inner: Arc<RwLock<FrameTable>>,
}

impl SharedFrames {
    pub fn new(table: FrameTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FrameTable> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FrameTable> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, frame: FrameId, transform: FrameTransform) {
        self.write().insert(frame, transform);
    }

    pub fn set_online(&self, frame: &FrameId, online: bool) -> bool {
        self.write().set_online(frame, online)
    }

    pub fn is_available(&self, frame: &FrameId) -> bool {
        self.read().is_available(frame)
    }

    pub fn convert(&self, point: Point3, from: &FrameId, to: &FrameId) -> GazeResult<Point3> {
        self.read().convert(point, from, to)
    }

    pub fn convert_position(
        &self,
        position: &Position,
        distance: f64,
        from: &FrameId,
        to: &FrameId,
    ) -> GazeResult<Point3> {
        self.read().convert_position(position, distance, from, to)
    }
}

/// Map a point expressed in the child frame into the robot frame.
fn to_parent(tf: &FrameTransform, p: Point3) -> Point3 {
    let pitched = rotate_pitch(p, tf.pitch_deg.to_radians());
    let yawed = rotate_yaw(pitched, tf.yaw_deg.to_radians());
    yawed + tf.translation
}

/// Map a point expressed in the robot frame into the child frame.
fn from_parent(tf: &FrameTransform, p: Point3) -> Point3 {
    let local = p - tf.translation;
    let unyawed = rotate_yaw(local, -tf.yaw_deg.to_radians());
    rotate_pitch(unyawed, -tf.pitch_deg.to_radians())
}

/// Rotate about +y; positive turns forward toward the left.
fn rotate_yaw(p: Point3, angle: f64) -> Point3 {
    let (s, c) = angle.sin_cos();
    Point3::new(p.x * c - p.z * s, p.y, p.x * s + p.z * c)
}

/// Rotate about +z; positive tilts forward upward.
fn rotate_pitch(p: Point3, angle: f64) -> Point3 {
    let (s, c) = angle.sin_cos();
    Point3::new(p.x * c - p.y * s, p.x * s + p.y * c, p.z)
}

/// Point at `distance` along a horizontal direction, at height `height`.
///
/// Azimuth 0 is straight ahead; positive azimuth is to the left.
pub fn direction_point(azimuth_deg: f64, distance: f64, height: f64) -> Point3 {
    let (s, c) = azimuth_deg.to_radians().sin_cos();
    Point3::new(distance * c, height, distance * s)
}

/// Horizontal azimuth of a point, in degrees.
pub fn azimuth_deg(p: &Point3) -> f64 {
    p.z.atan2(p.x).to_degrees()
}

/// Smallest absolute difference between two angles in degrees.
pub fn angle_between_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Pull secondary points toward `center`; `squeeze = 0` keeps them, `1` collapses them.
pub fn squeeze_toward(points: &[Point3], center: &Point3, squeeze: f64) -> Vec<Point3> {
    let t = squeeze.clamp(0.0, 1.0);
    points.iter().map(|p| p.lerp(center, t)).collect()
}
