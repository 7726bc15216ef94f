//! Point and position primitives.
//!
//! Coordinates are metres. The robot frame uses x forward, y up, z left.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point in 3D space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Create a new point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Origin of the frame.
    pub const ORIGIN: Point3 = Point3 { x: 0.0, y: 0.0, z: 0.0 };

    /// Euclidean norm.
    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: &Point3) -> f64 {
        (*self - *other).norm()
    }

    /// Linear interpolation toward `other` (`t = 0` returns `self`).
    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        Point3 {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
            z: self.z + t * (other.z - self.z),
        }
    }

    /// Arithmetic mean of a set of points.
    pub fn centroid(points: &[Point3]) -> Option<Point3> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let sum = points.iter().fold(Point3::ORIGIN, |acc, p| acc + *p);
        Some(Point3::new(sum.x / n, sum.y / n, sum.z / n))
    }

    /// All components finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A point on a 2D surface (screen-space click), in the frame's (y, z) plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point2 {
    pub y: f64,
    pub z: f64,
}

impl Point2 {
    pub const fn new(y: f64, z: f64) -> Self {
        Self { y, z }
    }

    /// Lift into 3D at the given forward distance.
    pub fn lift(&self, distance: f64) -> Point3 {
        Point3::new(distance, self.y, self.z)
    }
}

/// Candidate position: full 3D, or planar when only a screen point is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    Spatial(Point3),
    Planar(Point2),
}

impl Position {
    /// Resolve to 3D, lifting planar points with `distance`.
    pub fn to_point3(&self, distance: f64) -> Point3 {
        match self {
            Position::Spatial(p) => *p,
            Position::Planar(p) => p.lift(distance),
        }
    }

    pub fn is_planar(&self) -> bool {
        matches!(self, Position::Planar(_))
    }
}

impl From<Point3> for Position {
    fn from(p: Point3) -> Self {
        Position::Spatial(p)
    }
}

impl From<Point2> for Position {
    fn from(p: Point2) -> Self {
        Position::Planar(p)
    }
}
