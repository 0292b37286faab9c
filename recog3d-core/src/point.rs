//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A point of an input cloud: a position plus optional RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: Point3f,
    pub color: Option<[u8; 4]>,
}

impl Point {
    /// Create an uncolored point
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Point3f::new(x, y, z),
            color: None,
        }
    }

    /// Create a point with an RGBA color
    pub fn with_color(position: Point3f, color: [u8; 4]) -> Self {
        Self {
            position,
            color: Some(color),
        }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            color: None,
        }
    }
}

impl From<Point3f> for Point {
    fn from(position: Point3f) -> Self {
        Self {
            position,
            color: None,
        }
    }
}

impl From<Point> for Point3f {
    fn from(point: Point) -> Self {
        point.position
    }
}
