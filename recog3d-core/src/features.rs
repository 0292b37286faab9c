//! Per-point artifacts computed by the recognition stages.
//!
//! Each artifact is stored in its own array, indexed parallel to the cloud or
//! keypoint set it was computed for. Degenerate entries hold NaN and must be
//! skipped by consumers.

use crate::point::Vector3f;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Length of a SHOT descriptor: 32 spatial volumes x 11 cosine bins
pub const SHOT_DESCRIPTOR_LEN: usize = 352;

/// Unit surface normal with its curvature estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normal {
    pub normal: Vector3f,
    /// Surface variation: smallest eigenvalue over the eigenvalue sum
    pub curvature: f32,
}

impl Normal {
    pub fn new(normal: Vector3f, curvature: f32) -> Self {
        Self { normal, curvature }
    }

    /// Marker for a point whose neighbourhood could not support a plane fit
    pub fn invalid() -> Self {
        Self {
            normal: Vector3f::from_element(f32::NAN),
            curvature: f32::NAN,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.normal.iter().all(|v| v.is_finite()) && self.curvature.is_finite()
    }
}

/// Local orthonormal frame anchored at a keypoint.
///
/// Rows of `axes` are the local x, y and z axes expressed in cloud
/// coordinates, so `axes * v` maps a cloud-space vector into the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    pub axes: Matrix3<f32>,
}

impl ReferenceFrame {
    pub fn from_axes(x: &Vector3f, y: &Vector3f, z: &Vector3f) -> Self {
        Self {
            axes: Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]),
        }
    }

    pub fn invalid() -> Self {
        Self {
            axes: Matrix3::from_element(f32::NAN),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.axes.iter().all(|v| v.is_finite())
    }

    pub fn x_axis(&self) -> Vector3f {
        self.axes.row(0).transpose()
    }

    pub fn y_axis(&self) -> Vector3f {
        self.axes.row(1).transpose()
    }

    pub fn z_axis(&self) -> Vector3f {
        self.axes.row(2).transpose()
    }

    /// Express a cloud-space vector in local coordinates
    pub fn to_local(&self, v: &Vector3f) -> Vector3f {
        self.axes * v
    }

    /// Map a local vector back into cloud coordinates
    pub fn to_global(&self, v: &Vector3f) -> Vector3f {
        self.axes.transpose() * v
    }
}

/// Fixed-length local shape signature of a keypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Unusable descriptor of the given length
    pub fn invalid(len: usize) -> Self {
        Self {
            values: vec![f32::NAN; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(|v| v.is_finite())
    }

    /// Squared Euclidean distance to another descriptor of the same length
    pub fn squared_distance(&self, other: &Descriptor) -> f32 {
        squared_distance(&self.values, &other.values)
    }
}

/// Squared Euclidean distance between two equally long value slices
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_markers_are_not_finite() {
        assert!(!Normal::invalid().is_finite());
        assert!(!ReferenceFrame::invalid().is_finite());
        assert!(!Descriptor::invalid(SHOT_DESCRIPTOR_LEN).is_finite());
        assert!(!Descriptor::new(Vec::new()).is_finite());
    }

    #[test]
    fn test_frame_round_trips_local_coordinates() {
        let frame = ReferenceFrame::from_axes(
            &Vector3f::new(0.0, 1.0, 0.0),
            &Vector3f::new(-1.0, 0.0, 0.0),
            &Vector3f::new(0.0, 0.0, 1.0),
        );
        let v = Vector3f::new(1.0, 2.0, 3.0);
        let local = frame.to_local(&v);
        assert_relative_eq!(local, Vector3f::new(2.0, -1.0, 3.0));
        assert_relative_eq!(frame.to_global(&local), v);
        assert_relative_eq!(frame.z_axis(), Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_descriptor_squared_distance() {
        let a = Descriptor::new(vec![1.0, 0.0, 0.0]);
        let b = Descriptor::new(vec![0.0, 1.0, 0.0]);
        assert_relative_eq!(a.squared_distance(&b), 2.0);
        assert_relative_eq!(a.squared_distance(&a), 0.0);
    }
}
