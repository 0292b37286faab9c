//! Model-scene keypoint matches and the pose hypotheses built from them

use crate::point::{Point3f, Vector3f};
use nalgebra::{Isometry3, Matrix3};
use serde::{Deserialize, Serialize};

/// A proposed match between a model keypoint and a scene keypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub model_index: usize,
    pub scene_index: usize,
    /// Squared Euclidean distance between the two descriptors
    pub distance: f32,
}

impl Correspondence {
    pub fn new(model_index: usize, scene_index: usize, distance: f32) -> Self {
        Self {
            model_index,
            scene_index,
            distance,
        }
    }
}

/// One detected instance of the model in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseHypothesis {
    /// Rigid transform taking model coordinates into scene coordinates
    pub transform: Isometry3<f32>,
    /// Correspondences that support this pose
    pub correspondences: Vec<Correspondence>,
    /// Strategy-specific strength: accumulated votes or cluster size
    pub score: f32,
}

impl PoseHypothesis {
    pub fn new(transform: Isometry3<f32>, correspondences: Vec<Correspondence>, score: f32) -> Self {
        Self {
            transform,
            correspondences,
            score,
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f32> {
        self.transform.rotation.to_rotation_matrix().into_inner()
    }

    pub fn translation(&self) -> Vector3f {
        self.transform.translation.vector
    }

    /// Number of supporting correspondences
    pub fn support(&self) -> usize {
        self.correspondences.len()
    }

    /// Map a model-space point into the scene
    pub fn transform_point(&self, point: &Point3f) -> Point3f {
        self.transform * point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn test_pose_hypothesis_accessors() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3f::z_axis(), std::f32::consts::FRAC_PI_2);
        let transform = Isometry3::from_parts(Translation3::new(1.0, 2.0, 3.0), rotation);
        let hypothesis = PoseHypothesis::new(transform, vec![Correspondence::new(0, 1, 0.01)], 1.0);

        assert_eq!(hypothesis.support(), 1);
        assert_relative_eq!(hypothesis.translation(), Vector3f::new(1.0, 2.0, 3.0));
        assert_relative_eq!(hypothesis.rotation_matrix().determinant(), 1.0, epsilon = 1e-6);

        let moved = hypothesis.transform_point(&Point3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3f::new(1.0, 3.0, 3.0), epsilon = 1e-6);
    }
}
