//! Correspondence grouping
//!
//! Turns a noisy correspondence set into pose hypotheses, one per cluster of
//! mutually consistent matches:
//! - Hough voting over a 3D grid of predicted model reference points
//! - Geometric consistency of pairwise keypoint distances

pub mod hough;
pub mod geometric_consistency;

pub use hough::*;
pub use geometric_consistency::*;

use crate::registration::estimate_rigid_transform;
use recog3d_core::{Correspondence, Error, Point3f, PoseHypothesis, ReferenceFrame, Result};

/// Everything a grouping strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct GroupingInput<'a> {
    pub model_keypoints: &'a [Point3f],
    pub scene_keypoints: &'a [Point3f],
    pub correspondences: &'a [Correspondence],
    /// Frames parallel to `model_keypoints`, if computed
    pub model_frames: Option<&'a [ReferenceFrame]>,
    /// Frames parallel to `scene_keypoints`, if computed
    pub scene_frames: Option<&'a [ReferenceFrame]>,
}

impl<'a> GroupingInput<'a> {
    pub fn new(
        model_keypoints: &'a [Point3f],
        scene_keypoints: &'a [Point3f],
        correspondences: &'a [Correspondence],
    ) -> Self {
        Self {
            model_keypoints,
            scene_keypoints,
            correspondences,
            model_frames: None,
            scene_frames: None,
        }
    }

    pub fn with_frames(mut self, model_frames: &'a [ReferenceFrame], scene_frames: &'a [ReferenceFrame]) -> Self {
        self.model_frames = Some(model_frames);
        self.scene_frames = Some(scene_frames);
        self
    }

    /// Check that every correspondence and frame refers to an existing keypoint
    pub fn validate(&self) -> Result<()> {
        if let Some(c) = self.correspondences.iter().find(|c| {
            c.model_index >= self.model_keypoints.len() || c.scene_index >= self.scene_keypoints.len()
        }) {
            return Err(Error::InvalidData(format!(
                "correspondence ({}, {}) outside {} model / {} scene keypoints",
                c.model_index,
                c.scene_index,
                self.model_keypoints.len(),
                self.scene_keypoints.len()
            )));
        }

        if let Some(frames) = self.model_frames {
            if frames.len() != self.model_keypoints.len() {
                return Err(Error::InvalidData(format!(
                    "{} model frames for {} model keypoints",
                    frames.len(),
                    self.model_keypoints.len()
                )));
            }
        }
        if let Some(frames) = self.scene_frames {
            if frames.len() != self.scene_keypoints.len() {
                return Err(Error::InvalidData(format!(
                    "{} scene frames for {} scene keypoints",
                    frames.len(),
                    self.scene_keypoints.len()
                )));
            }
        }

        Ok(())
    }

    /// Least-squares pose of a set of correspondences
    pub(crate) fn fit(&self, members: Vec<Correspondence>, score: f32) -> Result<PoseHypothesis> {
        let (model, scene): (Vec<Point3f>, Vec<Point3f>) = members
            .iter()
            .map(|c| (self.model_keypoints[c.model_index], self.scene_keypoints[c.scene_index]))
            .unzip();
        let transform = estimate_rigid_transform(&model, &scene)?;
        Ok(PoseHypothesis::new(transform, members, score))
    }
}

/// Clusters correspondences into pose hypotheses
pub trait CorrespondenceGrouping {
    /// Group correspondences; an empty result means the model was not found
    fn group(&self, input: &GroupingInput<'_>) -> Result<Vec<PoseHypothesis>>;
}
