//! Hough voting in 3D
//!
//! Every model keypoint stores the vector to the model's keypoint centroid in
//! its own reference frame. A correspondence replays that vector in the frame
//! of the matched scene keypoint, voting for where the model centroid sits in
//! the scene. Votes land in a sparse grid of cubic bins; each dominant bin
//! with enough weight becomes one instance.

use super::{CorrespondenceGrouping, GroupingInput};
use crate::registration::MIN_FIT_PAIRS;
use itertools::Itertools;
use log::debug;
use nalgebra::Matrix3;
use recog3d_core::{Correspondence, Error, Point3f, PoseHypothesis, Result, Vector3f};
use std::collections::BTreeMap;

type BinKey = (i64, i64, i64);

#[derive(Debug, Default)]
struct Bin {
    weight: f32,
    voters: Vec<usize>,
}

/// Hough voting correspondence grouping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughGrouping {
    /// Edge length of a voting bin
    pub bin_size: f32,
    /// Minimum accumulated weight for a bin to become an instance
    pub threshold: f32,
    /// Split each vote trilinearly over the 8 nearest bins
    pub use_interpolation: bool,
}

impl HoughGrouping {
    pub fn new(bin_size: f32, threshold: f32) -> Self {
        Self {
            bin_size,
            threshold,
            use_interpolation: true,
        }
    }

    pub fn with_interpolation(mut self, use_interpolation: bool) -> Self {
        self.use_interpolation = use_interpolation;
        self
    }

    fn cast_vote(&self, bins: &mut BTreeMap<BinKey, Bin>, vote: &Point3f, voter: usize) {
        if !self.use_interpolation {
            let key = (
                (vote.x / self.bin_size).floor() as i64,
                (vote.y / self.bin_size).floor() as i64,
                (vote.z / self.bin_size).floor() as i64,
            );
            let bin = bins.entry(key).or_default();
            bin.weight += 1.0;
            bin.voters.push(voter);
            return;
        }

        // Bin centres sit at (i + 0.5) * bin_size
        let g = vote.coords / self.bin_size - Vector3f::repeat(0.5);
        let base = g.map(f32::floor);
        let frac = g - base;

        for corner in 0..8 {
            let offset = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1];
            let mut weight = 1.0;
            for axis in 0..3 {
                weight *= if offset[axis] == 1 { frac[axis] } else { 1.0 - frac[axis] };
            }
            if weight <= 0.0 {
                continue;
            }
            let key = (
                base.x as i64 + offset[0] as i64,
                base.y as i64 + offset[1] as i64,
                base.z as i64 + offset[2] as i64,
            );
            let bin = bins.entry(key).or_default();
            bin.weight += weight;
            bin.voters.push(voter);
        }
    }

    /// Bins at or above threshold that no neighbour outweighs; equal
    /// neighbours defer to the lower key
    fn peaks<'b>(&self, bins: &'b BTreeMap<BinKey, Bin>) -> Vec<(&'b BinKey, &'b Bin)> {
        bins.iter()
            .filter(|(_, bin)| bin.weight >= self.threshold)
            .filter(|(key, bin)| {
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            if (dx, dy, dz) == (0, 0, 0) {
                                continue;
                            }
                            let neighbor_key = (key.0 + dx, key.1 + dy, key.2 + dz);
                            if let Some(neighbor) = bins.get(&neighbor_key) {
                                if neighbor.weight > bin.weight
                                    || (neighbor.weight == bin.weight && neighbor_key < **key)
                                {
                                    return false;
                                }
                            }
                        }
                    }
                }
                true
            })
            .collect()
    }
}

impl CorrespondenceGrouping for HoughGrouping {
    fn group(&self, input: &GroupingInput<'_>) -> Result<Vec<PoseHypothesis>> {
        if !(self.bin_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "Hough bin size must be positive, got {}",
                self.bin_size
            )));
        }
        if !(self.threshold > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "Hough threshold must be positive, got {}",
                self.threshold
            )));
        }
        let (model_frames, scene_frames) = match (input.model_frames, input.scene_frames) {
            (Some(model), Some(scene)) => (model, scene),
            _ => {
                return Err(Error::InvalidConfig(
                    "Hough grouping requires model and scene reference frames".to_string(),
                ))
            }
        };
        input.validate()?;

        if input.correspondences.is_empty() || input.model_keypoints.is_empty() {
            return Ok(Vec::new());
        }

        let centroid = input
            .model_keypoints
            .iter()
            .fold(Vector3f::zeros(), |acc, p| acc + p.coords)
            / input.model_keypoints.len() as f32;

        // Per voter: the model -> scene rotation its two frames imply
        let mut rotations: Vec<Option<Matrix3<f32>>> = Vec::with_capacity(input.correspondences.len());
        let mut bins: BTreeMap<BinKey, Bin> = BTreeMap::new();
        let mut votes = 0usize;

        for (voter, c) in input.correspondences.iter().enumerate() {
            let model_frame = &model_frames[c.model_index];
            let scene_frame = &scene_frames[c.scene_index];
            if !model_frame.is_finite() || !scene_frame.is_finite() {
                rotations.push(None);
                continue;
            }

            let model_point = input.model_keypoints[c.model_index];
            let scene_point = input.scene_keypoints[c.scene_index];
            let local = model_frame.to_local(&(centroid - model_point.coords));
            let vote = scene_point + scene_frame.to_global(&local);

            rotations.push(Some(scene_frame.axes.transpose() * model_frame.axes));
            self.cast_vote(&mut bins, &vote, voter);
            votes += 1;
        }

        let peaks = self.peaks(&bins);
        debug!(
            "Hough voting: {} votes in {} bins, {} peaks above {}",
            votes,
            bins.len(),
            peaks.len(),
            self.threshold
        );

        let mut hypotheses = Vec::with_capacity(peaks.len());
        for (key, bin) in peaks {
            let voters: Vec<usize> = bin.voters.iter().copied().sorted_unstable().dedup().collect();

            let inliers = self.consensus(input, &voters, &rotations);
            if inliers.len() < MIN_FIT_PAIRS {
                debug!("Dropping bin {:?}: only {} consistent voters", key, inliers.len());
                continue;
            }

            let members: Vec<Correspondence> = inliers.iter().map(|&v| input.correspondences[v]).collect();
            hypotheses.push(input.fit(members, bin.weight)?);
        }

        Ok(hypotheses)
    }
}

impl HoughGrouping {
    /// Voters agreeing with the best single-voter pose proposal
    fn consensus(&self, input: &GroupingInput<'_>, voters: &[usize], rotations: &[Option<Matrix3<f32>>]) -> Vec<usize> {
        let mut best: Vec<usize> = Vec::new();

        for &proposer in voters {
            let Some(rotation) = rotations[proposer] else {
                continue;
            };
            let c = &input.correspondences[proposer];
            let translation =
                input.scene_keypoints[c.scene_index].coords - rotation * input.model_keypoints[c.model_index].coords;

            let agreeing: Vec<usize> = voters
                .iter()
                .copied()
                .filter(|&v| {
                    let c = &input.correspondences[v];
                    let predicted = rotation * input.model_keypoints[c.model_index].coords + translation;
                    (predicted - input.scene_keypoints[c.scene_index].coords).norm() <= self.bin_size
                })
                .collect();

            if agreeing.len() > best.len() {
                best = agreeing;
            }
        }

        best
    }
}
