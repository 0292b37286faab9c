//! Geometric consistency grouping

use super::{CorrespondenceGrouping, GroupingInput};
use crate::registration::MIN_FIT_PAIRS;
use log::debug;
use recog3d_core::{Correspondence, Error, PoseHypothesis, Result};

/// Groups correspondences whose keypoint pairs keep their mutual distances.
///
/// Seeds are taken in order of increasing descriptor distance. A cluster
/// grows by every correspondence that is consistent with all current members
/// and shares no keypoint with them; clusters reaching `min_cluster_size`
/// are accepted and their members are not reused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricConsistencyGrouping {
    /// Largest allowed difference between a model distance and its scene counterpart
    pub tolerance: f32,
    /// Smallest accepted cluster
    pub min_cluster_size: usize,
}

impl GeometricConsistencyGrouping {
    pub fn new(tolerance: f32, min_cluster_size: usize) -> Self {
        Self {
            tolerance,
            min_cluster_size,
        }
    }

    fn consistent(&self, input: &GroupingInput<'_>, a: &Correspondence, b: &Correspondence) -> bool {
        if a.model_index == b.model_index || a.scene_index == b.scene_index {
            return false;
        }
        let model_distance = (input.model_keypoints[a.model_index] - input.model_keypoints[b.model_index]).norm();
        let scene_distance = (input.scene_keypoints[a.scene_index] - input.scene_keypoints[b.scene_index]).norm();
        (model_distance - scene_distance).abs() <= self.tolerance
    }
}

impl CorrespondenceGrouping for GeometricConsistencyGrouping {
    fn group(&self, input: &GroupingInput<'_>) -> Result<Vec<PoseHypothesis>> {
        if !(self.tolerance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "consistency tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.min_cluster_size < MIN_FIT_PAIRS {
            return Err(Error::InvalidConfig(format!(
                "minimum cluster size must be at least {}, got {}",
                MIN_FIT_PAIRS, self.min_cluster_size
            )));
        }
        input.validate()?;

        let correspondences = input.correspondences;
        let mut order: Vec<usize> = (0..correspondences.len()).collect();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&correspondences[a], &correspondences[b]);
            ca.distance
                .total_cmp(&cb.distance)
                .then(ca.scene_index.cmp(&cb.scene_index))
                .then(ca.model_index.cmp(&cb.model_index))
        });

        let mut taken = vec![false; correspondences.len()];
        let mut hypotheses = Vec::new();
        let mut rejected = 0usize;

        for &seed in &order {
            if taken[seed] {
                continue;
            }

            let mut cluster = vec![seed];
            for &candidate in &order {
                if candidate == seed || taken[candidate] {
                    continue;
                }
                let c = &correspondences[candidate];
                if cluster
                    .iter()
                    .all(|&member| self.consistent(input, &correspondences[member], c))
                {
                    cluster.push(candidate);
                }
            }

            if cluster.len() < self.min_cluster_size {
                rejected += 1;
                continue;
            }

            for &member in &cluster {
                taken[member] = true;
            }
            let size = cluster.len() as f32;
            let members = cluster.iter().map(|&i| correspondences[i]).collect();
            hypotheses.push(input.fit(members, size)?);
        }

        debug!(
            "Geometric consistency: {} clusters accepted, {} seeds below {} members",
            hypotheses.len(),
            rejected,
            self.min_cluster_size
        );

        Ok(hypotheses)
    }
}
