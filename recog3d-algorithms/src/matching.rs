//! Descriptor-space correspondence search

use crate::nearest_neighbor::DescriptorKdTree;
use log::debug;
use rayon::prelude::*;
use recog3d_core::{Correspondence, Descriptor, Error, Result};

/// Default acceptance bound on the squared descriptor distance
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.25;

/// Match every scene descriptor to its nearest model descriptor
///
/// A k-d tree over the model descriptors answers one exact nearest neighbour
/// query per scene descriptor. Unusable descriptors on either side are
/// skipped. A match is kept when its squared distance is below `threshold`.
/// Correspondences come out in scene keypoint order, at most one per scene
/// keypoint.
pub fn find_correspondences(
    model: &[Descriptor],
    scene: &[Descriptor],
    threshold: f32,
) -> Result<Vec<Correspondence>> {
    if !(threshold > 0.0) {
        return Err(Error::InvalidData(format!(
            "match threshold must be positive, got {}",
            threshold
        )));
    }

    let tree = DescriptorKdTree::new(model)?;
    if tree.is_empty() {
        debug!("No usable model descriptors, skipping correspondence search");
        return Ok(Vec::new());
    }

    if let Some(bad) = scene
        .iter()
        .find(|d| d.is_finite() && d.len() != tree.dimension())
    {
        return Err(Error::InvalidData(format!(
            "scene descriptor has {} values, model descriptors have {}",
            bad.len(),
            tree.dimension()
        )));
    }

    let correspondences: Vec<Correspondence> = scene
        .par_iter()
        .enumerate()
        .filter_map(|(scene_index, descriptor)| {
            if !descriptor.is_finite() {
                return None;
            }
            let (model_index, distance) = tree.nearest(&descriptor.values)?;
            (distance < threshold).then(|| Correspondence::new(model_index, scene_index, distance))
        })
        .collect();

    debug!(
        "Matched {} of {} scene descriptors against {} model descriptors",
        correspondences.len(),
        scene.len(),
        tree.len()
    );

    Ok(correspondences)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(values: &[f32]) -> Descriptor {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        Descriptor::new(values.iter().map(|v| v / norm).collect())
    }

    #[test]
    fn test_each_scene_descriptor_gets_its_nearest_model() {
        let model = vec![
            unit(&[1.0, 0.0, 0.0, 0.0]),
            unit(&[0.0, 1.0, 0.0, 0.0]),
            unit(&[0.0, 0.0, 1.0, 0.0]),
        ];
        let scene = vec![
            unit(&[0.0, 0.1, 1.0, 0.0]),
            unit(&[1.0, 0.05, 0.0, 0.0]),
            unit(&[0.0, 0.0, 0.0, 1.0]),
        ];

        let correspondences = find_correspondences(&model, &scene, DEFAULT_MATCH_THRESHOLD).unwrap();
        assert_eq!(correspondences.len(), 2);
        assert_eq!((correspondences[0].model_index, correspondences[0].scene_index), (2, 0));
        assert_eq!((correspondences[1].model_index, correspondences[1].scene_index), (0, 1));
        for c in &correspondences {
            assert!(c.distance < DEFAULT_MATCH_THRESHOLD);
        }
    }

    #[test]
    fn test_unusable_descriptors_are_skipped() {
        let model = vec![Descriptor::invalid(3), unit(&[1.0, 1.0, 0.0])];
        let scene = vec![Descriptor::invalid(3), unit(&[1.0, 1.0, 0.1])];

        let correspondences = find_correspondences(&model, &scene, 0.25).unwrap();
        assert_eq!(correspondences.len(), 1);
        assert_eq!(correspondences[0].model_index, 1);
        assert_eq!(correspondences[0].scene_index, 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        let model = vec![Descriptor::new(vec![0.0, 0.0])];
        let scene = vec![Descriptor::new(vec![0.5, 0.0]), Descriptor::new(vec![0.4, 0.0])];

        let correspondences = find_correspondences(&model, &scene, 0.25).unwrap();
        assert_eq!(correspondences.len(), 1);
        assert_eq!(correspondences[0].scene_index, 1);
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        let model = vec![unit(&[1.0, 0.0])];
        assert!(find_correspondences(&model, &[], 0.25).unwrap().is_empty());
        assert!(find_correspondences(&[], &model, 0.25).unwrap().is_empty());
    }

    #[test]
    fn test_bad_inputs_are_rejected() {
        let model = vec![unit(&[1.0, 0.0])];
        let scene = vec![unit(&[1.0, 0.0, 0.0])];
        assert!(find_correspondences(&model, &scene, 0.25).is_err());
        assert!(find_correspondences(&model, &model, 0.0).is_err());
    }
}
