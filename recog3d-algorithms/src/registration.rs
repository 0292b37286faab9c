//! Least-squares rigid alignment of matched keypoints

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion};
use recog3d_core::{Error, Point3f, Result, Vector3f};

/// Fewest point pairs that pin down a rigid transform
pub const MIN_FIT_PAIRS: usize = 3;

/// Compute the rigid transform mapping `source` onto `target` using SVD
///
/// Points are paired by position in the two slices. The rotation comes from
/// the SVD of the cross-covariance of the centred pairs; when that product is
/// a reflection, the axis of the smallest singular value is flipped so the
/// result is always a proper rotation.
pub fn estimate_rigid_transform(source: &[Point3f], target: &[Point3f]) -> Result<Isometry3<f32>> {
    if source.len() != target.len() {
        return Err(Error::InvalidData(format!(
            "point correspondence mismatch: {} source vs {} target points",
            source.len(),
            target.len()
        )));
    }
    if source.len() < MIN_FIT_PAIRS {
        return Err(Error::InvalidData(format!(
            "at least {} point pairs are needed for a rigid fit, got {}",
            MIN_FIT_PAIRS,
            source.len()
        )));
    }

    let n = source.len() as f32;
    let source_centroid = source.iter().fold(Vector3f::zeros(), |acc, p| acc + p.coords) / n;
    let target_centroid = target.iter().fold(Vector3f::zeros(), |acc, p| acc + p.coords) / n;

    let mut h = Matrix3::zeros();
    for (src, tgt) in source.iter().zip(target) {
        let p = src.coords - source_centroid;
        let q = tgt.coords - target_centroid;
        h += p * q.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or_else(|| Error::Algorithm("SVD U matrix not available".to_string()))?;
    let mut v_t = svd.v_t.ok_or_else(|| Error::Algorithm("SVD V^T matrix not available".to_string()))?;

    let mut r = v_t.transpose() * u.transpose();

    // Ensure proper rotation (det(R) = 1)
    if r.determinant() < 0.0 {
        let smallest = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(2);
        let flipped = -v_t.row(smallest);
        v_t.set_row(smallest, &flipped);
        r = v_t.transpose() * u.transpose();
    }

    if !r.iter().all(|v| v.is_finite()) {
        return Err(Error::Algorithm("rigid fit produced a non-finite rotation".to_string()));
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    let translation = target_centroid - rotation * source_centroid;

    Ok(Isometry3::from_parts(Translation3::from(translation), rotation))
}

/// Root mean square distance between transformed source points and their targets
pub fn alignment_error(transform: &Isometry3<f32>, source: &[Point3f], target: &[Point3f]) -> f32 {
    if source.is_empty() {
        return 0.0;
    }
    let sum: f32 = source
        .iter()
        .zip(target)
        .map(|(s, t)| (transform * s - t).norm_squared())
        .sum();
    (sum / source.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_recovers_known_transform() {
        let mut rng = StdRng::seed_from_u64(7);
        let source: Vec<Point3f> = (0..25)
            .map(|_| Point3f::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect();

        let expected = Isometry3::from_parts(
            Translation3::new(0.5, -1.5, 2.0),
            UnitQuaternion::from_euler_angles(0.4, -0.9, 2.1),
        );
        let target: Vec<Point3f> = source.iter().map(|p| expected * p).collect();

        let estimated = estimate_rigid_transform(&source, &target).unwrap();
        assert!(estimated.rotation.angle_to(&expected.rotation) < 1e-3);
        assert_relative_eq!(estimated.translation.vector, expected.translation.vector, epsilon = 1e-4);
        assert!(alignment_error(&estimated, &source, &target) < 1e-4);
    }

    #[test]
    fn test_planar_points_give_proper_rotation() {
        // Coplanar input leaves one singular value at zero, where reflections hide
        let source = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 2.0, 0.0),
            Point3f::new(1.0, 2.0, 0.0),
        ];
        let expected = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3f::y_axis(), 0.8),
        );
        let target: Vec<Point3f> = source.iter().map(|p| expected * p).collect();

        let estimated = estimate_rigid_transform(&source, &target).unwrap();
        let r = estimated.rotation.to_rotation_matrix().into_inner();
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-4);
        assert!(alignment_error(&estimated, &source, &target) < 1e-4);
    }

    #[test]
    fn test_too_few_or_mismatched_pairs() {
        let a = vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)];
        let b = vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)];
        assert!(estimate_rigid_transform(&a, &a).is_err());
        assert!(estimate_rigid_transform(&a, &b).is_err());
    }
}
