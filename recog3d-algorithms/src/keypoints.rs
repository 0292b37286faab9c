//! Keypoint selection by uniform sampling

use log::debug;
use recog3d_core::{Error, Keypoints, Point3f, PointCloud, Result};
use std::collections::HashMap;

type VoxelKey = (i64, i64, i64);

fn voxel_of(point: &Point3f, radius: f32) -> VoxelKey {
    (
        (point.x / radius).floor() as i64,
        (point.y / radius).floor() as i64,
        (point.z / radius).floor() as i64,
    )
}

fn voxel_center(key: VoxelKey, radius: f32) -> Point3f {
    Point3f::new(
        (key.0 as f32 + 0.5) * radius,
        (key.1 as f32 + 0.5) * radius,
        (key.2 as f32 + 0.5) * radius,
    )
}

/// Uniform sampling keypoint selection
///
/// Space is divided into cubes of edge `radius` anchored at the origin. Each
/// occupied cube nominates the point closest to its centre (lowest index on
/// ties). Nominees are then accepted in source order unless an accepted
/// keypoint already lies closer than `radius`, which keeps every pair of
/// keypoints at least `radius` apart.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `radius` - Sampling radius, also the minimum keypoint spacing
///
/// # Returns
/// * `Result<Keypoints<T>>` - Selected points with their source indices in
///   ascending order
///
/// # Example
/// ```rust
/// use recog3d_core::{PointCloud, Point3f};
/// use recog3d_algorithms::uniform_sampling;
///
/// fn main() -> recog3d_core::Result<()> {
///     let cloud = PointCloud::from_points(vec![
///         Point3f::new(0.01, 0.01, 0.01),
///         Point3f::new(0.02, 0.01, 0.01),
///         Point3f::new(0.51, 0.01, 0.01),
///     ]);
///
///     let keypoints = uniform_sampling(&cloud, 0.1)?;
///     assert_eq!(keypoints.len(), 2);
///     Ok(())
/// }
/// ```
pub fn uniform_sampling<T>(cloud: &PointCloud<T>, radius: f32) -> Result<Keypoints<T>>
where
    T: Copy,
    Point3f: From<T>,
{
    if !(radius > 0.0) || !radius.is_finite() {
        return Err(Error::InvalidData(format!(
            "sampling radius must be positive, got {}",
            radius
        )));
    }

    if cloud.is_empty() {
        return Ok(Keypoints::empty());
    }

    let positions = cloud.positions();

    // Best candidate per voxel: (index, squared distance to voxel centre)
    let mut nominees: HashMap<VoxelKey, (usize, f32)> = HashMap::new();
    for (idx, point) in positions.iter().enumerate() {
        if !point.coords.iter().all(|v| v.is_finite()) {
            continue;
        }
        let key = voxel_of(point, radius);
        let d2 = (point - voxel_center(key, radius)).norm_squared();
        nominees
            .entry(key)
            .and_modify(|best| {
                if d2 < best.1 {
                    *best = (idx, d2);
                }
            })
            .or_insert((idx, d2));
    }

    let mut candidates: Vec<usize> = nominees.values().map(|&(idx, _)| idx).collect();
    candidates.sort_unstable();

    let radius_sq = radius * radius;
    let mut accepted_by_voxel: HashMap<VoxelKey, Vec<usize>> = HashMap::new();
    let mut indices = Vec::with_capacity(candidates.len());

    for idx in candidates {
        let point = positions[idx];
        let (vx, vy, vz) = voxel_of(&point, radius);

        let mut too_close = false;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(members) = accepted_by_voxel.get(&(vx + dx, vy + dy, vz + dz)) {
                        if members
                            .iter()
                            .any(|&other| (positions[other] - point).norm_squared() < radius_sq)
                        {
                            too_close = true;
                            break 'search;
                        }
                    }
                }
            }
        }

        if !too_close {
            accepted_by_voxel.entry((vx, vy, vz)).or_default().push(idx);
            indices.push(idx);
        }
    }

    debug!(
        "Uniform sampling kept {} of {} points (radius {})",
        indices.len(),
        cloud.len(),
        radius
    );

    Ok(Keypoints::from_indices(cloud, indices))
}
