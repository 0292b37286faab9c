//! Point cloud operations

use crate::nearest_neighbor::SpatialIndex;
use rayon::prelude::*;
use recog3d_core::{NearestNeighborSearch, Point3f, PointCloud};

/// Extension trait for PointCloud to measure its sampling density
pub trait PointCloudResolution {
    /// Mean distance from each point to its nearest other point
    ///
    /// Returns 0 for clouds with fewer than two points.
    ///
    /// # Example
    /// ```rust
    /// use recog3d_core::{PointCloud, Point3f};
    /// use recog3d_algorithms::point_cloud_ops::PointCloudResolution;
    ///
    /// let cloud = PointCloud::from_points(vec![
    ///     Point3f::new(0.0, 0.0, 0.0),
    ///     Point3f::new(0.5, 0.0, 0.0),
    ///     Point3f::new(1.5, 0.0, 0.0),
    /// ]);
    /// assert!((cloud.resolution() - (0.5 + 0.5 + 1.0) / 3.0).abs() < 1e-6);
    /// ```
    fn resolution(&self) -> f32;
}

impl<T> PointCloudResolution for PointCloud<T>
where
    T: Copy,
    Point3f: From<T>,
{
    fn resolution(&self) -> f32 {
        cloud_resolution(self)
    }
}

/// Mean nearest-neighbour spacing of a cloud, see [`PointCloudResolution`]
pub fn cloud_resolution<T>(cloud: &PointCloud<T>) -> f32
where
    T: Copy,
    Point3f: From<T>,
{
    if cloud.len() < 2 {
        return 0.0;
    }

    let points = cloud.positions();
    let index = SpatialIndex::new(&points);

    let spacings: Vec<f32> = points
        .par_iter()
        .enumerate()
        .filter_map(|(i, point)| {
            index
                .find_k_nearest(point, 2)
                .into_iter()
                .find(|&(idx, _)| idx != i)
                .map(|(_, distance)| distance)
        })
        .collect();

    if spacings.is_empty() {
        return 0.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}
