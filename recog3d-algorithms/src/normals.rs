//! Normal estimation algorithms

use crate::nearest_neighbor::SpatialIndex;
use log::debug;
use nalgebra::{Matrix3, SymmetricEigen};
use rayon::prelude::*;
use recog3d_core::{Error, NearestNeighborSearch, Normal, Point3f, PointCloud, Result, Vector3f};

/// Smallest neighbourhood that can define a plane
pub const MIN_NORMAL_NEIGHBORS: usize = 3;

/// Relative size of the middle eigenvalue below which a neighbourhood counts as collinear
const COLLINEAR_RATIO: f32 = 1e-5;

/// Eigen decomposition of a symmetric 3x3 matrix with eigenvalues in ascending order
pub(crate) fn sorted_eigen(matrix: Matrix3<f32>) -> ([f32; 3], [Vector3f; 3]) {
    // Solved in double precision; close eigenvalues otherwise swing the axes
    let eigen = SymmetricEigen::new(matrix.cast::<f64>());
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let values = order.map(|i| eigen.eigenvalues[i] as f32);
    let vectors = order.map(|i| eigen.eigenvectors.column(i).into_owned().cast::<f32>());
    (values, vectors)
}

/// Whether the two largest eigenvalues span a surface rather than a line or a point
pub(crate) fn spans_plane(eigenvalues: &[f32; 3]) -> bool {
    let largest = eigenvalues[2];
    largest > f32::EPSILON * f32::EPSILON && eigenvalues[1] > COLLINEAR_RATIO * largest
}

/// Estimate normals for a point cloud using k-nearest neighbors
///
/// Normals are oriented toward the origin, the usual sensor viewpoint.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `k` - Neighbourhood size, the query point included
///
/// # Returns
/// * `Result<Vec<Normal>>` - One normal per input point; NaN where the
///   neighbourhood is degenerate
pub fn estimate_normals<T>(cloud: &PointCloud<T>, k: usize) -> Result<Vec<Normal>>
where
    T: Copy,
    Point3f: From<T>,
{
    let points = cloud.positions();
    let index = SpatialIndex::new(&points);
    estimate_normals_indexed(&points, &index, k, &Point3f::origin())
}

/// Estimate normals with a prebuilt index and an explicit viewpoint
pub fn estimate_normals_indexed(
    points: &[Point3f],
    index: &SpatialIndex,
    k: usize,
    viewpoint: &Point3f,
) -> Result<Vec<Normal>> {
    if k < MIN_NORMAL_NEIGHBORS {
        return Err(Error::InvalidData(format!(
            "k must be at least {} for normal estimation, got {}",
            MIN_NORMAL_NEIGHBORS, k
        )));
    }

    if index.len() != points.len() {
        return Err(Error::InvalidData(
            "spatial index was built for a different cloud".to_string(),
        ));
    }

    let normals: Vec<Normal> = points
        .par_iter()
        .map(|point| {
            let neighbors = index.find_k_nearest(point, k);
            let neighborhood: Vec<Point3f> = neighbors.iter().map(|&(idx, _)| points[idx]).collect();
            fit_normal(&neighborhood, point, viewpoint)
        })
        .collect();

    let invalid = normals.iter().filter(|n| !n.is_finite()).count();
    debug!("Estimated {} normals ({} degenerate)", normals.len(), invalid);

    Ok(normals)
}

/// PCA plane fit; the normal is the eigenvector of the smallest eigenvalue
fn fit_normal(neighborhood: &[Point3f], point: &Point3f, viewpoint: &Point3f) -> Normal {
    if neighborhood.len() < MIN_NORMAL_NEIGHBORS {
        return Normal::invalid();
    }

    let n = neighborhood.len() as f32;
    let centroid = neighborhood
        .iter()
        .fold(Vector3f::zeros(), |acc, p| acc + p.coords)
        / n;

    let mut covariance = Matrix3::zeros();
    for p in neighborhood {
        let d = p.coords - centroid;
        covariance += d * d.transpose();
    }
    covariance /= n;

    let (values, vectors) = sorted_eigen(covariance);
    if !spans_plane(&values) {
        return Normal::invalid();
    }

    let mut normal = vectors[0].normalize();
    if normal.dot(&(viewpoint - point)) < 0.0 {
        normal = -normal;
    }

    let sum = values[0].max(0.0) + values[1] + values[2];
    let curvature = values[0].max(0.0) / sum;

    Normal::new(normal, curvature)
}
