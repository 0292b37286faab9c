//! Nearest neighbor search implementations

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use recog3d_core::{Descriptor, Error, NearestNeighborSearch, Point3f, Result};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Leaf bucket size of the descriptor tree
const DESCRIPTOR_BUCKET_SIZE: usize = 16;

/// A cloud point with its index for the R*-tree
#[derive(Debug, Clone, PartialEq)]
struct IndexedPoint {
    index: usize,
    position: [f32; 3],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Sort `(index, squared distance)` pairs by distance, then index, and take square roots
fn finish_neighbors(mut neighbors: Vec<(usize, f32)>, limit: Option<usize>) -> Vec<(usize, f32)> {
    neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    if let Some(k) = limit {
        neighbors.truncate(k);
    }
    neighbors
        .into_iter()
        .map(|(idx, d2)| (idx, d2.sqrt()))
        .collect()
}

/// R*-tree index over the positions of one cloud.
///
/// Built once per cloud and shared read-only by every per-point query of a run.
/// Non-finite points are left out of the tree and never returned by a query,
/// but still count toward `len` so indices stay aligned with the cloud.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(points: &[Point3f]) -> Self {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| is_finite_point(p))
            .map(|(index, p)| IndexedPoint {
                index,
                position: [p.x, p.y, p.z],
            })
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
            len: points.len(),
        }
    }

    /// Number of points of the source cloud, indexed or not
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of finite points held by the tree
    pub fn indexed_len(&self) -> usize {
        self.tree.size()
    }
}

impl NearestNeighborSearch for SpatialIndex {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 || !is_finite_point(query) {
            return Vec::new();
        }

        let q = [query.x, query.y, query.z];
        let mut neighbors = Vec::with_capacity(k);
        let mut kth_distance: Option<f32> = None;

        // Keep collecting past k while distances tie with the k-th one, so the
        // final cut is made by index rather than by tree layout.
        for item in self.tree.nearest_neighbor_iter(&q) {
            let d2 = item.distance_2(&q);
            if let Some(limit) = kth_distance {
                if d2 > limit {
                    break;
                }
            }
            neighbors.push((item.index, d2));
            if neighbors.len() == k && kth_distance.is_none() {
                kth_distance = Some(d2);
            }
        }

        finish_neighbors(neighbors, Some(k))
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        if !(radius > 0.0) || !is_finite_point(query) {
            return Vec::new();
        }

        let q = [query.x, query.y, query.z];
        let neighbors = self
            .tree
            .locate_within_distance(q, radius * radius)
            .map(|item| (item.index, item.distance_2(&q)))
            .collect();

        finish_neighbors(neighbors, None)
    }
}

fn is_finite_point(p: &Point3f) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        let distances = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm_squared()))
            .filter(|(_, d2)| d2.is_finite())
            .collect();

        finish_neighbors(distances, Some(k))
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let radius_squared = radius * radius;
        let distances = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm_squared()))
            .filter(|(_, d2)| *d2 <= radius_squared)
            .collect();

        finish_neighbors(distances, None)
    }
}

/// KD-Tree over descriptor space for exact single nearest neighbor queries.
///
/// Non-finite descriptors are left out of the tree; reported indices always
/// refer to positions in the slice the tree was built from.
pub struct DescriptorKdTree {
    dim: usize,
    tree: Option<KdTree<f32, usize, Vec<f32>>>,
}

impl DescriptorKdTree {
    pub fn new(descriptors: &[Descriptor]) -> Result<Self> {
        let finite: Vec<(usize, &Descriptor)> = descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .collect();

        let Some(&(_, first)) = finite.first() else {
            return Ok(Self { dim: 0, tree: None });
        };
        let dim = first.len();

        let mut tree = KdTree::with_capacity(dim, DESCRIPTOR_BUCKET_SIZE);
        for (idx, descriptor) in finite {
            if descriptor.len() != dim {
                return Err(Error::InvalidData(format!(
                    "descriptor {} has length {}, expected {}",
                    idx,
                    descriptor.len(),
                    dim
                )));
            }
            tree.add(descriptor.values.clone(), idx)
                .map_err(|e| Error::InvalidData(format!("descriptor {}: {:?}", idx, e)))?;
        }

        Ok(Self { dim, tree: Some(tree) })
    }

    /// Number of indexed (finite) descriptors
    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.size())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor length, zero when nothing was indexed
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Closest indexed descriptor as `(source index, squared distance)`.
    /// Equal distances resolve to the lower source index.
    pub fn nearest(&self, query: &[f32]) -> Option<(usize, f32)> {
        let tree = self.tree.as_ref()?;
        if query.len() != self.dim {
            return None;
        }

        let mut candidates = tree.iter_nearest(query, &squared_euclidean).ok()?;
        let (best_d2, &first) = candidates.next()?;
        let best = candidates
            .take_while(|&(d2, _)| d2 <= best_d2)
            .fold(first, |lowest, (_, &idx)| lowest.min(idx));
        Some((best, best_d2))
    }
}
