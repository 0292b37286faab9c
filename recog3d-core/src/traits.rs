//! Core traits for recog3d

use crate::{point::*, point_cloud::*};
use nalgebra::Isometry3;

/// Trait for nearest neighbor search functionality.
///
/// Results are `(index, distance)` pairs sorted by ascending distance, with
/// equal distances ordered by index.
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)>;

    /// Find all neighbors within a given radius
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)>;
}

/// Trait for objects occupying a region of space
pub trait Bounded {
    /// Axis-aligned bounding box as (min, max)
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Mean position of all points
    fn centroid(&self) -> Point3f;

    /// Length of the bounding box diagonal
    fn extent(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).norm()
    }
}

/// Trait for objects that can be moved by a rigid transform
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Isometry3<f32>);
}

impl<T> Bounded for PointCloud<T>
where
    T: Clone + Copy,
    Point3f: From<T>,
{
    fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.is_empty() {
            return (Point3f::origin(), Point3f::origin());
        }

        let first_point = Point3f::from(self.points[0]);
        let mut min = first_point;
        let mut max = first_point;

        for point in &self.points {
            let p = Point3f::from(*point);
            min = min.inf(&p);
            max = max.sup(&p);
        }

        (min, max)
    }

    fn centroid(&self) -> Point3f {
        if self.is_empty() {
            return Point3f::origin();
        }

        let sum = self
            .points
            .iter()
            .fold(Vector3f::zeros(), |acc, p| acc + Point3f::from(*p).coords);
        Point3f::origin() + sum / self.len() as f32
    }
}

impl Transformable for Point {
    fn transform(&mut self, transform: &Isometry3<f32>) {
        self.position = transform * self.position;
    }
}

impl Transformable for Point3f {
    fn transform(&mut self, transform: &Isometry3<f32>) {
        *self = transform * *self;
    }
}

impl<T: Transformable> Transformable for PointCloud<T> {
    fn transform(&mut self, transform: &Isometry3<f32>) {
        for point in &mut self.points {
            point.transform(transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn test_bounding_box_and_centroid() {
        let cloud = PointCloud::from_points(vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 4.0, -2.0),
            Point::new(2.0, 4.0, 2.0),
        ]);

        let (min, max) = cloud.bounding_box();
        assert_eq!(min, Point3f::new(0.0, 0.0, -2.0));
        assert_eq!(max, Point3f::new(2.0, 4.0, 2.0));
        assert_relative_eq!(cloud.centroid(), Point3f::new(1.0, 2.0, 0.0));
        assert_relative_eq!(cloud.extent(), 6.0);
    }

    #[test]
    fn test_empty_cloud_bounds_are_origin() {
        let cloud = PointCloud::<Point3f>::new();
        assert_eq!(cloud.bounding_box(), (Point3f::origin(), Point3f::origin()));
        assert_eq!(cloud.centroid(), Point3f::origin());
    }

    #[test]
    fn test_transform_cloud_keeps_color() {
        let mut cloud = PointCloud::from_points(vec![Point::with_color(
            Point3f::new(1.0, 0.0, 0.0),
            [10, 20, 30, 255],
        )]);
        let rotation = UnitQuaternion::from_axis_angle(&Vector3f::z_axis(), std::f32::consts::FRAC_PI_2);
        let transform = Isometry3::from_parts(Translation3::new(0.0, 0.0, 1.0), rotation);

        cloud.transform(&transform);
        assert_relative_eq!(cloud[0].position, Point3f::new(0.0, 1.0, 1.0), epsilon = 1e-6);
        assert_eq!(cloud[0].color, Some([10, 20, 30, 255]));
    }
}
