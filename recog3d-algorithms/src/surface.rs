//! Full-resolution support surface shared by the keypoint stages

use crate::nearest_neighbor::SpatialIndex;
use recog3d_core::{Error, NearestNeighborSearch, Normal, Point3f, Result};

/// Dense cloud with its normals and spatial index.
///
/// Descriptors and reference frames are computed at sparse keypoints but draw
/// their neighbourhoods from this surface.
#[derive(Clone, Copy)]
pub struct SearchSurface<'a> {
    points: &'a [Point3f],
    normals: &'a [Normal],
    index: &'a SpatialIndex,
}

impl<'a> SearchSurface<'a> {
    pub fn new(points: &'a [Point3f], normals: &'a [Normal], index: &'a SpatialIndex) -> Result<Self> {
        if points.len() != normals.len() {
            return Err(Error::InvalidData(format!(
                "surface has {} points but {} normals",
                points.len(),
                normals.len()
            )));
        }
        if points.len() != index.len() {
            return Err(Error::InvalidData(format!(
                "surface has {} points but its index holds {}",
                points.len(),
                index.len()
            )));
        }

        Ok(Self { points, normals, index })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &'a [Point3f] {
        self.points
    }

    pub fn normals(&self) -> &'a [Normal] {
        self.normals
    }

    /// Surface points within `radius` of `center`, as `(index, distance)`
    pub fn neighbors(&self, center: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        self.index.find_radius_neighbors(center, radius)
    }

    /// Check that every keypoint refers to a point of this surface
    pub(crate) fn check_indices(&self, indices: &[usize]) -> Result<()> {
        match indices.iter().find(|&&idx| idx >= self.points.len()) {
            Some(idx) => Err(Error::InvalidData(format!(
                "keypoint index {} outside surface of {} points",
                idx,
                self.points.len()
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_rejects_mismatched_inputs() {
        let points = vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 0.0, 0.0)];
        let index = SpatialIndex::new(&points);
        let one_normal = vec![Normal::invalid()];
        assert!(SearchSurface::new(&points, &one_normal, &index).is_err());

        let normals = vec![Normal::invalid(); 2];
        let other_index = SpatialIndex::new(&points[..1]);
        assert!(SearchSurface::new(&points, &normals, &other_index).is_err());

        let surface = SearchSurface::new(&points, &normals, &index).unwrap();
        assert_eq!(surface.len(), 2);
        assert!(surface.check_indices(&[0, 1]).is_ok());
        assert!(surface.check_indices(&[2]).is_err());
        assert_eq!(surface.neighbors(&Point3f::origin(), 0.5).len(), 1);
    }
}
