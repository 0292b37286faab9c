//! Local reference frame estimation at keypoints

use crate::normals::{sorted_eigen, spans_plane};
use crate::surface::SearchSurface;
use log::debug;
use nalgebra::Matrix3;
use rayon::prelude::*;
use recog3d_core::{Error, Keypoints, Normal, Point3f, ReferenceFrame, Result, Vector3f};
use std::f32::consts::{PI, TAU};

/// Fewest support points a frame or descriptor is computed from
pub const MIN_SUPPORT_POINTS: usize = 5;

/// Angular sectors of the margin ring inspected for holes
const HOLE_SECTORS: usize = 24;

/// Shortest run of empty sectors that counts as a hole
const MIN_HOLE_SECTORS: usize = 3;

/// Fraction of the radius beyond which support points form the margin ring
const MARGIN_RATIO: f32 = 0.85;

/// Points this close to the support boundary, relative to the radius, carry
/// no weight and are left out of the frame
const EDGE_FRACTION: f32 = 1e-3;

/// Largest `1 - |cos|` between a margin normal and z that still counts as flat
const FLAT_TILT: f32 = 1e-5;

/// Estimate one local reference frame per keypoint
///
/// Frames are built from the weighted covariance of the surface points within
/// `radius` of each keypoint. With `find_holes` set, the x axis is re-aimed at
/// the largest gap in the support boundary, which stabilizes frames at the
/// rim of partial views.
///
/// Keypoints with too little support, an invalid normal or a degenerate
/// neighbourhood receive `ReferenceFrame::invalid()`.
pub fn estimate_reference_frames<T>(
    keypoints: &Keypoints<T>,
    surface: &SearchSurface<'_>,
    radius: f32,
    find_holes: bool,
) -> Result<Vec<ReferenceFrame>>
where
    T: Copy,
    Point3f: From<T>,
{
    if !(radius > 0.0) {
        return Err(Error::InvalidData(format!(
            "reference frame radius must be positive, got {}",
            radius
        )));
    }
    surface.check_indices(&keypoints.indices)?;

    let positions = keypoints.cloud.positions();
    let frames: Vec<ReferenceFrame> = positions
        .par_iter()
        .zip(keypoints.indices.par_iter())
        .map(|(center, &idx)| {
            if !surface.normals()[idx].is_finite() {
                return ReferenceFrame::invalid();
            }
            let neighbors = surface.neighbors(center, radius);
            local_frame(center, &neighbors, surface, radius, find_holes)
        })
        .collect();

    let invalid = frames.iter().filter(|f| !f.is_finite()).count();
    debug!("Estimated {} reference frames ({} invalid)", frames.len(), invalid);

    Ok(frames)
}

/// A neighbour inside the support sphere, relative to the keypoint
struct SupportPoint {
    index: usize,
    offset: Vector3f,
    distance: f32,
}

/// Frame of the support `neighbors` (surface indices with distances) around `center`
///
/// z is the least-variance axis of the weighted covariance. x points toward the
/// margin point whose normal tilts furthest from z; on flat supports, where no
/// normal tilts, it falls back to the largest-variance axis.
pub(crate) fn local_frame(
    center: &Point3f,
    neighbors: &[(usize, f32)],
    surface: &SearchSurface<'_>,
    radius: f32,
    find_holes: bool,
) -> ReferenceFrame {
    let points = surface.points();
    let support: Vec<SupportPoint> = neighbors
        .iter()
        .filter(|&&(_, d)| d > f32::EPSILON && radius - d > EDGE_FRACTION * radius)
        .map(|&(index, distance)| SupportPoint {
            index,
            offset: points[index] - center,
            distance,
        })
        .collect();

    if support.len() < MIN_SUPPORT_POINTS {
        return ReferenceFrame::invalid();
    }

    let mut covariance = Matrix3::zeros();
    let mut total_weight = 0.0;
    for point in &support {
        let weight = radius - point.distance;
        covariance += point.offset * point.offset.transpose() * weight;
        total_weight += weight;
    }
    if total_weight <= 0.0 {
        return ReferenceFrame::invalid();
    }
    covariance /= total_weight;

    let (values, vectors) = sorted_eigen(covariance);
    if !spans_plane(&values) {
        return ReferenceFrame::invalid();
    }

    let z = disambiguate(vectors[0].normalize(), &support);
    let mut x = steepest_margin_direction(&z, &support, surface.normals(), radius)
        .unwrap_or_else(|| disambiguate(vectors[2].normalize(), &support));

    if find_holes {
        if let Some(angle) = widest_gap(&x, &z, &support, radius) {
            let y = z.cross(&x);
            x = x * angle.cos() + y * angle.sin();
        }
    }

    x -= z * x.dot(&z);
    let norm = x.norm();
    if norm <= f32::EPSILON {
        return ReferenceFrame::invalid();
    }
    x /= norm;
    let y = z.cross(&x);

    ReferenceFrame::from_axes(&x, &y, &z)
}

/// Point the axis toward the side holding more support points
fn disambiguate(axis: Vector3f, support: &[SupportPoint]) -> Vector3f {
    let mut positive = 0usize;
    let mut negative = 0usize;
    let mut sum = 0.0f32;
    for point in support {
        let projection = point.offset.dot(&axis);
        if projection > 0.0 {
            positive += 1;
        } else if projection < 0.0 {
            negative += 1;
        }
        sum += projection;
    }

    if negative > positive || (negative == positive && sum < 0.0) {
        -axis
    } else {
        axis
    }
}

/// Tangent direction toward the margin point whose normal deviates most from `z`
///
/// Normal signs depend on the viewpoint, so only the tilt counts. Equal tilts
/// resolve to the lower surface index. `None` when the margin holds no usable
/// normal or none tilts by more than `FLAT_TILT`.
fn steepest_margin_direction(
    z: &Vector3f,
    support: &[SupportPoint],
    normals: &[Normal],
    radius: f32,
) -> Option<Vector3f> {
    let (steepest, alignment) = support
        .iter()
        .filter(|point| point.distance > MARGIN_RATIO * radius)
        .filter_map(|point| {
            let normal = normals.get(point.index).filter(|n| n.is_finite())?;
            Some((point, normal.normal.normalize().dot(z).abs()))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.index.cmp(&b.0.index)))?;

    if 1.0 - alignment < FLAT_TILT {
        return None;
    }

    let tangent = steepest.offset - z * steepest.offset.dot(z);
    let norm = tangent.norm();
    (norm > f32::EPSILON).then(|| tangent / norm)
}

/// Angle from `x` (around `z`) to the middle of the longest empty stretch of
/// the margin ring, if the stretch is wide enough to be a hole
///
/// Sectors are centred on multiples of the sector width, so the x axis lies
/// mid-sector rather than on a boundary.
fn widest_gap(x: &Vector3f, z: &Vector3f, support: &[SupportPoint], radius: f32) -> Option<f32> {
    let y = z.cross(x);
    let sector_width = TAU / HOLE_SECTORS as f32;

    let mut occupied = [false; HOLE_SECTORS];
    for point in support {
        if point.distance <= MARGIN_RATIO * radius {
            continue;
        }
        let angle = point.offset.dot(&y).atan2(point.offset.dot(x));
        let sector = ((angle / sector_width + 0.5).floor() as isize).rem_euclid(HOLE_SECTORS as isize);
        occupied[sector as usize] = true;
    }

    let first_occupied = occupied.iter().position(|&o| o)?;

    // Walk the ring once starting just after an occupied sector so wrapped runs stay whole
    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;
    for step in 1..=HOLE_SECTORS {
        let sector = (first_occupied + step) % HOLE_SECTORS;
        if !occupied[sector] {
            if run_start.is_none() {
                run_start = Some((sector, step));
            }
            continue;
        }
        if let Some((start, start_step)) = run_start.take() {
            let len = step - start_step;
            let better = match best {
                None => true,
                Some((best_start, best_len)) => len > best_len || (len == best_len && start < best_start),
            };
            if better {
                best = Some((start, len));
            }
        }
    }

    let (start, len) = best.filter(|&(_, len)| len >= MIN_HOLE_SECTORS)?;
    let center = (start as f32 + (len - 1) as f32 / 2.0) * sector_width;
    Some(if center > PI { center - TAU } else { center })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nearest_neighbor::SpatialIndex;
    use crate::normals::estimate_normals_indexed;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};
    use recog3d_core::PointCloud;

    fn bumpy_patch() -> Vec<Point3f> {
        let mut points = Vec::new();
        for i in 0..30 {
            for j in 0..30 {
                let x = i as f32 * 0.02 - 0.3;
                let y = j as f32 * 0.02 - 0.3;
                let z = 0.2 * x * x - 0.1 * y * y + 0.15 * x * y + 0.05 * x;
                points.push(Point3f::new(x, y, z + 1.0));
            }
        }
        points
    }

    fn frames_for(points: &[Point3f], keypoint_indices: Vec<usize>, radius: f32, find_holes: bool) -> Vec<ReferenceFrame> {
        let index = SpatialIndex::new(points);
        let normals = estimate_normals_indexed(points, &index, 10, &Point3f::origin()).unwrap();
        let surface = SearchSurface::new(points, &normals, &index).unwrap();
        let cloud = PointCloud::from_points(points.to_vec());
        let keypoints = Keypoints::from_indices(&cloud, keypoint_indices);
        estimate_reference_frames(&keypoints, &surface, radius, find_holes).unwrap()
    }

    #[test]
    fn test_frames_are_right_handed_rotations() {
        let points = bumpy_patch();
        let frames = frames_for(&points, vec![465, 300, 610], 0.1, false);

        for frame in &frames {
            assert!(frame.is_finite());
            assert_relative_eq!(frame.axes * frame.axes.transpose(), Matrix3::identity(), epsilon = 1e-4);
            assert_relative_eq!(frame.axes.determinant(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_frames_follow_rigid_motion() {
        let points = bumpy_patch();
        let motion = Isometry3::from_parts(
            Translation3::new(0.4, -0.2, 0.7),
            UnitQuaternion::from_euler_angles(0.3, -0.5, 1.1),
        );
        let moved: Vec<Point3f> = points.iter().map(|p| motion * p).collect();

        let keypoints = vec![465, 372, 528];
        let before = frames_for(&points, keypoints.clone(), 0.1, true);
        let transformed = frames_for(&moved, keypoints, 0.1, true);

        let rotation = motion.rotation.to_rotation_matrix();
        for (a, b) in before.iter().zip(&transformed) {
            assert!(a.is_finite() && b.is_finite());
            assert_relative_eq!(rotation * a.x_axis(), b.x_axis(), epsilon = 1e-3);
            assert_relative_eq!(rotation * a.z_axis(), b.z_axis(), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_point_on_support_boundary_leaves_frame_unchanged() {
        let points = bumpy_patch();
        let before = frames_for(&points, vec![465], 0.1, true);

        // Lies just inside the radius, where its weight vanishes
        let mut extended = points.clone();
        let offset = Vector3f::new(0.6, -0.3, 0.742_6).normalize() * 0.1 * (1.0 - 1e-4);
        extended.push(points[465] + offset);
        let after = frames_for(&extended, vec![465], 0.1, true);

        assert!(before[0].is_finite() && after[0].is_finite());
        assert_relative_eq!(before[0].axes, after[0].axes, epsilon = 1e-5);
    }

    #[test]
    fn test_x_axis_follows_curvature() {
        // Bends along x only, so the steepest margin normals sit at the largest |x|
        let mut points = Vec::new();
        for i in 0..31 {
            for j in 0..31 {
                let x = (i as f32 - 15.0) * 0.02;
                let y = (j as f32 - 15.0) * 0.02;
                points.push(Point3f::new(x, y, 1.0 + 0.5 * x * x));
            }
        }
        let center = 15 * 31 + 15;

        let frames = frames_for(&points, vec![center], 0.1, false);
        assert!(frames[0].is_finite());
        let x = frames[0].x_axis();
        assert!(x.x.abs() > 0.85, "x axis {:?}", x);
        assert_relative_eq!(frames[0].z_axis().z.abs(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_sparse_support_gives_invalid_frame() {
        let points = bumpy_patch();
        // Radius below the grid spacing leaves only the keypoint itself
        let frames = frames_for(&points, vec![465], 0.01, false);
        assert!(!frames[0].is_finite());
    }

    #[test]
    fn test_invalid_keypoint_normal_gives_invalid_frame() {
        let points = bumpy_patch();
        let index = SpatialIndex::new(&points);
        let normals = vec![Normal::invalid(); points.len()];
        let surface = SearchSurface::new(&points, &normals, &index).unwrap();
        let cloud = PointCloud::from_points(points.clone());
        let keypoints = Keypoints::from_indices(&cloud, vec![465]);

        let frames = estimate_reference_frames(&keypoints, &surface, 0.1, false).unwrap();
        assert!(!frames[0].is_finite());
    }

    #[test]
    fn test_keypoint_outside_surface_is_rejected() {
        let points = bumpy_patch();
        let index = SpatialIndex::new(&points);
        let normals = vec![Normal::invalid(); points.len()];
        let surface = SearchSurface::new(&points, &normals, &index).unwrap();
        let keypoints = Keypoints {
            cloud: PointCloud::from_points(vec![points[0]]),
            indices: vec![points.len()],
        };

        assert!(estimate_reference_frames(&keypoints, &surface, 0.1, false).is_err());
        assert!(estimate_reference_frames(&Keypoints::<Point3f>::empty(), &surface, 0.0, false).is_err());
    }

    #[test]
    fn test_hole_turns_x_axis_toward_gap() {
        // Flat disc with an empty wedge between 90 and 180 degrees
        let mut points = vec![Point3f::new(0.0, 0.0, 1.0)];
        for ring in 1..=10 {
            let r = ring as f32 * 0.01;
            for k in 0..72 {
                let angle = k as f32 * TAU / 72.0;
                if angle > PI / 2.0 && angle < PI {
                    continue;
                }
                // Stretch along x so the largest eigenvector is well defined
                points.push(Point3f::new(1.5 * r * angle.cos(), r * angle.sin(), 1.0));
            }
        }

        let plain = frames_for(&points, vec![0], 0.1, false);
        let holes = frames_for(&points, vec![0], 0.1, true);
        assert!(plain[0].is_finite() && holes[0].is_finite());

        // The re-aimed axis points into the second quadrant
        let x = holes[0].x_axis();
        assert!(x.x < 0.0 && x.y > 0.0, "x axis {:?}", x);
        assert_relative_eq!(holes[0].z_axis().z.abs(), 1.0, epsilon = 1e-4);
    }
}
