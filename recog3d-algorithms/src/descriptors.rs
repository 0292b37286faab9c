//! Local shape descriptors
//!
//! SHOT-style signatures: the support sphere around a keypoint is split into
//! 32 volumes in its local frame (8 azimuth sectors, 2 elevations, 2 radial
//! shells), and each volume holds an 11-bin histogram of the angle between
//! the neighbour normals and the frame's z axis.

use crate::reference_frames::{local_frame, MIN_SUPPORT_POINTS};
use crate::surface::SearchSurface;
use log::debug;
use rayon::prelude::*;
use recog3d_core::{Descriptor, Error, Keypoints, Point3f, Result, SHOT_DESCRIPTOR_LEN};
use std::f32::consts::{PI, TAU};

const AZIMUTH_BINS: usize = 8;
const ELEVATION_BINS: usize = 2;
const RADIAL_BINS: usize = 2;
const COSINE_BINS: usize = 11;

/// Compute SHOT descriptors at keypoints
///
/// # Arguments
/// * `keypoints` - Keypoints drawn from the surface cloud
/// * `surface` - Full-resolution cloud with normals supplying the support
/// * `radius` - Support radius
///
/// # Returns
/// * `Result<Vec<Descriptor>>` - One L2-normalized 352-value descriptor per
///   keypoint; all NaN where the support is too sparse or the local frame
///   is undefined
pub fn compute_shot_descriptors<T>(
    keypoints: &Keypoints<T>,
    surface: &SearchSurface<'_>,
    radius: f32,
) -> Result<Vec<Descriptor>>
where
    T: Copy,
    Point3f: From<T>,
{
    if !(radius > 0.0) {
        return Err(Error::InvalidData(format!(
            "descriptor radius must be positive, got {}",
            radius
        )));
    }
    surface.check_indices(&keypoints.indices)?;

    let positions = keypoints.cloud.positions();
    let descriptors: Vec<Descriptor> = positions
        .par_iter()
        .zip(keypoints.indices.par_iter())
        .map(|(center, &idx)| {
            if !surface.normals()[idx].is_finite() {
                return Descriptor::invalid(SHOT_DESCRIPTOR_LEN);
            }
            shot_signature(center, surface, radius)
        })
        .collect();

    let invalid = descriptors.iter().filter(|d| !d.is_finite()).count();
    debug!(
        "Computed {} SHOT descriptors ({} unusable)",
        descriptors.len(),
        invalid
    );

    Ok(descriptors)
}

fn shot_signature(center: &Point3f, surface: &SearchSurface<'_>, radius: f32) -> Descriptor {
    let neighbors = surface.neighbors(center, radius);
    let frame = local_frame(center, &neighbors, surface, radius, false);
    if !frame.is_finite() {
        return Descriptor::invalid(SHOT_DESCRIPTOR_LEN);
    }

    let z_axis = frame.z_axis();
    let sector_width = TAU / AZIMUTH_BINS as f32;
    let mut histogram = vec![0.0f32; SHOT_DESCRIPTOR_LEN];
    let mut contributors = 0usize;

    for &(idx, d) in &neighbors {
        let normal = &surface.normals()[idx];
        if d <= f32::EPSILON || !normal.is_finite() {
            continue;
        }

        let local = frame.to_local(&(surface.points()[idx] - center));

        let azimuth = local.y.atan2(local.x) + PI;
        let azimuth_bin = ((azimuth / sector_width) as usize).min(AZIMUTH_BINS - 1);
        let elevation_bin = usize::from(local.z >= 0.0);
        let shell_bin = usize::from(d > radius / 2.0);
        let volume = (azimuth_bin * ELEVATION_BINS + elevation_bin) * RADIAL_BINS + shell_bin;

        // Normal sign is viewpoint dependent, only its tilt from z is kept
        let cosine = normal.normal.dot(&z_axis).abs().min(1.0);
        let position = cosine * (COSINE_BINS - 1) as f32;
        let lower = (position.floor() as usize).min(COSINE_BINS - 1);
        let fraction = position - lower as f32;

        let base = volume * COSINE_BINS;
        histogram[base + lower] += 1.0 - fraction;
        if lower + 1 < COSINE_BINS {
            histogram[base + lower + 1] += fraction;
        }
        contributors += 1;
    }

    if contributors < MIN_SUPPORT_POINTS {
        return Descriptor::invalid(SHOT_DESCRIPTOR_LEN);
    }

    let norm = histogram.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return Descriptor::invalid(SHOT_DESCRIPTOR_LEN);
    }
    histogram.iter_mut().for_each(|v| *v /= norm);

    Descriptor::new(histogram)
}
