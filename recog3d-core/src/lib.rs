//! Core data structures and traits for recog3d
//!
//! This crate provides the plain data exchanged between recognition stages:
//! points and clouds, keypoint sets, normals, local reference frames,
//! descriptors, correspondences and pose hypotheses.

pub mod point;
pub mod point_cloud;
pub mod features;
pub mod correspondence;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use features::*;
pub use correspondence::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
