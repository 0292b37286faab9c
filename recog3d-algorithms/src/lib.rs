//! # recog3d Algorithms
//!
//! The stages of local-feature 3D object recognition.
//!
//! This crate provides surface normal estimation, uniform keypoint sampling,
//! local reference frames, SHOT descriptors, descriptor matching and
//! correspondence grouping into pose hypotheses, together with the spatial
//! indices they share.

pub mod nearest_neighbor;
pub mod normals;
pub mod keypoints;
pub mod surface;
pub mod reference_frames;
pub mod descriptors;
pub mod matching;
pub mod registration;
pub mod grouping;
pub mod point_cloud_ops;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use normals::*;
pub use keypoints::*;
pub use surface::*;
pub use reference_frames::*;
pub use descriptors::*;
pub use matching::*;
pub use registration::*;
pub use grouping::*;
pub use point_cloud_ops::*;
