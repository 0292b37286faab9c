//! End-to-end recognition of a known model in a scene
//!
//! This crate wires the stages from `recog3d-algorithms` into a single run:
//! - `RecognitionConfig` holds every tuning parameter of a run
//! - `RecognitionPipeline` validates the configuration once and recognizes
//!   any number of (model, scene) pairs with it
//! - `CloudSource` lets external loaders supply the clouds
//! - `RecognitionResult` carries the pose hypotheses plus keypoints and
//!   correspondences for visualization, and formats a text report

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::*;
pub use pipeline::*;
