//! # recog3d
//!
//! Local-feature 3D object recognition for point clouds.
//!
//! This is the umbrella crate re-exporting the workspace crates. Use it to get
//! everything in one place, or depend on individual crates for finer control.
//!
//! ## Stages
//!
//! - **Core**: clouds, keypoints, normals, reference frames, descriptors, correspondences, pose hypotheses
//! - **Algorithms**: normal estimation, uniform keypoint sampling, SHOT descriptors,
//!   local reference frames, descriptor matching, Hough and geometric consistency grouping
//! - **Pipeline**: configuration, the end-to-end recognition run and its report
//!
//! ## Quick Start
//!
//! ```no_run
//! use recog3d::prelude::*;
//!
//! # fn run(model: PointCloud<Point>, scene: PointCloud<Point>) -> Result<()> {
//! let pipeline = RecognitionPipeline::new(RecognitionConfig::default())?;
//! let result = pipeline.recognize(&model, &scene)?;
//! print!("{}", result.report());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables `pipeline`
//! - `pipeline`: Configuration and the end-to-end recognition pipeline

pub use recog3d_core::*;

pub use recog3d_algorithms as algorithms;

#[cfg(feature = "pipeline")]
pub use recog3d_pipeline as pipeline;

/// Convenient imports for common use cases
pub mod prelude {
    pub use recog3d_algorithms::*;
    pub use recog3d_core::*;

    #[cfg(feature = "pipeline")]
    pub use recog3d_pipeline::*;
}
