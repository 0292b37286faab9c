//! Recognition configuration

use recog3d_algorithms::{
    CorrespondenceGrouping, GeometricConsistencyGrouping, HoughGrouping, DEFAULT_MATCH_THRESHOLD, MIN_FIT_PAIRS,
    MIN_NORMAL_NEIGHBORS,
};
use recog3d_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Hough voting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoughConfig {
    /// Edge length of a voting bin
    pub bin_size: f32,
    /// Minimum accumulated votes for an instance
    pub threshold: f32,
    /// Spread votes trilinearly over neighbouring bins
    pub use_interpolation: bool,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            bin_size: 0.01,
            threshold: 5.0,
            use_interpolation: true,
        }
    }
}

/// Geometric consistency parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometricConsistencyConfig {
    /// Allowed difference between matching model and scene distances
    pub tolerance: f32,
    /// Minimum correspondences per instance
    pub min_cluster_size: usize,
}

impl Default for GeometricConsistencyConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            min_cluster_size: 5,
        }
    }
}

/// How correspondences are clustered into instances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClusteringStrategy {
    /// Hough voting; needs reference frames
    Hough(HoughConfig),
    /// Pairwise geometric consistency
    GeometricConsistency(GeometricConsistencyConfig),
}

impl Default for ClusteringStrategy {
    fn default() -> Self {
        ClusteringStrategy::Hough(HoughConfig::default())
    }
}

impl ClusteringStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ClusteringStrategy::Hough(_) => "Hough",
            ClusteringStrategy::GeometricConsistency(_) => "GC",
        }
    }

    pub fn requires_reference_frames(&self) -> bool {
        matches!(self, ClusteringStrategy::Hough(_))
    }

    /// Grouping algorithm configured by this strategy
    pub fn grouping(&self) -> Box<dyn CorrespondenceGrouping + Send + Sync> {
        match *self {
            ClusteringStrategy::Hough(hough) => Box::new(
                HoughGrouping::new(hough.bin_size, hough.threshold).with_interpolation(hough.use_interpolation),
            ),
            ClusteringStrategy::GeometricConsistency(gc) => {
                Box::new(GeometricConsistencyGrouping::new(gc.tolerance, gc.min_cluster_size))
            }
        }
    }

    fn scaled(self, factor: f32) -> Self {
        match self {
            ClusteringStrategy::Hough(hough) => ClusteringStrategy::Hough(HoughConfig {
                bin_size: hough.bin_size * factor,
                ..hough
            }),
            ClusteringStrategy::GeometricConsistency(gc) => {
                ClusteringStrategy::GeometricConsistency(GeometricConsistencyConfig {
                    tolerance: gc.tolerance * factor,
                    ..gc
                })
            }
        }
    }
}

/// Parameters of one recognition run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Keypoint spacing on the model
    pub model_sampling_radius: f32,
    /// Keypoint spacing on the scene
    pub scene_sampling_radius: f32,
    /// Support radius of the reference frames
    pub rf_radius: f32,
    /// Support radius of the descriptors
    pub descriptor_radius: f32,
    /// Neighbours used per normal
    pub normal_k: usize,
    /// Squared descriptor distance below which a match is kept
    pub match_threshold: f32,
    /// Estimate keypoint reference frames
    pub compute_reference_frames: bool,
    /// Re-aim frame x axes at gaps in the support boundary
    pub find_holes: bool,
    /// Interpret radii, bin size and tolerance in units of model resolution
    pub use_cloud_resolution: bool,
    pub strategy: ClusteringStrategy,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            model_sampling_radius: 0.01,
            scene_sampling_radius: 0.03,
            rf_radius: 0.015,
            descriptor_radius: 0.02,
            normal_k: 10,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            compute_reference_frames: true,
            find_holes: true,
            use_cloud_resolution: false,
            strategy: ClusteringStrategy::default(),
        }
    }
}

impl RecognitionConfig {
    pub fn with_sampling_radii(mut self, model: f32, scene: f32) -> Self {
        self.model_sampling_radius = model;
        self.scene_sampling_radius = scene;
        self
    }

    pub fn with_rf_radius(mut self, radius: f32) -> Self {
        self.rf_radius = radius;
        self
    }

    pub fn with_descriptor_radius(mut self, radius: f32) -> Self {
        self.descriptor_radius = radius;
        self
    }

    pub fn with_normal_k(mut self, k: usize) -> Self {
        self.normal_k = k;
        self
    }

    pub fn with_match_threshold(mut self, threshold: f32) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_strategy(mut self, strategy: ClusteringStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_reference_frames(mut self, enabled: bool) -> Self {
        self.compute_reference_frames = enabled;
        self
    }

    pub fn with_cloud_resolution(mut self, enabled: bool) -> Self {
        self.use_cloud_resolution = enabled;
        self
    }

    /// Check the configuration for values no run could succeed with
    pub fn validate(&self) -> Result<()> {
        let radii = [
            ("model sampling radius", self.model_sampling_radius),
            ("scene sampling radius", self.scene_sampling_radius),
            ("reference frame radius", self.rf_radius),
            ("descriptor radius", self.descriptor_radius),
            ("match threshold", self.match_threshold),
        ];
        for (name, value) in radii {
            if !(value > 0.0) || !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.normal_k < MIN_NORMAL_NEIGHBORS {
            return Err(Error::InvalidConfig(format!(
                "normal estimation needs at least {} neighbours, got {}",
                MIN_NORMAL_NEIGHBORS, self.normal_k
            )));
        }

        match self.strategy {
            ClusteringStrategy::Hough(hough) => {
                if !self.compute_reference_frames {
                    return Err(Error::InvalidConfig(
                        "Hough clustering requires reference frame computation".to_string(),
                    ));
                }
                if !(hough.bin_size > 0.0) || !(hough.threshold > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "Hough bin size and threshold must be positive, got {} and {}",
                        hough.bin_size, hough.threshold
                    )));
                }
            }
            ClusteringStrategy::GeometricConsistency(gc) => {
                if !(gc.tolerance > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "consistency tolerance must be positive, got {}",
                        gc.tolerance
                    )));
                }
                if gc.min_cluster_size < MIN_FIT_PAIRS {
                    return Err(Error::InvalidConfig(format!(
                        "minimum cluster size must be at least {}, got {}",
                        MIN_FIT_PAIRS, gc.min_cluster_size
                    )));
                }
            }
        }

        Ok(())
    }

    /// Copy with every length multiplied by `resolution`
    pub fn scaled(&self, resolution: f32) -> Self {
        Self {
            model_sampling_radius: self.model_sampling_radius * resolution,
            scene_sampling_radius: self.scene_sampling_radius * resolution,
            rf_radius: self.rf_radius * resolution,
            descriptor_radius: self.descriptor_radius * resolution,
            strategy: self.strategy.scaled(resolution),
            ..self.clone()
        }
    }
}
