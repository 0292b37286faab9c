//! Model-in-scene recognition pipeline
//!
//! Runs the stages in order for one (model, scene) pair: normals, keypoints,
//! descriptors and reference frames for each cloud, then descriptor matching
//! and correspondence grouping. Model and scene are prepared concurrently.

use crate::config::RecognitionConfig;
use log::{debug, info, log_enabled, warn, Level};
use recog3d_algorithms::{
    alignment_error, compute_shot_descriptors, estimate_normals_indexed, estimate_reference_frames,
    find_correspondences, uniform_sampling, GroupingInput, PointCloudResolution, SearchSurface, SpatialIndex,
};
use recog3d_core::{
    CloudRole, Correspondence, Descriptor, Error, Keypoints, Point, Point3f, PointCloud, PoseHypothesis,
    ReferenceFrame, Result,
};

/// Error type produced by external cloud loaders
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can deliver a point cloud, such as a file reader or a sensor
pub trait CloudSource {
    fn load(&self) -> std::result::Result<PointCloud<Point>, SourceError>;
}

impl<F> CloudSource for F
where
    F: Fn() -> std::result::Result<PointCloud<Point>, SourceError>,
{
    fn load(&self) -> std::result::Result<PointCloud<Point>, SourceError> {
        self()
    }
}

/// Outcome of one recognition run
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// One entry per detected instance
    pub hypotheses: Vec<PoseHypothesis>,
    pub model_keypoints: Keypoints<Point>,
    pub scene_keypoints: Keypoints<Point>,
    /// Every accepted model-scene match, clustered or not
    pub correspondences: Vec<Correspondence>,
}

impl RecognitionResult {
    fn empty() -> Self {
        Self {
            hypotheses: Vec::new(),
            model_keypoints: Keypoints::empty(),
            scene_keypoints: Keypoints::empty(),
            correspondences: Vec::new(),
        }
    }

    /// Number of detected model instances
    pub fn instance_count(&self) -> usize {
        self.hypotheses.len()
    }

    /// RMS distance between the supporting scene keypoints and their model
    /// keypoints carried over by the hypothesis pose
    pub fn alignment_error(&self, hypothesis: &PoseHypothesis) -> f32 {
        let model = self.model_keypoints.cloud.positions();
        let scene = self.scene_keypoints.cloud.positions();
        let (source, target): (Vec<Point3f>, Vec<Point3f>) = hypothesis
            .correspondences
            .iter()
            .filter_map(|c| Some((*model.get(c.model_index)?, *scene.get(c.scene_index)?)))
            .unzip();
        alignment_error(&hypothesis.transform, &source, &target)
    }
}

/// Per-cloud artifacts feeding matching and grouping
struct CloudFeatures {
    keypoints: Keypoints<Point>,
    positions: Vec<Point3f>,
    descriptors: Vec<Descriptor>,
    frames: Option<Vec<ReferenceFrame>>,
}

/// Local-feature recognition of a model in a scene
#[derive(Debug, Clone)]
pub struct RecognitionPipeline {
    config: RecognitionConfig,
}

impl RecognitionPipeline {
    /// Create a pipeline, rejecting inconsistent configurations up front
    pub fn new(config: RecognitionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Load both clouds from external sources and recognize
    ///
    /// A failing source aborts the run with [`Error::InputUnavailable`].
    pub fn recognize_sources<M, S>(&self, model: &M, scene: &S) -> Result<RecognitionResult>
    where
        M: CloudSource + ?Sized,
        S: CloudSource + ?Sized,
    {
        let model = model.load().map_err(|e| Error::InputUnavailable {
            role: CloudRole::Model,
            reason: e.to_string(),
        })?;
        let scene = scene.load().map_err(|e| Error::InputUnavailable {
            role: CloudRole::Scene,
            reason: e.to_string(),
        })?;
        self.recognize(&model, &scene)
    }

    /// Find instances of `model` in `scene`
    ///
    /// An empty model is an error. An empty scene is a valid input in which
    /// nothing can be found.
    pub fn recognize(&self, model: &PointCloud<Point>, scene: &PointCloud<Point>) -> Result<RecognitionResult> {
        if model.is_empty() {
            return Err(Error::EmptyCloud { role: CloudRole::Model });
        }

        let config = if self.config.use_cloud_resolution {
            let resolution = model.resolution();
            if !(resolution > 0.0) {
                return Err(Error::InvalidData(format!(
                    "model resolution is {}, cannot scale lengths by it",
                    resolution
                )));
            }
            info!("Model resolution: {}", resolution);
            let scaled = self.config.scaled(resolution);
            debug!(
                "Scaled radii: model {} scene {} rf {} descriptor {}",
                scaled.model_sampling_radius, scaled.scene_sampling_radius, scaled.rf_radius, scaled.descriptor_radius
            );
            scaled
        } else {
            self.config.clone()
        };

        if scene.is_empty() {
            warn!("Scene cloud is empty, no instances can be found");
            return Ok(RecognitionResult::empty());
        }

        let (model_features, scene_features) = rayon::join(
            || prepare(model, config.model_sampling_radius, &config, CloudRole::Model),
            || prepare(scene, config.scene_sampling_radius, &config, CloudRole::Scene),
        );
        let model_features = model_features?;
        let scene_features = scene_features?;

        let correspondences = find_correspondences(
            &model_features.descriptors,
            &scene_features.descriptors,
            config.match_threshold,
        )?;
        info!("Correspondences found: {}", correspondences.len());

        let mut input = GroupingInput::new(
            &model_features.positions,
            &scene_features.positions,
            &correspondences,
        );
        if let (Some(model_frames), Some(scene_frames)) = (&model_features.frames, &scene_features.frames) {
            input = input.with_frames(model_frames, scene_frames);
        }

        let hypotheses = config.strategy.grouping().group(&input)?;
        info!(
            "Model instances found: {} ({} clustering)",
            hypotheses.len(),
            config.strategy.name()
        );

        let result = RecognitionResult {
            hypotheses,
            model_keypoints: model_features.keypoints,
            scene_keypoints: scene_features.keypoints,
            correspondences,
        };
        if log_enabled!(Level::Debug) {
            for (i, hypothesis) in result.hypotheses.iter().enumerate() {
                debug!(
                    "Instance {}: support {}, score {}, alignment error {}",
                    i + 1,
                    hypothesis.support(),
                    hypothesis.score,
                    result.alignment_error(hypothesis)
                );
            }
        }

        Ok(result)
    }
}

fn prepare(
    cloud: &PointCloud<Point>,
    sampling_radius: f32,
    config: &RecognitionConfig,
    role: CloudRole,
) -> Result<CloudFeatures> {
    let points = cloud.positions();
    let index = SpatialIndex::new(&points);
    let normals = estimate_normals_indexed(&points, &index, config.normal_k, &Point3f::origin())?;

    let keypoints = uniform_sampling(cloud, sampling_radius)?;
    info!(
        "Selected {} keypoints from {} {} points",
        keypoints.len(),
        cloud.len(),
        role
    );

    let surface = SearchSurface::new(&points, &normals, &index)?;
    let descriptors = compute_shot_descriptors(&keypoints, &surface, config.descriptor_radius)?;

    let frames = if config.compute_reference_frames {
        Some(estimate_reference_frames(
            &keypoints,
            &surface,
            config.rf_radius,
            config.find_holes,
        )?)
    } else {
        None
    };

    let positions = keypoints.cloud.positions();
    Ok(CloudFeatures {
        keypoints,
        positions,
        descriptors,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cloud() -> PointCloud<Point> {
        (0..20)
            .flat_map(|i| (0..20).map(move |j| (i, j)))
            .map(|(i, j)| {
                let x = i as f32 * 0.01;
                let y = j as f32 * 0.01;
                Point::new(x, y, 0.05 * (20.0 * x).sin() + 0.03 * (15.0 * y).cos())
            })
            .collect()
    }

    #[test]
    fn test_empty_model_is_an_error() {
        let pipeline = RecognitionPipeline::new(RecognitionConfig::default()).unwrap();
        let result = pipeline.recognize(&PointCloud::new(), &small_cloud());
        assert!(matches!(result, Err(Error::EmptyCloud { role: CloudRole::Model })));
    }

    #[test]
    fn test_empty_scene_finds_nothing() {
        let pipeline = RecognitionPipeline::new(RecognitionConfig::default()).unwrap();
        let result = pipeline.recognize(&small_cloud(), &PointCloud::new()).unwrap();
        assert_eq!(result.instance_count(), 0);
        assert!(result.scene_keypoints.is_empty());
        assert!(result.correspondences.is_empty());
    }

    #[test]
    fn test_failing_source_is_input_unavailable() {
        let pipeline = RecognitionPipeline::new(RecognitionConfig::default()).unwrap();
        let model = || -> std::result::Result<PointCloud<Point>, SourceError> { Ok(small_cloud()) };
        let scene = || -> std::result::Result<PointCloud<Point>, SourceError> { Err("no such file: scene.pcd".into()) };

        match pipeline.recognize_sources(&model, &scene) {
            Err(Error::InputUnavailable { role, reason }) => {
                assert_eq!(role, CloudRole::Scene);
                assert!(reason.contains("scene.pcd"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_inconsistent_config_is_rejected_up_front() {
        let config = RecognitionConfig::default().with_reference_frames(false);
        assert!(matches!(RecognitionPipeline::new(config), Err(Error::InvalidConfig(_))));
    }
}
