//! Synthetic recognition demo
//!
//! Builds a wavy surface patch as the model, hides a rigidly moved copy of it
//! in a scene next to some clutter, and reports every instance the pipeline
//! finds.
//!
//! Usage:
//!   cargo run -p recog3d-demos --bin synthetic_recognition
//!   cargo run -p recog3d-demos --bin synthetic_recognition -- --algorithm gc --cg-size 0.01 --cg-thresh 5
//!   cargo run -p recog3d-demos --bin synthetic_recognition -- -r --model-ss 2 --scene-ss 2 --rf-rad 5 --descr-rad 6

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recog3d_core::{Bounded, Point, PointCloud, Transformable};
use recog3d_pipeline::{
    ClusteringStrategy, GeometricConsistencyConfig, HoughConfig, RecognitionConfig, RecognitionPipeline,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// Hough voting in a 3D accumulator
    Hough,
    /// Pairwise geometric consistency
    Gc,
}

/// Find a synthetic model in a cluttered synthetic scene
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Clustering algorithm
    #[arg(short, long, value_enum, default_value = "hough")]
    algorithm: Algorithm,

    /// Interpret every length in units of model resolution
    #[arg(short = 'r', long)]
    use_cloud_resolution: bool,

    /// Model keypoint sampling radius
    #[arg(long, default_value_t = 0.04)]
    model_ss: f32,

    /// Scene keypoint sampling radius
    #[arg(long, default_value_t = 0.04)]
    scene_ss: f32,

    /// Reference frame radius
    #[arg(long, default_value_t = 0.1)]
    rf_rad: f32,

    /// Descriptor radius
    #[arg(long, default_value_t = 0.12)]
    descr_rad: f32,

    /// Hough bin size or consistency tolerance
    #[arg(long, default_value_t = 0.05)]
    cg_size: f32,

    /// Hough vote threshold or minimum cluster size
    #[arg(long, default_value_t = 5.0)]
    cg_thresh: f32,

    /// Standard deviation of the scene noise
    #[arg(long, default_value_t = 0.0)]
    noise: f32,

    /// Seed for scene noise and clutter
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Args {
    fn config(&self) -> RecognitionConfig {
        let strategy = match self.algorithm {
            Algorithm::Hough => ClusteringStrategy::Hough(HoughConfig {
                bin_size: self.cg_size,
                threshold: self.cg_thresh,
                use_interpolation: true,
            }),
            Algorithm::Gc => ClusteringStrategy::GeometricConsistency(GeometricConsistencyConfig {
                tolerance: self.cg_size,
                min_cluster_size: self.cg_thresh.round().max(0.0) as usize,
            }),
        };

        RecognitionConfig::default()
            .with_sampling_radii(self.model_ss, self.scene_ss)
            .with_rf_radius(self.rf_rad)
            .with_descriptor_radius(self.descr_rad)
            .with_cloud_resolution(self.use_cloud_resolution)
            .with_reference_frames(self.algorithm == Algorithm::Hough)
            .with_strategy(strategy)
    }
}

fn surface(x: f32, y: f32) -> f32 {
    0.15 * (5.0 * x + 0.3).sin() * (4.0 * y + 0.7).cos() + 0.1 * x * y + 0.05 * (13.0 * x * y).sin()
}

fn create_model() -> PointCloud<Point> {
    let mut cloud = PointCloud::new();
    for i in 0..50 {
        for j in 0..50 {
            let x = 0.01 + i as f32 * 0.02;
            let y = 0.01 + j as f32 * 0.02;
            cloud.push(Point::new(x, y, surface(x, y)));
        }
    }
    cloud
}

fn create_scene(model: &PointCloud<Point>, pose: &Isometry3<f32>, noise: f32, rng: &mut StdRng) -> PointCloud<Point> {
    let mut scene = model.clone();
    scene.transform(pose);
    for point in &mut scene.points {
        point.position += Vector3::new(
            rng.gen_range(-1.0f32..=1.0),
            rng.gen_range(-1.0f32..=1.0),
            rng.gen_range(-1.0f32..=1.0),
        ) * noise;
    }

    // Clutter: a box of random points away from the instance
    for _ in 0..2000 {
        scene.push(Point::new(
            rng.gen_range(2.0..3.0),
            rng.gen_range(-1.0..0.0),
            rng.gen_range(0.0..0.3),
        ));
    }
    scene
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let pose = Isometry3::from_parts(
        Translation3::new(1.0, -0.4, 0.08),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2),
    );
    let model = create_model();
    let scene = create_scene(&model, &pose, args.noise, &mut rng);
    info!(
        "Model: {} points, extent {:.3}; scene: {} points, extent {:.3}",
        model.len(),
        model.extent(),
        scene.len(),
        scene.extent()
    );

    let pipeline = RecognitionPipeline::new(args.config())?;
    let result = pipeline.recognize(&model, &scene)?;

    print!("{}", result.report());

    let rotation = pose.rotation.to_rotation_matrix();
    println!("\nGround truth:");
    for row in 0..3 {
        println!(
            "    | {:6.3} {:6.3} {:6.3} |",
            rotation[(row, 0)],
            rotation[(row, 1)],
            rotation[(row, 2)]
        );
    }
    let t = pose.translation.vector;
    println!("    t = < {:.3}, {:.3}, {:.3} >", t.x, t.y, t.z);

    Ok(())
}
