//! Benchmarks for the per-point and per-keypoint recognition stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use recog3d_algorithms::{
    compute_shot_descriptors, estimate_normals_indexed, find_correspondences, uniform_sampling, SearchSurface,
    SpatialIndex,
};
use recog3d_core::{Point3f, PointCloud};

fn generate_surface(size: usize) -> PointCloud<Point3f> {
    let step = 1.0 / size as f32;
    let mut cloud = PointCloud::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 * step;
            let fy = y as f32 * step;
            let z = 0.15 * (5.0 * fx + 0.3).sin() * (4.0 * fy + 0.7).cos() + 0.1 * fx * fy;
            cloud.push(Point3f::new(fx, fy, z));
        }
    }
    cloud
}

fn bench_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("normals");

    for &size in &[50, 100, 200] {
        let cloud = generate_surface(size);
        let points = cloud.positions();
        let index = SpatialIndex::new(&points);

        group.bench_with_input(BenchmarkId::new("pca_k10", points.len()), &points, |b, points| {
            b.iter(|| {
                let normals = estimate_normals_indexed(black_box(points), &index, 10, &Point3f::origin()).unwrap();
                black_box(normals);
            });
        });
    }

    group.finish();
}

fn bench_descriptors_and_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptors");

    for &size in &[100, 200] {
        let cloud = generate_surface(size);
        let points = cloud.positions();
        let index = SpatialIndex::new(&points);
        let normals = estimate_normals_indexed(&points, &index, 10, &Point3f::origin()).unwrap();
        let surface = SearchSurface::new(&points, &normals, &index).unwrap();
        let keypoints = uniform_sampling(&cloud, 0.03).unwrap();

        group.bench_with_input(BenchmarkId::new("shot", keypoints.len()), &keypoints, |b, keypoints| {
            b.iter(|| {
                let descriptors = compute_shot_descriptors(black_box(keypoints), &surface, 0.08).unwrap();
                black_box(descriptors);
            });
        });

        let descriptors = compute_shot_descriptors(&keypoints, &surface, 0.08).unwrap();
        group.bench_with_input(
            BenchmarkId::new("match", descriptors.len()),
            &descriptors,
            |b, descriptors| {
                b.iter(|| {
                    let correspondences = find_correspondences(black_box(descriptors), descriptors, 0.25).unwrap();
                    black_box(correspondences);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_normals, bench_descriptors_and_matching);
criterion_main!(benches);
