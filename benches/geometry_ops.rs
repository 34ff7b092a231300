//! Benchmarks for hulls and triangulations.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Point2, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessel::prelude::*;

fn random_points2(n: usize, seed: u64) -> Vec<Point2<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| Point2::new(rng.gen::<f64>(), rng.gen::<f64>())).collect()
}

fn random_points3(n: usize, seed: u64) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| Point3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()))
        .collect()
}

fn bench_hull2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("hull2d");
    for n in [100, 1_000, 10_000] {
        let points = random_points2(n, 1);
        let options = HullOptions::default();
        group.bench_with_input(BenchmarkId::new("jarvis_march", n), &points, |b, points| {
            b.iter(|| jarvis_march(points, &options).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("quickhull", n), &points, |b, points| {
            b.iter(|| quickhull(points, &options).unwrap())
        });
    }
    group.finish();
}

fn bench_hull3d(c: &mut Criterion) {
    let mut group = c.benchmark_group("hull3d");
    group.sample_size(20);
    let points = random_points3(2_000, 2);
    group.bench_function("parallel_2000", |b| {
        b.iter(|| convex_hull_3d(&points, &Hull3dOptions::default()).unwrap())
    });
    group.bench_function("sequential_2000", |b| {
        b.iter(|| convex_hull_3d(&points, &Hull3dOptions::default().sequential()).unwrap())
    });
    group.finish();
}

fn bench_delaunay(c: &mut Criterion) {
    let mut group = c.benchmark_group("delaunay");
    group.sample_size(20);
    for n in [100, 1_000, 5_000] {
        let points = NormalizedPoints::assume_normalized(random_points2(n, 3));
        group.bench_with_input(BenchmarkId::new("triangulate", n), &points, |b, points| {
            b.iter(|| triangulate(points, &DelaunayOptions::default()).unwrap())
        });
    }

    let points = NormalizedPoints::assume_normalized(random_points2(1_000, 4));
    let mesh = tessel::algo::delaunay::triangulate_points(&points).unwrap();
    group.bench_function("flip_to_delaunay_1000", |b| {
        b.iter(|| {
            let mut mesh = mesh.clone();
            delaunay_by_flipping(&mut mesh, &DelaunayOptions::default()).unwrap()
        })
    });

    let obstacle = vec![Point2::new(0.3, 0.3), Point2::new(0.7, 0.35), Point2::new(0.5, 0.8)];
    group.bench_function("obstacle_insert_remove_1000", |b| {
        let mut cdt = ConstrainedTriangulation::new(&points, DelaunayOptions::default()).unwrap();
        b.iter(|| {
            let id = cdt.insert_obstacle(&obstacle).unwrap();
            cdt.remove_obstacle(id).unwrap();
        })
    });
    group.finish();
}

fn bench_voronoi(c: &mut Criterion) {
    let points = NormalizedPoints::assume_normalized(random_points2(1_000, 5));
    let mesh = triangulate(&points, &DelaunayOptions::default()).unwrap();
    c.bench_function("voronoi_from_delaunay_1000", |b| {
        b.iter(|| voronoi_from_delaunay(&mesh).unwrap())
    });
}

criterion_group!(benches, bench_hull2d, bench_hull3d, bench_delaunay, bench_voronoi);
criterion_main!(benches);
