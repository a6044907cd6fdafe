//! Flocking benchmarks for flockball
//!
//! Measures force computation, overlap refresh and full ticks at various flock sizes.
//!
//! Run with: cargo bench --bench flocking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flockball::config::SimConfig;
use flockball::flock::compute_forces;
use flockball::flock::constants::{ball, boid};
use flockball::physics::spatial::{SpatialEntry, SpatialGrid};
use flockball::physics::{BodyDesc, BodyId, PhysicsWorld};
use flockball::sim::Simulation;
use flockball::util::vec3::Vec3;
use rand::Rng;

const DT: f32 = 1.0 / 60.0;

/// Spawn radius that keeps roughly the same density at every flock size
fn spawn_radius(count: usize) -> f32 {
    250.0 * (count as f32).sqrt()
}

fn random_ground_point(rng: &mut impl Rng, radius: f32) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let r = radius * rng.gen::<f32>().sqrt();
    Vec3::new(angle.cos() * r, angle.sin() * r, boid::RADIUS)
}

/// Create a simulation with one ball and `count` randomly placed boids
fn create_sim_with_boids(count: usize) -> Simulation {
    let mut sim = match Simulation::new(SimConfig::default()) {
        Ok(sim) => sim,
        Err(e) => panic!("default config rejected: {e}"),
    };
    let mut rng = rand::thread_rng();
    let radius = spawn_radius(count);

    sim.spawn_ball(Vec3::new(0.0, 0.0, ball::RADIUS));
    for _ in 0..count {
        let velocity = Vec3::new(rng.gen_range(-200.0..200.0), rng.gen_range(-200.0..200.0), 0.0);
        sim.spawn_boid(random_ground_point(&mut rng, radius), velocity);
    }

    // Settle the initial overlap events
    for _ in 0..2 {
        let _ = sim.tick(DT);
    }
    sim
}

/// Benchmark the force pass of a single boid against a crowded neighbourhood
fn bench_compute_forces(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_forces");
    group.sample_size(50);

    for neighbors in [8, 32, 128, 512] {
        let mut world = PhysicsWorld::default();
        let mut rng = rand::thread_rng();
        let ids: Vec<BodyId> = (0..neighbors)
            .map(|_| {
                let velocity = Vec3::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0), 0.0);
                world.add_body(BodyDesc::boid(random_ground_point(&mut rng, 900.0), velocity))
            })
            .collect();

        group.throughput(Throughput::Elements(neighbors as u64));
        group.bench_with_input(BenchmarkId::new("neighbors", neighbors), &neighbors, |b, _| {
            b.iter(|| {
                black_box(compute_forces(
                    black_box(Vec3::new(0.0, 0.0, boid::RADIUS)),
                    ids.iter().map(|id| world.participant(*id)),
                    1.0,
                ))
            })
        });
    }
    group.finish();
}

/// Benchmark a full simulation tick at various flock sizes
fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");
    group.sample_size(30);

    for count in [50, 100, 250, 500, 1000] {
        let mut sim = create_sim_with_boids(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("complete", count), &count, |b, _| {
            b.iter(|| black_box(sim.tick(black_box(DT))))
        });
    }
    group.finish();
}

/// Benchmark physics integration plus detector overlap refresh
fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    group.sample_size(50);

    for count in [100, 500, 1000] {
        let mut world = PhysicsWorld::default();
        let mut rng = rand::thread_rng();
        let radius = spawn_radius(count);
        let mut detectors = Vec::with_capacity(count);
        for _ in 0..count {
            let id = world.add_body(BodyDesc::boid(random_ground_point(&mut rng, radius), Vec3::ZERO));
            detectors.push(world.register_detector(id, boid::DETECTION_RADIUS));
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("step", count), &count, |b, _| {
            b.iter(|| {
                world.step(black_box(DT));
                black_box(world.drain_events())
            })
        });
    }
    group.finish();
}

/// Benchmark spatial grid build and query time
fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    group.sample_size(50);

    for count in [100, 500, 1000, 2000] {
        let mut rng = rand::thread_rng();
        let radius = spawn_radius(count);
        let entries: Vec<SpatialEntry> = (0..count)
            .map(|i| SpatialEntry {
                id: BodyId(i as u64),
                position: random_ground_point(&mut rng, radius),
                radius: boid::RADIUS,
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("build_and_query", count), &count, |b, _| {
            b.iter(|| {
                let mut grid = SpatialGrid::default();
                for entry in &entries {
                    grid.insert(*entry);
                }
                black_box(grid.query_sphere(Vec3::ZERO, boid::DETECTION_RADIUS))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_compute_forces,
    bench_full_tick,
    bench_world_step,
    bench_spatial_grid,
);

criterion_main!(benches);
