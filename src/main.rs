use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flockball::config::SimConfig;
use flockball::flock::constants::{ball, boid};
use flockball::flock::BallInput;
use flockball::metrics::Metrics;
use flockball::physics::BodyId;
use flockball::sim::Simulation;
use flockball::util::vec3::Vec3;

/// Seconds between scripted jumps of the ball
const JUMP_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Flockball v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: boids={}, tick_rate={}, scaling={:?}",
        config.boid_count, config.tick_rate, config.impulse_scaling
    );

    let metrics = Arc::new(Metrics::new());
    let mut sim = Simulation::new(config.clone())?.with_metrics(metrics.clone());
    let ball_id = populate(&mut sim, &config);

    let dt = config.tick_dt();
    let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run_for = async {
        if config.run_seconds == 0 {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_secs(config.run_seconds)).await;
    };
    tokio::pin!(run_for);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(shutdown);

    let ticks_per_second = u64::from(config.tick_rate.max(1));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let tick = sim.tick_count();
                sim.set_ball_input(ball_id, scripted_input(tick, ticks_per_second))?;
                sim.tick(dt)?;

                if sim.tick_count() % ticks_per_second == 0 {
                    log_summary(&sim, ball_id, &metrics);
                }
            }
            _ = &mut run_for => {
                info!("Run time elapsed");
                break;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Final metrics: {}", metrics.to_json());
    info!("Prometheus metrics:\n{}", metrics.to_prometheus());

    if config.dump_snapshot {
        println!("{}", sim.snapshot().to_json()?);
    }

    info!("Simulation stopped after {} ticks", sim.tick_count());
    Ok(())
}

/// Spawn the ball at the origin and scatter the boids in a disc around it
fn populate(sim: &mut Simulation, config: &SimConfig) -> BodyId {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let ball_id = sim.spawn_ball(Vec3::new(0.0, 0.0, ball::RADIUS));

    for _ in 0..config.boid_count {
        let angle = rng.gen_range(0.0..TAU);
        let radius = config.spawn_radius * rng.gen::<f32>().sqrt();
        let position = Vec3::new(angle.cos() * radius, angle.sin() * radius, boid::RADIUS);
        let velocity = Vec3::new(rng.gen_range(-200.0..200.0), rng.gen_range(-200.0..200.0), 0.0);
        sim.spawn_boid(position, velocity);
    }

    info!(
        "Spawned {} boids around ball {}",
        config.boid_count, ball_id
    );
    ball_id
}

/// Roll the ball in a slow circle and hop every few seconds
fn scripted_input(tick: u64, ticks_per_second: u64) -> BallInput {
    let t = tick as f32 / ticks_per_second as f32;
    BallInput {
        move_right: (t * 0.5).sin(),
        move_forward: (t * 0.5).cos(),
        jump: tick > 0 && tick % (JUMP_INTERVAL_SECS * ticks_per_second) == 0,
    }
}

fn log_summary(sim: &Simulation, ball_id: BodyId, metrics: &Metrics) {
    let snapshot = sim.snapshot();
    let ball_position = snapshot
        .agents
        .iter()
        .find(|agent| agent.id == ball_id)
        .map(|agent| agent.position);

    let spread = match (snapshot.flock_center(), ball_position) {
        (Some(center), Some(ball)) => center.distance_to(ball),
        _ => 0.0,
    };

    info!(
        tick = snapshot.tick,
        agents = snapshot.agents.len(),
        mean_neighbors = metrics.mean_neighbors(),
        flock_to_ball = spread,
        tick_us = metrics.tick_time_us.load(std::sync::atomic::Ordering::Relaxed),
        "simulation status"
    );
}
