mod endpoint;

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use dissim::pdu::DeadReckoningAlgorithm;
use dissim::{
    DetonationPdu, EntityId, EntityStatePdu, Exercise, ExerciseConfig, FirePdu, GeodeticCoord,
    MarkingText, PublisherConfig, SceneEuler, SceneOrigin, scene_euler_to_orientation,
};
use endpoint::UdpEndpoint;

#[derive(Parser)]
#[command(name = "dissim-node")]
#[command(about = "Headless exercise participant")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = dissim::DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = "255.255.255.255")]
    broadcast: String,

    #[arg(short, long, default_value_t = 1)]
    exercise_id: u8,

    #[arg(short, long, default_value_t = 30)]
    tick_rate: u32,

    #[arg(long, default_value_t = 0.0, help = "Scene origin latitude in degrees")]
    origin_lat: f64,

    #[arg(long, default_value_t = 0.0, help = "Scene origin longitude in degrees")]
    origin_lon: f64,

    #[arg(long, help = "Publish a stationary entity with this site:app:entity id")]
    publish: Option<EntityId>,

    #[arg(long, default_value_t = 0.0)]
    lat: f64,

    #[arg(long, default_value_t = 0.0)]
    lon: f64,

    #[arg(long, default_value_t = 0.0)]
    alt: f64,

    #[arg(long, default_value_t = 0.0, help = "Heading in degrees clockwise from north")]
    heading: f64,

    #[arg(long, default_value = "DISSIM")]
    marking: String,

    #[arg(long, help = "Stop after this many seconds")]
    run_for: Option<u64>,
}

fn stationary_entity(args: &Args, id: EntityId) -> EntityStatePdu {
    let position = GeodeticCoord::new(args.lat, args.lon, args.alt);
    let mut state = EntityStatePdu {
        entity_id: id,
        location: position.to_geocentric().into(),
        orientation: scene_euler_to_orientation(
            SceneEuler::new(0.0, args.heading, 0.0),
            position.lat_lon(),
        ),
        marking: MarkingText::ascii(args.marking.as_str()),
        ..Default::default()
    };
    state.dead_reckoning.algorithm = DeadReckoningAlgorithm::Static;
    state
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let broadcast_addr: SocketAddr = format!("{}:{}", args.broadcast, args.port)
        .parse()
        .with_context(|| format!("invalid broadcast address {}", args.broadcast))?;

    let endpoint = UdpEndpoint::bind(&bind_addr, broadcast_addr)
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    log::info!(
        "Exercise {} on {} (broadcasting to {})",
        args.exercise_id,
        endpoint.local_addr(),
        endpoint.broadcast_addr()
    );

    let config = ExerciseConfig {
        exercise_id: args.exercise_id,
        scene_origin: SceneOrigin::new(args.origin_lat, args.origin_lon),
        ..Default::default()
    };
    let mut exercise = Exercise::new(endpoint, config);

    exercise
        .connection_mut()
        .subscribe::<FirePdu>(|fire| {
            log::info!(
                "{} fired at {} (range {:.0} m)",
                fire.firing_entity_id,
                fire.target_entity_id,
                fire.range
            );
        })
        .context("fire subscription")?;
    exercise
        .connection_mut()
        .subscribe::<DetonationPdu>(|detonation| {
            log::info!(
                "detonation from {}: {:?}",
                detonation.firing_entity_id,
                detonation.result
            );
        })
        .context("detonation subscription")?;

    if let Some(id) = args.publish {
        exercise.add_publisher(stationary_entity(&args, id), PublisherConfig::default());
        log::info!("Publishing {id} at {:.6}, {:.6}", args.lat, args.lon);
    }

    let tick = Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64);
    let started = Instant::now();
    let deadline = args.run_for.map(|secs| started + Duration::from_secs(secs));
    let mut next_tick = started;
    let mut next_report = started + Duration::from_secs(10);

    loop {
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            break;
        }

        exercise.tick(now);

        if now >= next_report {
            let stats = exercise.connection().stats();
            log::info!(
                "{} remote entities, {} sent, {} received, {} dropped",
                exercise.directory().len(),
                stats.datagrams_sent,
                stats.datagrams_received,
                stats.foreign_exercise + stats.unregistered_kind + stats.malformed
            );
            next_report += Duration::from_secs(10);
        }

        next_tick += tick;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    log::info!("Node shutting down");
    Ok(())
}
