//! Drops a few bodies onto a static floor and reports where they end up.
//!
//! `cargo run -p drop-test -- reference` forces the analytic backend; the
//! default is the most capable backend compiled in.

use dfx_physics::bridge::protocol::{pack_states, STATE_DOUBLES};
use dfx_physics::{
    BackendKind, BodyDesc, BodyKind, PhysicsResult, Ray, World, WorldConfig,
};
use glam::DVec3;
use log::{error, info};

const SIM_SECONDS: f64 = 3.0;
const FRAME_DT: f64 = 1.0 / 30.0;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let kind = match std::env::args().nth(1).as_deref() {
        Some("reference") => BackendKind::Reference,
        Some("rapier") => BackendKind::Rapier,
        _ => BackendKind::preferred(),
    };

    if let Err(err) = run(kind) {
        error!("drop-test failed: {}", err);
        std::process::exit(1);
    }
}

fn run(kind: BackendKind) -> PhysicsResult<()> {
    let world = World::with_backend(WorldConfig::default(), kind)?;
    info!("Backend: {} {:?}", kind.name(), world.capabilities());

    world.create_body(
        &BodyDesc::cuboid(DVec3::new(20.0, 1.0, 20.0))
            .with_kind(BodyKind::Static)
            .with_position(DVec3::new(0.0, -0.5, 0.0)),
    )?;

    let drops = [
        BodyDesc::sphere(0.5).with_position(DVec3::new(-2.0, 5.0, 0.0)),
        BodyDesc::cuboid(DVec3::ONE).with_mass(4.0).with_position(DVec3::new(0.0, 8.0, 0.0)),
        BodyDesc::capsule(0.3, 0.6).with_position(DVec3::new(2.0, 6.0, 0.0)),
    ];
    let handles = drops
        .iter()
        .map(|desc| world.create_body(desc))
        .collect::<PhysicsResult<Vec<_>>>()?;

    let mut contacts = 0;
    let frames = (SIM_SECONDS / FRAME_DT).round() as u32;
    for _ in 0..frames {
        world.advance(FRAME_DT)?;
        contacts += world.drain_contacts(usize::MAX).len();
    }

    let rows = world.body_states(&handles)?;
    for row in &rows {
        let s = row.state;
        info!(
            "body {}: pos=({:.3}, {:.3}, {:.3}) vel.y={:.3}",
            row.handle.0, s.position.x, s.position.y, s.position.z, s.linear_velocity.y
        );
    }
    let packed = pack_states(&rows);
    info!(
        "{} rows packed into {} doubles ({} per body)",
        rows.len(),
        packed.len(),
        STATE_DOUBLES
    );

    let down = Ray::new(DVec3::new(0.0, 20.0, 0.0), DVec3::NEG_Y, 50.0);
    match world.raycast(&down)? {
        Some(hit) => info!(
            "ray hit body {} at distance {:.3}, normal {:?}",
            hit.handle.0, hit.distance, hit.normal
        ),
        None => info!("ray hit nothing"),
    }

    info!(
        "Simulated {:.2}s, {} contacts reported",
        world.simulation_time(),
        contacts
    );
    Ok(())
}
