//! Shared fixtures for integration tests

#![allow(dead_code)]

use mansion_hunt::prelude::*;

/// Half size of the test arena
pub const ARENA: f32 = 2048.0;

/// Navigation grid covering the whole arena
pub fn arena_grid() -> NavGrid {
    NavGrid::new(128, 128, 32.0).with_origin(Vec2::splat(-ARENA))
}

/// Simulation over a flat floor with a running level and no agents
pub fn arena(config: SimConfig) -> Simulation {
    logging::init(false);
    let mut sim = Simulation::new(config, Box::new(arena_grid())).expect("valid config");
    let physics = sim.physics_mut();
    physics.add_static_box(
        Vec3::new(0.0, -8.0, 0.0),
        Vec3::new(ARENA, 8.0, ARENA),
        Quat::IDENTITY,
        tags::SOLID,
    );
    physics.refresh_queries();

    let bounds = Bounds::new(
        Vec3::new(-ARENA + 64.0, 0.0, -ARENA + 64.0),
        Vec3::new(ARENA - 64.0, 0.0, ARENA - 64.0),
    );
    sim.activate_level(LevelContext::new(LevelKind::Mansion, bounds))
        .expect("level activates");
    sim
}

/// Run `ticks` ticks, collecting every event emitted along the way
pub fn run(sim: &mut Simulation, ticks: u32) -> Vec<SimEvent> {
    let mut seen = Vec::new();
    for _ in 0..ticks {
        sim.tick();
        seen.extend(sim.events().iter().cloned());
    }
    seen
}

/// Entity id as it appears in snapshots
pub fn id(entity: Entity) -> u64 {
    entity.to_bits().get()
}
