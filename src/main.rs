//! Headless demo: one avatar, one stalker, a door, some loot and a wet floor

use mansion_hunt::prelude::*;

/// Ticks to simulate (20 s at 60 Hz)
const DEMO_TICKS: u32 = 1200;

/// Navigation grid matching the walls built by [`build_level`]
fn build_grid() -> NavGrid {
    let mut grid = NavGrid::new(32, 32, 32.0).with_origin(Vec2::new(-512.0, -512.0));
    grid.block_rect(Vec2::new(-512.0, -108.0), Vec2::new(-64.0, -92.0));
    grid.block_rect(Vec2::new(64.0, -108.0), Vec2::new(512.0, -92.0));
    grid
}

/// Build a walled room with a doorway in its middle wall
fn build_level(sim: &mut Simulation) -> Entity {
    let physics = sim.physics_mut();

    // Floor
    physics.add_static_box(
        Vec3::new(0.0, -8.0, 0.0),
        Vec3::new(512.0, 8.0, 512.0),
        Quat::IDENTITY,
        tags::SOLID,
    );

    // Outer walls
    for (center, half) in [
        (Vec3::new(0.0, 64.0, -520.0), Vec3::new(528.0, 64.0, 8.0)),
        (Vec3::new(0.0, 64.0, 520.0), Vec3::new(528.0, 64.0, 8.0)),
        (Vec3::new(-520.0, 64.0, 0.0), Vec3::new(8.0, 64.0, 528.0)),
        (Vec3::new(520.0, 64.0, 0.0), Vec3::new(8.0, 64.0, 528.0)),
    ] {
        physics.add_static_box(center, half, Quat::IDENTITY, tags::SOLID);
    }

    // Middle wall split by a 128 unit doorway
    for (center, half) in [
        (Vec3::new(-288.0, 64.0, -100.0), Vec3::new(224.0, 64.0, 8.0)),
        (Vec3::new(288.0, 64.0, -100.0), Vec3::new(224.0, 64.0, 8.0)),
    ] {
        physics.add_static_box(center, half, Quat::IDENTITY, tags::SOLID);
    }

    let panel = physics.add_static_box(
        Vec3::new(0.0, 64.0, -100.0),
        Vec3::new(64.0, 64.0, 4.0),
        Quat::IDENTITY,
        tags::DOOR,
    );

    // Wet patch in front of the avatar's start
    physics.add_volume(
        Vec3::new(-150.0, 1.0, 250.0),
        Vec3::new(48.0, 1.0, 48.0),
        tags::SLIP,
    );
    physics.refresh_queries();

    sim.place_loot(LootId(7), Vec3::new(150.0, 4.0, 250.0));
    sim.spawn_door(Vec3::new(0.0, 0.0, -100.0), Some(panel))
}

/// Scripted avatar input by elapsed seconds
fn script(seconds: f64) -> MoveInput {
    match seconds {
        t if t < 2.0 => MoveInput::new(Vec2::new(1.0, 0.0), 0.0).running(),
        t if t < 4.0 => MoveInput::new(Vec2::new(-1.0, 0.0), 0.0).running(),
        t if t < 4.1 => MoveInput::default().jumping(),
        _ => MoveInput::new(Vec2::new(0.0, 1.0), 0.0).running(),
    }
}

fn main() {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    logging::init(verbose);

    let mut sim = match Simulation::new(SimConfig::default(), Box::new(build_grid())) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return;
        }
    };
    let door = build_level(&mut sim);
    log::info!("door {door:?} guards the north wing");

    let level = LevelContext::new(
        LevelKind::Mansion,
        Bounds::new(Vec3::new(-480.0, 0.0, -480.0), Vec3::new(480.0, 0.0, 480.0)),
    )
    .with_spawn(AgentSpawn {
        kind: None,
        position: Vec3::new(0.0, 0.0, -400.0),
        yaw: std::f32::consts::PI,
    });
    if let Err(e) = sim.activate_level(level) {
        eprintln!("Level error: {}", e);
        return;
    }

    let avatar = sim.spawn_avatar(Vec3::new(0.0, 0.0, 250.0));
    if let Ok(mut inventory) = sim.world_mut().get_mut::<Inventory>(avatar) {
        inventory.add(LootId(1), 2);
        inventory.add(LootId(3), 1);
    }

    for _ in 0..DEMO_TICKS {
        let input = script(sim.clock().elapsed());
        sim.set_input(avatar, input);
        sim.tick();

        for event in sim.events().iter() {
            log::info!("[{:>5}] {:?}", sim.clock().tick(), event);
        }
        let alive = sim
            .world()
            .get_copied::<AvatarState>(avatar)
            .is_some_and(|state| state.alive);
        if !alive && sim.pending_tasks() == 0 {
            break;
        }
    }

    log::info!("{}", sim.stats().format_stats());
    match sim.snapshot().to_ron_string() {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Snapshot error: {}", e),
    }
}
