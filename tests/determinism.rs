//! Same seed and inputs give the same simulation

mod common;

use common::arena;
use mansion_hunt::movement::GROUND_GAP;
use mansion_hunt::prelude::*;

/// A small level exercising wander, chase, hazards and item drops
fn scenario(seed: u64) -> (SimSnapshot, Vec<SimEvent>) {
    let mut sim = arena(SimConfig::default().with_seed(seed));
    let physics = sim.physics_mut();
    physics.add_static_box(
        Vec3::new(0.0, 64.0, 608.0),
        Vec3::new(512.0, 64.0, 8.0),
        Quat::IDENTITY,
        tags::SOLID,
    );
    physics.add_volume(
        Vec3::new(-300.0, 1.0, 300.0),
        Vec3::new(48.0, 1.0, 48.0),
        tags::SLIP,
    );
    physics.refresh_queries();
    sim.place_loot(LootId(4), Vec3::new(300.0, 4.0, 300.0));

    sim.spawn_agent(AgentKind::Stalker, Vec3::new(-1500.0, 0.0, -1500.0), 0.0)
        .unwrap();
    sim.spawn_agent(AgentKind::Specter, Vec3::new(1500.0, 0.0, -1500.0), 0.0)
        .unwrap();

    let avatar = sim.spawn_avatar(Vec3::new(0.0, GROUND_GAP, 300.0));
    if let Ok(mut inventory) = sim.world_mut().get_mut::<Inventory>(avatar) {
        inventory.add(LootId(1), 3);
        inventory.add(LootId(2), 1);
    }

    let mut events = Vec::new();
    for tick in 0..900u32 {
        let input = match (tick / 60) % 4 {
            0 => MoveInput::new(Vec2::new(1.0, 0.0), 0.0).running(),
            1 => MoveInput::new(Vec2::new(-1.0, 0.0), 0.0).running(),
            2 => MoveInput::new(Vec2::new(0.0, -1.0), 0.0).running().jumping(),
            _ => MoveInput::new(Vec2::new(0.0, -1.0), 0.0).running(),
        };
        sim.set_input(avatar, input);
        sim.tick();
        events.extend(sim.events().iter().cloned());
    }
    (sim.snapshot(), events)
}

#[test]
fn test_same_seed_same_snapshot() {
    let (first, first_events) = scenario(7);
    let (second, second_events) = scenario(7);
    assert_eq!(first, second);
    assert_eq!(first_events, second_events);
    assert_eq!(first.tick, 900);
    assert_eq!(first.agents.len(), 2);
}

#[test]
fn test_snapshot_text_is_stable() {
    let (first, _) = scenario(11);
    let (second, _) = scenario(11);
    assert_eq!(first.to_ron_string().unwrap(), second.to_ron_string().unwrap());
}
