//! Physical loot pickups

use glam::Vec3;
use hecs::Entity;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Inventory, LootId};
use crate::ecs::{Transform, World};
use crate::physics::{PhysicsProxy, PhysicsWorld};

/// Half size of a loot cube
pub const LOOT_HALF_EXTENT: f32 = 4.0;

/// A loot pickup lying in the level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    /// What it is
    pub item: LootId,
}

/// Place a resting loot pickup (a trip hazard) at `position`
pub fn place_loot(world: &mut World, physics: &mut PhysicsWorld, item: LootId, position: Vec3) -> Entity {
    let entity = world.reserve();
    let proxy = physics.add_static_loot(entity, position, LOOT_HALF_EXTENT);
    world.spawn_at(entity, (Loot { item }, Transform::from_position(position), proxy));
    entity
}

/// Knock one random item out of `inventory` and launch it from `origin`.
///
/// The launch direction is a random planar direction tilted up by 45°.
/// Returns the new loot entity and the item it carries.
pub fn eject_item(
    world: &mut World,
    physics: &mut PhysicsWorld,
    inventory: &mut Inventory,
    rng: &mut impl Rng,
    origin: Vec3,
    speed: f32,
) -> Option<(Entity, LootId)> {
    let item = inventory.random_item(rng)?;
    if !inventory.remove(item) {
        return None;
    }

    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let launch = (Vec3::new(angle.cos(), 0.0, angle.sin()) + Vec3::Y) * speed;

    let entity = world.reserve();
    let proxy = physics.spawn_loot(entity, origin, LOOT_HALF_EXTENT, launch);
    world.spawn_at(entity, (Loot { item }, Transform::from_position(origin), proxy));
    Some((entity, item))
}

/// Copy simulated loot positions back into their transforms
pub fn sync_loot(world: &mut World, physics: &PhysicsWorld) {
    for (_, (transform, proxy, _)) in world.query_mut::<(&mut Transform, &PhysicsProxy, &Loot)>() {
        if proxy.body.is_some() {
            if let Some(position) = physics.proxy_position(*proxy) {
                transform.position = position;
            }
        }
    }
}
