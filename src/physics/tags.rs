//! Surface tags
//!
//! Every collider carries its tags as rapier collision-group memberships, so
//! the same bits drive both the contact solver (loot vs. proxies) and our
//! scene-query filters (what the movement sweep ignores, what counts as a
//! trip hazard).

use rapier3d::prelude::{Group, InteractionGroups};

/// Level geometry that blocks movement and sight
pub const SOLID: Group = Group::GROUP_1;
/// Avatar collision proxies
pub const AVATAR: Group = Group::GROUP_2;
/// Agent collision proxies
pub const AGENT: Group = Group::GROUP_3;
/// Loose loot lying around
pub const LOOT: Group = Group::GROUP_4;
/// Volumes that never block movement
pub const NO_COLLIDE: Group = Group::GROUP_5;
/// Slippery floor patches
pub const SLIP: Group = Group::GROUP_6;
/// Door panels
pub const DOOR: Group = Group::GROUP_7;

/// Everything the avatar movement sweep passes through
pub const MOVEMENT_IGNORED: Group = AVATAR.union(AGENT).union(LOOT).union(NO_COLLIDE).union(SLIP);

/// Interaction groups for a collider tagged `tags`
///
/// Loot does not push against body proxies; everything else collides with
/// everything.
#[must_use]
pub fn interaction_groups(tags: Group) -> InteractionGroups {
    let filter = if tags.intersects(LOOT) {
        Group::ALL.difference(AVATAR.union(AGENT))
    } else if tags.intersects(AVATAR.union(AGENT)) {
        Group::ALL.difference(LOOT)
    } else {
        Group::ALL
    };
    InteractionGroups::new(tags, filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_ignores_bodies_and_loot() {
        assert!(MOVEMENT_IGNORED.contains(AVATAR));
        assert!(MOVEMENT_IGNORED.contains(LOOT));
        assert!(!MOVEMENT_IGNORED.intersects(SOLID));
        assert!(!MOVEMENT_IGNORED.intersects(DOOR));
    }

    #[test]
    fn test_loot_does_not_touch_proxies() {
        let loot = interaction_groups(LOOT);
        let avatar = interaction_groups(AVATAR);
        let wall = interaction_groups(SOLID);
        assert!(!loot.test(avatar));
        assert!(loot.test(wall));
        assert!(avatar.test(wall));
    }
}
