//! Level collaborators
//!
//! Level context, doors, inventories and loot: the parts of a level the
//! simulation reads and pokes but does not decide about.

mod context;
mod door;
mod inventory;
mod loot;

pub use context::{AgentSpawn, Bounds, HazardSurfaces, LevelContext, LevelKind};
pub use door::{Door, DoorAutoClose, DoorState};
pub(crate) use door::settled_event;
pub use inventory::{Inventory, LootId};
pub use loot::{LOOT_HALF_EXTENT, Loot, eject_item, place_loot, sync_loot};
