//! Avatar inventory bookkeeping

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifier of a kind of loot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LootId(pub u32);

/// Items an avatar carries, one slot per kind of loot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Stack count per loot kind
    items: BTreeMap<LootId, u32>,
    /// Maximum number of distinct kinds
    limit: usize,
}

impl Inventory {
    /// Default number of slots
    pub const DEFAULT_LIMIT: usize = 20;

    /// Create an empty inventory with the default slot limit
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    /// Create an empty inventory with `limit` slots
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            limit,
        }
    }

    /// Add `amount` of an item. Fails when a new slot would exceed the limit.
    pub fn add(&mut self, item: LootId, amount: u32) -> bool {
        if amount == 0 {
            return false;
        }
        if let Some(count) = self.items.get_mut(&item) {
            *count = count.saturating_add(amount);
            return true;
        }
        if self.items.len() >= self.limit {
            return false;
        }
        self.items.insert(item, amount);
        true
    }

    /// Remove one of an item. Returns `false` if none is held.
    pub fn remove(&mut self, item: LootId) -> bool {
        let Some(count) = self.items.get_mut(&item) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.items.remove(&item);
        }
        true
    }

    /// How many of an item are held
    #[must_use]
    pub fn count(&self, item: LootId) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Held items and their counts, in id order
    pub fn holdings(&self) -> impl Iterator<Item = (LootId, u32)> + '_ {
        self.items.iter().map(|(id, count)| (*id, *count))
    }

    /// Number of occupied slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pick a held item uniformly by slot
    pub fn random_item(&self, rng: &mut impl Rng) -> Option<LootId> {
        if self.items.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.items.len());
        self.items.keys().nth(index).copied()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}
