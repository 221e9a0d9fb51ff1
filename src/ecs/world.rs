//! World wrapper around hecs
//!
//! Agents, avatars, doors and loot all live in one `World`. Cross-entity
//! links (an agent's target, an avatar's captor) are stored as plain
//! `Entity` ids and resolved through [`World::contains`] every time they are
//! followed.

use hecs::Entity;

/// Simulation world containing all entities and components
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Reserve an id for an entity spawned later with [`spawn_at`](Self::spawn_at).
    ///
    /// Colliders record their owner at creation, so physics-backed entities
    /// reserve their id before the collider exists.
    pub fn reserve(&self) -> Entity {
        self.inner.reserve_entity()
    }

    /// Spawn the components of a reserved entity
    pub fn spawn_at(&mut self, entity: Entity, components: impl hecs::DynamicBundle) {
        self.inner.spawn_at(entity, components);
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Copy a component out, if the entity is alive and has it
    pub fn get_copied<T: hecs::Component + Copy>(&self, entity: Entity) -> Option<T> {
        self.inner.get::<&T>(entity).ok().map(|c| *c)
    }

    /// Borrow several components of one entity at once
    pub fn query_one_mut<Q: hecs::Query>(
        &mut self,
        entity: Entity,
    ) -> Result<Q::Item<'_>, hecs::QueryOneError> {
        self.inner.query_one_mut::<Q>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Check that an entity exists and carries component `T`
    pub fn has<T: hecs::Component>(&self, entity: Entity) -> bool {
        self.inner.get::<&T>(entity).is_ok()
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }

    /// Entities carrying component `T`, in storage order
    pub fn entities_with<T: hecs::Component>(&self) -> Vec<Entity> {
        self.inner
            .query::<&T>()
            .iter()
            .map(|(entity, _)| entity)
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
