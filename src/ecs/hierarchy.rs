//! Entity hierarchy components
//!
//! Provides parent-child relationships between entities for transform propagation.

use std::collections::HashMap;
use std::hash::BuildHasher;

use smallvec::SmallVec;

use super::components::EntityId;

/// Maximum number of parent hops before a chain is treated as cyclic
pub const MAX_HIERARCHY_DEPTH: usize = 1024;

/// Answers "who is the parent of this entity"
///
/// Implemented by the entity store that owns the hierarchy. Returning `None`
/// means the entity is a root.
pub trait ParentLookup {
    /// Get the direct parent of `entity`
    fn parent(&self, entity: EntityId) -> Option<EntityId>;
}

impl<T: ParentLookup + ?Sized> ParentLookup for &T {
    fn parent(&self, entity: EntityId) -> Option<EntityId> {
        (**self).parent(entity)
    }
}

impl ParentLookup for hecs::World {
    fn parent(&self, entity: EntityId) -> Option<EntityId> {
        let entity = entity.entity()?;
        self.get::<&Parent>(entity).ok().map(|parent| parent.entity())
    }
}

/// Plain child → parent maps, handy for tools and tests
impl<S: BuildHasher> ParentLookup for HashMap<EntityId, EntityId, S> {
    fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.get(&entity).copied()
    }
}

/// Parent component - indicates this entity has a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub EntityId);

impl Parent {
    /// Create a new parent reference
    #[must_use]
    pub const fn new(entity: EntityId) -> Self {
        Self(entity)
    }

    /// Get the parent entity
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.0
    }
}

/// Children component - tracks all children of this entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub SmallVec<[EntityId; 8]>);

impl Children {
    /// Create an empty children list
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Create from a single child
    #[must_use]
    pub fn single(child: EntityId) -> Self {
        let mut children = SmallVec::new();
        children.push(child);
        Self(children)
    }

    /// Add a child
    pub fn add(&mut self, child: EntityId) {
        if !self.0.contains(&child) {
            self.0.push(child);
        }
    }

    /// Remove a child
    pub fn remove(&mut self, child: EntityId) -> bool {
        if let Some(pos) = self.0.iter().position(|&e| e == child) {
            self.0.remove(pos);
            true
        } else {
            false
        }
    }

    /// Check if this entity has children
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of children
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if `child` is listed
    #[must_use]
    pub fn contains(&self, child: EntityId) -> bool {
        self.0.contains(&child)
    }

    /// Iterate over children
    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.0.iter()
    }
}
