//! World wrapper around hecs
//!
//! Components live in hecs. Transforms live in a [`TransformGraph`] that reads
//! the hierarchy back out of the [`Parent`] components.

use smallvec::SmallVec;

use super::components::{EntityId, Transform};
use super::graph::TransformGraph;
use super::hierarchy::{Children, Parent, ParentLookup};
use crate::core::RigError;

/// Game world containing all entities, components and transforms
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
    transforms: TransformGraph,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self::with_graph(TransformGraph::new())
    }

    /// Create a world whose parent chains may be at most `max_depth` hops
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self::with_graph(TransformGraph::with_max_depth(max_depth))
    }

    fn with_graph(transforms: TransformGraph) -> Self {
        Self {
            inner: hecs::World::new(),
            transforms,
        }
    }

    /// Spawn an entity with the given components and no transform
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> EntityId {
        self.inner.spawn(components).into()
    }

    /// Spawn an entity with a local transform, optionally under `parent`
    ///
    /// # Errors
    ///
    /// - [`RigError::UnknownEntity`] if `parent` does not exist
    /// - [`RigError::CycleDetected`] if `parent` already sits at the hop limit
    ///
    /// The new entity is not left behind when this fails.
    pub fn spawn_with_transform(
        &mut self,
        components: impl hecs::DynamicBundle,
        local: Transform,
        parent: Option<EntityId>,
    ) -> Result<EntityId, RigError> {
        if let Some(missing) = parent.filter(|p| !self.contains(*p)) {
            return Err(RigError::UnknownEntity(missing));
        }

        let entity = self.spawn(components);
        self.transforms.set_local(entity, local);
        let linked = match parent {
            Some(parent) => self.set_parent(entity, parent),
            None => Ok(()),
        };
        if let Err(err) = linked {
            self.despawn(entity);
            return Err(err);
        }
        Ok(entity)
    }

    /// Despawn an entity. Its children become roots and keep their local
    /// transforms.
    ///
    /// Returns `false` if the entity did not exist.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        let Some(handle) = entity.entity().filter(|e| self.inner.contains(*e)) else {
            return false;
        };

        self.remove_parent(entity);
        if let Ok(children) = self.inner.remove_one::<Children>(handle) {
            for child in children.iter() {
                if let Some(child) = child.entity() {
                    let _ = self.inner.remove_one::<Parent>(child);
                }
            }
        }

        self.transforms.remove(entity);
        self.inner.despawn(handle).is_ok()
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Attach `child` to `parent`, detaching it from any previous parent
    ///
    /// # Errors
    ///
    /// - [`RigError::UnknownEntity`] if either entity does not exist
    /// - [`RigError::CycleDetected`] if `parent` is `child` or one of its
    ///   descendants, or the resulting chain is too long
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> Result<(), RigError> {
        let child_handle = self.handle(child)?;
        let parent_handle = self.handle(parent)?;

        let mut depth = 0;
        let mut current = Some(parent);
        while let Some(ancestor) = current {
            depth += 1;
            if ancestor == child || depth > self.transforms.max_depth() {
                log::warn!("Refusing to parent {child} under {parent}: cycle");
                return Err(RigError::CycleDetected {
                    entity: child,
                    depth,
                });
            }
            current = self.parent(ancestor);
        }

        self.remove_parent(child);
        self.inner
            .insert_one(child_handle, Parent::new(parent))
            .map_err(|_| RigError::UnknownEntity(child))?;

        let added = match self.inner.get::<&mut Children>(parent_handle) {
            Ok(mut children) => {
                children.add(child);
                true
            }
            Err(_) => false,
        };
        if !added {
            self.inner
                .insert_one(parent_handle, Children::single(child))
                .map_err(|_| RigError::UnknownEntity(parent))?;
        }

        if self.transforms.contains(child) {
            self.transforms.set_parent(child, Some(parent))?;
        }
        Ok(())
    }

    /// Detach `child` from its parent. Returns the previous parent.
    pub fn remove_parent(&mut self, child: EntityId) -> Option<EntityId> {
        let parent = self
            .inner
            .remove_one::<Parent>(child.entity()?)
            .ok()?
            .entity();

        if let Some(parent_handle) = parent.entity() {
            let now_empty = match self.inner.get::<&mut Children>(parent_handle) {
                Ok(mut children) => {
                    children.remove(child);
                    children.is_empty()
                }
                Err(_) => false,
            };
            if now_empty {
                let _ = self.inner.remove_one::<Children>(parent_handle);
            }
        }

        if self.transforms.contains(child) {
            // Clearing a link never closes a cycle
            let _ = self.transforms.set_parent(child, None);
        }
        Some(parent)
    }

    /// Get the direct parent of `entity`
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.inner.parent(entity)
    }

    /// Get the direct children of `entity`
    pub fn children(&self, entity: EntityId) -> Vec<EntityId> {
        entity
            .entity()
            .and_then(|e| self.inner.get::<&Children>(e).ok())
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Get the ancestors of `entity`, nearest first.
    ///
    /// Stops after the hop limit.
    pub fn ancestors(&self, entity: EntityId) -> SmallVec<[EntityId; 8]> {
        let mut ancestors = SmallVec::new();
        let mut current = self.parent(entity);
        while let Some(ancestor) = current {
            if ancestors.len() >= self.transforms.max_depth() {
                log::warn!("Ancestors of {entity} exceed the hop limit");
                break;
            }
            ancestors.push(ancestor);
            current = self.parent(ancestor);
        }
        ancestors
    }

    /// Check whether `ancestor` is somewhere above `entity`
    pub fn is_descendant_of(&self, entity: EntityId, ancestor: EntityId) -> bool {
        self.ancestors(entity).contains(&ancestor)
    }

    // -------------------------------------------------------------------------
    // Transforms
    // -------------------------------------------------------------------------

    /// Set the local transform of an entity
    ///
    /// # Errors
    ///
    /// Returns [`RigError::UnknownEntity`] if the entity does not exist.
    pub fn set_local(&mut self, entity: EntityId, local: Transform) -> Result<(), RigError> {
        self.handle(entity)?;
        self.transforms.set_local(entity, local);
        Ok(())
    }

    /// Place an entity at a world transform, keeping its parent
    ///
    /// # Errors
    ///
    /// - [`RigError::UnknownEntity`] if the entity does not exist
    /// - [`RigError::CycleDetected`] if the parent chain does not terminate
    /// - [`RigError::SingularScale`] if the parent has a zero scale component
    pub fn set_world(&mut self, entity: EntityId, world: Transform) -> Result<(), RigError> {
        self.handle(entity)?;
        self.transforms.set_world(&self.inner, entity, world)
    }

    /// Get the local transform of an entity
    pub fn local_transform(&self, entity: EntityId) -> Option<Transform> {
        self.transforms.local(entity)
    }

    /// Get the world transform of an entity, resolving it if stale
    ///
    /// # Errors
    ///
    /// - [`RigError::UnknownEntity`] if the entity has no transform
    /// - [`RigError::CycleDetected`] if the parent chain does not terminate
    pub fn world_transform(&mut self, entity: EntityId) -> Result<Transform, RigError> {
        self.transforms.world(&self.inner, entity)
    }

    /// Recompute the world transform from scratch without touching the cache
    ///
    /// # Errors
    ///
    /// Returns [`RigError::CycleDetected`] if the parent chain does not terminate.
    pub fn propagate(&self, entity: EntityId) -> Result<Option<Transform>, RigError> {
        self.transforms.propagate(&self.inner, entity)
    }

    /// Combine the local transform with the parent's stored world transform
    pub fn sync(&self, entity: EntityId) -> Option<Transform> {
        self.transforms.sync(entity)
    }

    /// Resolve every stale world transform
    ///
    /// # Errors
    ///
    /// Stops at the first [`RigError::CycleDetected`].
    pub fn resolve_transforms(&mut self) -> Result<usize, RigError> {
        self.transforms.resolve_all(&self.inner)
    }

    /// The transform store
    pub fn transforms(&self) -> &TransformGraph {
        &self.transforms
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: EntityId,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        let entity = entity.entity().ok_or(hecs::ComponentError::NoSuchEntity)?;
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        let entity = entity.entity().ok_or(hecs::ComponentError::NoSuchEntity)?;
        self.inner.get::<&mut T>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: EntityId) -> bool {
        entity.entity().is_some_and(|e| self.inner.contains(e))
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn handle(&self, entity: EntityId) -> Result<hecs::Entity, RigError> {
        entity
            .entity()
            .filter(|e| self.inner.contains(*e))
            .ok_or(RigError::UnknownEntity(entity))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl ParentLookup for World {
    fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.inner.parent(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Name;
    use glam::{DQuat, DVec3};

    fn at(x: f64, y: f64, z: f64) -> Transform {
        Transform::from_position(DVec3::new(x, y, z))
    }

    #[test]
    fn test_spawn_with_parent_links_both_ways() {
        let mut world = World::new();
        let root = world.spawn_with_transform((Name::new("root"),), at(1.0, 0.0, 0.0), None).unwrap();
        let child = world.spawn_with_transform((), at(0.0, 1.0, 0.0), Some(root)).unwrap();

        assert_eq!(world.parent(child), Some(root));
        assert_eq!(world.children(root), vec![child]);
        assert_eq!(world.get::<Name>(root).unwrap().as_str(), "root");
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_world_transform_follows_parent() {
        let mut world = World::new();
        let root = world
            .spawn_with_transform(
                (),
                Transform::from_position_rotation(
                    DVec3::new(0.0, 0.0, 5.0),
                    DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2),
                ),
                None,
            )
            .unwrap();
        let child = world.spawn_with_transform((), at(1.0, 0.0, 0.0), Some(root)).unwrap();

        let resolved = world.world_transform(child).unwrap();
        assert!((resolved.position - DVec3::new(0.0, 0.0, 4.0)).length() < 1.0e-9);

        world.set_local(root, at(10.0, 0.0, 0.0)).unwrap();
        let moved = world.world_transform(child).unwrap();
        assert!((moved.position - DVec3::new(11.0, 0.0, 0.0)).length() < 1.0e-9);
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut world = World::new();
        let a = world.spawn_with_transform((), Transform::new(), None).unwrap();
        let b = world.spawn_with_transform((), Transform::new(), Some(a)).unwrap();
        let c = world.spawn_with_transform((), Transform::new(), Some(b)).unwrap();

        assert!(matches!(
            world.set_parent(a, c),
            Err(RigError::CycleDetected { entity, .. }) if entity == a
        ));
        assert!(matches!(
            world.set_parent(a, a),
            Err(RigError::CycleDetected { .. })
        ));
        assert_eq!(world.parent(a), None);
        assert!(world.is_descendant_of(c, a));
        assert!(!world.is_descendant_of(a, c));
        assert_eq!(world.ancestors(c).as_slice(), &[b, a]);
    }

    #[test]
    fn test_reparent_moves_child_list() {
        let mut world = World::new();
        let a = world.spawn_with_transform((), at(1.0, 0.0, 0.0), None).unwrap();
        let b = world.spawn_with_transform((), at(0.0, 2.0, 0.0), None).unwrap();
        let child = world.spawn_with_transform((), Transform::new(), Some(a)).unwrap();
        assert!((world.world_transform(child).unwrap().position.x - 1.0).abs() < 1.0e-12);

        world.set_parent(child, b).unwrap();

        assert!(world.children(a).is_empty());
        assert_eq!(world.children(b), vec![child]);
        assert_eq!(world.transforms().is_dirty(child), Some(true));
        let position = world.world_transform(child).unwrap().position;
        assert!((position - DVec3::new(0.0, 2.0, 0.0)).length() < 1.0e-12);
    }

    #[test]
    fn test_despawn_orphans_children() {
        let mut world = World::new();
        let root = world.spawn_with_transform((), at(5.0, 0.0, 0.0), None).unwrap();
        let child = world.spawn_with_transform((), at(1.0, 0.0, 0.0), Some(root)).unwrap();
        assert!((world.world_transform(child).unwrap().position.x - 6.0).abs() < 1.0e-12);

        assert!(world.despawn(root));
        assert!(!world.despawn(root));

        assert_eq!(world.parent(child), None);
        assert!(!world.contains(root));
        assert_eq!(world.world_transform(root), Err(RigError::UnknownEntity(root)));
        let position = world.world_transform(child).unwrap().position;
        assert!((position - DVec3::new(1.0, 0.0, 0.0)).length() < 1.0e-12);
    }

    #[test]
    fn test_set_world_keeps_world_pose_under_parent() {
        let mut world = World::new();
        let root = world
            .spawn_with_transform(
                (),
                Transform::from_parts(DVec3::new(3.0, 0.0, 0.0), DQuat::IDENTITY, DVec3::splat(2.0)),
                None,
            )
            .unwrap();
        let child = world.spawn_with_transform((), Transform::new(), Some(root)).unwrap();

        world.set_world(child, at(7.0, 0.0, 0.0)).unwrap();

        let local = world.local_transform(child).unwrap();
        assert!((local.position - DVec3::new(2.0, 0.0, 0.0)).length() < 1.0e-12);
        let resolved = world.world_transform(child).unwrap();
        assert!((resolved.position - DVec3::new(7.0, 0.0, 0.0)).length() < 1.0e-12);
    }

    #[test]
    fn test_propagate_and_sync() {
        let mut world = World::new();
        let root = world.spawn_with_transform((), at(1.0, 0.0, 0.0), None).unwrap();
        let child = world.spawn_with_transform((), at(0.0, 1.0, 0.0), Some(root)).unwrap();
        world.resolve_transforms().unwrap();

        world.set_local(root, at(4.0, 0.0, 0.0)).unwrap();

        // sync reads the root's stored world, which is stale until resolved
        let stale = world.sync(child).unwrap();
        assert!((stale.position - DVec3::new(1.0, 1.0, 0.0)).length() < 1.0e-12);
        let fresh = world.propagate(child).unwrap().unwrap();
        assert!((fresh.position - DVec3::new(4.0, 1.0, 0.0)).length() < 1.0e-12);

        let untracked = world.spawn(());
        assert_eq!(world.propagate(untracked), Ok(None));
        assert_eq!(world.sync(untracked), None);
    }

    #[test]
    fn test_spawn_past_hop_limit_leaves_nothing_behind() {
        let mut world = World::with_max_depth(2);
        let a = world.spawn_with_transform((), Transform::new(), None).unwrap();
        let b = world.spawn_with_transform((), Transform::new(), Some(a)).unwrap();
        let c = world.spawn_with_transform((), Transform::new(), Some(b)).unwrap();
        assert_eq!(world.len(), 3);

        assert!(matches!(
            world.spawn_with_transform((Name::new("too deep"),), Transform::new(), Some(c)),
            Err(RigError::CycleDetected { depth: 3, .. })
        ));

        assert_eq!(world.len(), 3);
        assert_eq!(world.transforms().len(), 3);
        assert!(world.children(c).is_empty());
        assert!(world.world_transform(c).is_ok());
    }

    #[test]
    fn test_unknown_entities_are_reported() {
        let mut world = World::new();
        let ghost = EntityId::from_bits(u64::MAX);

        assert_eq!(world.set_local(ghost, Transform::new()), Err(RigError::UnknownEntity(ghost)));
        assert!(matches!(
            world.spawn_with_transform((), Transform::new(), Some(ghost)),
            Err(RigError::UnknownEntity(_))
        ));
        assert!(world.is_empty());
        assert!(world.get::<Name>(ghost).is_err());
    }
}
