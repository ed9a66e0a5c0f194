//! Hierarchical transform propagation
//!
//! The [`TransformGraph`] stores every entity's local transform together with
//! a cached world transform. World transforms are resolved lazily: mutations
//! only mark the affected subtree dirty, and the next read walks up to the
//! nearest clean ancestor (or a root) and folds local transforms back down.
//!
//! Composition of a parent world transform `P` with a child local `L`:
//!
//! ```text
//! position = P.position + P.rotation * (P.scale * L.position)
//! rotation = P.rotation * L.rotation
//! scale    = P.scale * L.scale
//! ```
//!
//! The graph is single-threaded and owned by whoever drives the frame update.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::cached::TransformEntry;
use super::components::{EntityId, Transform};
use super::hierarchy::{Children, MAX_HIERARCHY_DEPTH, ParentLookup};
use crate::core::RigError;

type Chain = SmallVec<[EntityId; 16]>;

/// Local/world transform store with lazy parent propagation
#[derive(Debug, Clone)]
pub struct TransformGraph {
    entries: FxHashMap<EntityId, TransformEntry>,
    /// Reverse of the parent links, used to invalidate subtrees
    children: FxHashMap<EntityId, Children>,
    max_depth: usize,
}

impl TransformGraph {
    /// Create an empty graph with the default hop limit
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HIERARCHY_DEPTH)
    }

    /// Create an empty graph that rejects parent chains longer than `max_depth`
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            children: FxHashMap::default(),
            max_depth: max_depth.max(1),
        }
    }

    /// Hop limit for parent chains
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of entities with a transform
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if `entity` has a transform entry
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entries.contains_key(&entity)
    }

    /// Iterate over every entity and its local transform
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, Transform)> + '_ {
        self.entries.iter().map(|(&id, entry)| (id, entry.local()))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Add (or replace) an entity with a local transform and parent link.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::CycleDetected`] if `parent` would close a loop.
    pub fn insert(
        &mut self,
        entity: EntityId,
        local: Transform,
        parent: Option<EntityId>,
    ) -> Result<(), RigError> {
        self.set_local(entity, local);
        self.set_parent(entity, parent)
    }

    /// Remove an entity. Its children become roots and are marked dirty.
    ///
    /// Returns the removed local transform.
    pub fn remove(&mut self, entity: EntityId) -> Option<Transform> {
        let entry = self.entries.remove(&entity)?;

        if let Some(parent) = entry.parent() {
            self.unlink(entity, parent);
        }

        if let Some(children) = self.children.remove(&entity) {
            for child in children.iter() {
                if let Some(child_entry) = self.entries.get_mut(child) {
                    child_entry.set_parent(None);
                }
                self.mark_subtree_dirty(*child);
            }
        }

        Some(entry.local())
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Store the local transform of `entity` and invalidate its subtree.
    ///
    /// Unknown entities get a new root entry; the entity store is responsible
    /// for only calling this for entities that exist.
    pub fn set_local(&mut self, entity: EntityId, local: Transform) {
        let changed = match self.entries.get_mut(&entity) {
            Some(entry) => entry.set_local(local),
            None => {
                self.entries.insert(entity, TransformEntry::new(local));
                true
            }
        };

        if changed {
            self.mark_subtree_dirty(entity);
        }
    }

    /// Store the local transform that places `entity` at `world`.
    ///
    /// The parent's world transform is resolved first. A parent the graph
    /// does not know is treated as the origin.
    ///
    /// # Errors
    ///
    /// - [`RigError::CycleDetected`] if the parent chain does not terminate
    /// - [`RigError::SingularScale`] if the parent has a zero scale component
    pub fn set_world<L: ParentLookup + ?Sized>(
        &mut self,
        lookup: &L,
        entity: EntityId,
        world: Transform,
    ) -> Result<(), RigError> {
        let parent = lookup.parent(entity).filter(|p| self.contains(*p));

        let local = match parent {
            Some(parent) => {
                if parent == entity {
                    return Err(RigError::CycleDetected { entity, depth: 1 });
                }
                let parent_world = self.world(lookup, parent)?;
                parent_world
                    .inverse_compose(&world)
                    .ok_or(RigError::SingularScale { entity })?
            }
            None => world,
        };

        self.set_local(entity, local);
        self.relink(entity, lookup.parent(entity));
        Ok(())
    }

    /// Change the parent of `entity` and invalidate its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::CycleDetected`] if `parent` is `entity` itself or
    /// one of its descendants, or if the new chain exceeds the hop limit.
    pub fn set_parent(
        &mut self,
        entity: EntityId,
        parent: Option<EntityId>,
    ) -> Result<(), RigError> {
        if let Some(parent) = parent {
            let mut current = Some(parent);
            let mut depth = 0;
            while let Some(ancestor) = current {
                depth += 1;
                if ancestor == entity || depth > self.max_depth {
                    return Err(RigError::CycleDetected { entity, depth });
                }
                current = self.entries.get(&ancestor).and_then(TransformEntry::parent);
            }
        }

        if !self.entries.contains_key(&entity) {
            self.entries.insert(entity, TransformEntry::new(Transform::IDENTITY));
        }
        self.relink(entity, parent);
        self.mark_subtree_dirty(entity);
        Ok(())
    }

    /// Force `entity` and its descendants to be recomputed on next read
    pub fn mark_dirty(&mut self, entity: EntityId) {
        self.mark_subtree_dirty(entity);
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Get the local transform
    #[must_use]
    pub fn local(&self, entity: EntityId) -> Option<Transform> {
        self.entries.get(&entity).map(TransformEntry::local)
    }

    /// Get the last known parent link
    #[must_use]
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.entries.get(&entity).and_then(TransformEntry::parent)
    }

    /// Get the children the graph knows about
    #[must_use]
    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.children
            .get(&entity)
            .map(|c| c.0.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the cached world transform of `entity` is stale
    #[must_use]
    pub fn is_dirty(&self, entity: EntityId) -> Option<bool> {
        self.entries.get(&entity).map(TransformEntry::is_dirty)
    }

    /// Get the world transform, recomputing it if dirty.
    ///
    /// Clean entries are returned from the cache without consulting `lookup`.
    ///
    /// # Errors
    ///
    /// - [`RigError::UnknownEntity`] if `entity` has no entry
    /// - [`RigError::CycleDetected`] if the parent chain does not terminate
    pub fn world<L: ParentLookup + ?Sized>(
        &mut self,
        lookup: &L,
        entity: EntityId,
    ) -> Result<Transform, RigError> {
        let entry = self
            .entries
            .get(&entity)
            .ok_or(RigError::UnknownEntity(entity))?;
        if !entry.is_dirty() {
            return Ok(entry.world());
        }

        // Walk up collecting dirty entries until a clean ancestor or a root.
        let mut chain = Chain::new();
        let mut current = entity;
        let frame = loop {
            // `chain.len()` is the number of hops from `entity` to `current`
            if chain.len() > self.max_depth {
                log::warn!("Parent chain of {entity} exceeds {} hops", self.max_depth);
                return Err(RigError::CycleDetected {
                    entity,
                    depth: chain.len(),
                });
            }
            chain.push(current);

            let parent = lookup.parent(current);
            self.relink(current, parent);

            match parent.and_then(|p| self.entries.get(&p).map(|e| (p, e))) {
                Some((_, parent_entry)) if !parent_entry.is_dirty() => break parent_entry.world(),
                Some((parent, _)) => current = parent,
                None => break Transform::IDENTITY,
            }
        };

        let mut world = frame;
        for id in chain.iter().rev() {
            if let Some(entry) = self.entries.get_mut(id) {
                world = world.compose(&entry.local());
                entry.store_world(world);
            }
        }

        Ok(world)
    }

    /// Compute the world transform from scratch by walking `lookup` to the
    /// root, without reading or updating the cache.
    ///
    /// Returns `Ok(None)` if `entity` has no entry. A root yields its local
    /// transform. An ancestor without an entry ends the walk as if it were
    /// the root.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::CycleDetected`] if the chain exceeds the hop limit.
    pub fn propagate<L: ParentLookup + ?Sized>(
        &self,
        lookup: &L,
        entity: EntityId,
    ) -> Result<Option<Transform>, RigError> {
        let Some(entry) = self.entries.get(&entity) else {
            return Ok(None);
        };

        let mut ancestors: SmallVec<[Transform; 16]> = SmallVec::new();
        let mut current = entity;
        while let Some(parent) = lookup.parent(current) {
            if ancestors.len() >= self.max_depth {
                log::warn!("Parent chain of {entity} exceeds {} hops", self.max_depth);
                return Err(RigError::CycleDetected {
                    entity,
                    depth: ancestors.len(),
                });
            }
            let Some(parent_entry) = self.entries.get(&parent) else {
                break;
            };
            ancestors.push(parent_entry.local());
            current = parent;
        }

        let frame = ancestors
            .iter()
            .rev()
            .fold(Transform::IDENTITY, |world, local| world.compose(local));

        Ok(Some(frame.compose(&entry.local())))
    }

    /// Merge the local transform with the *stored* world transform of the
    /// entity's parent, without walking the hierarchy.
    ///
    /// The stored parent world is used as-is even when it is dirty, so this
    /// goes stale whenever an ancestor changed since the parent was last
    /// resolved. Roots yield their local transform.
    #[must_use]
    pub fn sync(&self, entity: EntityId) -> Option<Transform> {
        let entry = self.entries.get(&entity)?;
        let frame = entry
            .parent()
            .and_then(|p| self.entries.get(&p))
            .map_or(Transform::IDENTITY, TransformEntry::world);

        Some(frame.compose(&entry.local()))
    }

    /// Resolve every dirty entry. Returns how many entries were recomputed.
    ///
    /// # Errors
    ///
    /// Stops at the first [`RigError::CycleDetected`].
    pub fn resolve_all<L: ParentLookup + ?Sized>(&mut self, lookup: &L) -> Result<usize, RigError> {
        let dirty: Vec<EntityId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_dirty())
            .map(|(&id, _)| id)
            .collect();

        let mut resolved = 0;
        for id in dirty {
            if self.is_dirty(id) == Some(true) {
                self.world(lookup, id)?;
                resolved += 1;
            }
        }

        log::debug!("Resolved {resolved} dirty transforms");
        Ok(resolved)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Record `parent` as the parent of `entity`, keeping the children index
    /// in step. A changed link invalidates the subtree.
    fn relink(&mut self, entity: EntityId, parent: Option<EntityId>) {
        let Some(entry) = self.entries.get_mut(&entity) else {
            return;
        };
        let previous = entry.parent();
        if !entry.set_parent(parent) {
            return;
        }

        if let Some(previous) = previous {
            self.unlink(entity, previous);
        }
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().add(entity);
        }
        self.mark_subtree_dirty(entity);
    }

    fn unlink(&mut self, entity: EntityId, parent: EntityId) {
        if let Some(children) = self.children.get_mut(&parent) {
            children.remove(entity);
            if children.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Marks `entity` and all its descendants dirty.
    ///
    /// A dirty entry always has dirty descendants, so already-dirty children
    /// are not descended into.
    fn mark_subtree_dirty(&mut self, entity: EntityId) {
        if let Some(entry) = self.entries.get_mut(&entity) {
            entry.mark_dirty();
        }

        let mut stack: Chain = self.children(entity).iter().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            if entry.is_dirty() {
                continue;
            }
            entry.mark_dirty();
            stack.extend(self.children(id).iter().copied());
        }
    }
}

impl Default for TransformGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    use glam::{DQuat, DVec3};

    fn id(bits: u64) -> EntityId {
        EntityId::from_bits(bits)
    }

    fn approx(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1.0e-9
    }

    /// Counts how often the graph asks for a parent
    struct CountingLookup {
        parents: HashMap<EntityId, EntityId>,
        calls: Cell<usize>,
    }

    impl CountingLookup {
        fn new(links: &[(u64, u64)]) -> Self {
            Self {
                parents: links.iter().map(|&(c, p)| (id(c), id(p))).collect(),
                calls: Cell::new(0),
            }
        }
    }

    impl ParentLookup for CountingLookup {
        fn parent(&self, entity: EntityId) -> Option<EntityId> {
            self.calls.set(self.calls.get() + 1);
            self.parents.get(&entity).copied()
        }
    }

    fn chain_graph(links: &[(u64, u64)], locals: &[(u64, DVec3)]) -> TransformGraph {
        let mut graph = TransformGraph::new();
        for &(entity, position) in locals {
            graph.set_local(id(entity), Transform::from_position(position));
        }
        for &(child, parent) in links {
            graph.set_parent(id(child), Some(id(parent))).unwrap();
        }
        graph
    }

    #[test]
    fn test_translation_chain_sums_positions() {
        let links = [(2, 1), (3, 2), (4, 3)];
        let positions = [
            (1, DVec3::new(1.0, 0.0, 0.0)),
            (2, DVec3::new(0.0, 2.0, 0.0)),
            (3, DVec3::new(0.0, 0.0, 3.0)),
            (4, DVec3::new(-1.0, 1.0, 1.0)),
        ];
        let mut graph = chain_graph(&links, &positions);
        let lookup = CountingLookup::new(&links);

        let expected = positions.iter().fold(DVec3::ZERO, |sum, (_, p)| sum + *p);

        let propagated = graph.propagate(&lookup, id(4)).unwrap().unwrap();
        let world = graph.world(&lookup, id(4)).unwrap();

        assert!(approx(propagated.position, expected));
        assert!(approx(world.position, expected));
    }

    #[test]
    fn test_propagate_root_equals_local() {
        let local = Transform::from_parts(
            DVec3::new(4.0, 5.0, 6.0),
            DQuat::from_rotation_y(0.3),
            DVec3::new(1.0, 2.0, 3.0),
        );
        let mut graph = TransformGraph::new();
        graph.set_local(id(1), local);
        let lookup = CountingLookup::new(&[]);

        assert_eq!(graph.propagate(&lookup, id(1)).unwrap(), graph.local(id(1)));
    }

    #[test]
    fn test_propagate_scaled_parent() {
        let mut graph = TransformGraph::new();
        graph.set_local(
            id(1),
            Transform::from_parts(DVec3::new(1.0, 0.0, 0.0), DQuat::IDENTITY, DVec3::splat(2.0)),
        );
        graph.insert(id(2), Transform::from_position(DVec3::X), Some(id(1))).unwrap();
        let lookup = CountingLookup::new(&[(2, 1)]);

        let world = graph.propagate(&lookup, id(2)).unwrap().unwrap();

        assert!(approx(world.position, DVec3::new(3.0, 0.0, 0.0)));
        assert!(approx(world.scale, DVec3::splat(2.0)));
    }

    #[test]
    fn test_propagate_folds_from_root() {
        // Non-uniform scale on the root and a rotated middle link: only a
        // root-first fold gives parent.world ∘ local at every level.
        let mut graph = TransformGraph::new();
        graph.set_local(
            id(1),
            Transform::from_parts(DVec3::ZERO, DQuat::IDENTITY, DVec3::new(2.0, 1.0, 1.0)),
        );
        graph.set_local(
            id(2),
            Transform::from_position_rotation(DVec3::ZERO, DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2)),
        );
        graph.set_local(id(3), Transform::from_position(DVec3::X));
        let links = [(2, 1), (3, 2)];
        let lookup = CountingLookup::new(&links);

        let parent_world = graph.propagate(&lookup, id(2)).unwrap().unwrap();
        let expected = parent_world.compose(&graph.local(id(3)).unwrap());
        let world = graph.propagate(&lookup, id(3)).unwrap().unwrap();

        assert!(approx(world.position, expected.position));
        assert!(approx(world.position, DVec3::new(0.0, 2.0, 0.0)));
        assert_eq!(graph.world(&lookup, id(3)).unwrap().position, world.position);
    }

    #[test]
    fn test_two_cycle_detected() {
        let mut graph = TransformGraph::new();
        graph.set_local(id(1), Transform::new());
        graph.set_local(id(2), Transform::new());
        let lookup = CountingLookup::new(&[(1, 2), (2, 1)]);

        assert!(matches!(
            graph.propagate(&lookup, id(1)),
            Err(RigError::CycleDetected { .. })
        ));
        assert!(matches!(
            graph.world(&lookup, id(2)),
            Err(RigError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_set_parent_rejects_cycle() {
        let mut graph = chain_graph(&[(2, 1)], &[(1, DVec3::ZERO), (2, DVec3::ZERO)]);

        assert!(matches!(
            graph.set_parent(id(1), Some(id(2))),
            Err(RigError::CycleDetected { .. })
        ));
        assert!(matches!(
            graph.set_parent(id(1), Some(id(1))),
            Err(RigError::CycleDetected { .. })
        ));
        assert_eq!(graph.parent(id(1)), None);
    }

    #[test]
    fn test_chain_longer_than_limit_is_rejected() {
        let mut graph = TransformGraph::with_max_depth(4);
        let links: Vec<(u64, u64)> = (2..=8).map(|i| (i, i - 1)).collect();
        for i in 1..=8 {
            graph.set_local(id(i), Transform::new());
        }
        let lookup = CountingLookup::new(&links);

        assert!(matches!(
            graph.propagate(&lookup, id(8)),
            Err(RigError::CycleDetected { .. })
        ));
        assert!(graph.propagate(&lookup, id(3)).is_ok());
    }

    #[test]
    fn test_clean_read_skips_lookup() {
        let links = [(2, 1), (3, 2)];
        let mut graph = chain_graph(&links, &[(1, DVec3::X), (2, DVec3::Y), (3, DVec3::Z)]);
        let lookup = CountingLookup::new(&links);

        let first = graph.world(&lookup, id(3)).unwrap();
        let calls = lookup.calls.get();
        let second = graph.world(&lookup, id(3)).unwrap();

        assert_eq!(graph.is_dirty(id(3)), Some(false));
        assert_eq!(lookup.calls.get(), calls);
        assert_eq!(first.position.to_array().map(f64::to_bits), second.position.to_array().map(f64::to_bits));
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_local_dirties_subtree() {
        let links = [(2, 1), (3, 2)];
        let mut graph = chain_graph(&links, &[(1, DVec3::X), (2, DVec3::X), (3, DVec3::X)]);
        let lookup = CountingLookup::new(&links);
        graph.resolve_all(&lookup).unwrap();
        assert_eq!(graph.is_dirty(id(3)), Some(false));

        graph.set_local(id(1), Transform::from_position(DVec3::new(10.0, 0.0, 0.0)));

        assert_eq!(graph.is_dirty(id(1)), Some(true));
        assert_eq!(graph.is_dirty(id(2)), Some(true));
        assert_eq!(graph.is_dirty(id(3)), Some(true));
        assert!(approx(graph.world(&lookup, id(3)).unwrap().position, DVec3::new(12.0, 0.0, 0.0)));
    }

    #[test]
    fn test_sync_uses_stored_parent_world() {
        let links = [(2, 1)];
        let mut graph = chain_graph(&links, &[(1, DVec3::X), (2, DVec3::X)]);
        let lookup = CountingLookup::new(&links);
        graph.world(&lookup, id(2)).unwrap();

        assert!(approx(graph.sync(id(2)).unwrap().position, DVec3::new(2.0, 0.0, 0.0)));

        // Parent moves; its stored world is now outdated until resolved.
        graph.set_local(id(1), Transform::from_position(DVec3::new(5.0, 0.0, 0.0)));

        assert!(approx(graph.sync(id(2)).unwrap().position, DVec3::new(2.0, 0.0, 0.0)));
        assert!(approx(graph.world(&lookup, id(2)).unwrap().position, DVec3::new(6.0, 0.0, 0.0)));
        assert!(approx(graph.sync(id(2)).unwrap().position, DVec3::new(6.0, 0.0, 0.0)));
    }

    #[test]
    fn test_set_world_back_solves_local() {
        let links = [(2, 1)];
        let mut graph = TransformGraph::new();
        graph.set_local(
            id(1),
            Transform::from_parts(
                DVec3::new(1.0, 2.0, 3.0),
                DQuat::from_rotation_y(0.5),
                DVec3::new(2.0, 2.0, 4.0),
            ),
        );
        graph.insert(id(2), Transform::new(), Some(id(1))).unwrap();
        let lookup = CountingLookup::new(&links);

        let target = Transform::from_parts(
            DVec3::new(-3.0, 0.5, 7.0),
            DQuat::from_rotation_x(1.1),
            DVec3::new(1.0, 3.0, 2.0),
        );
        graph.set_world(&lookup, id(2), target).unwrap();

        let world = graph.world(&lookup, id(2)).unwrap();
        assert!(approx(world.position, target.position));
        assert!(approx(world.scale, target.scale));
        assert!(world.rotation.abs_diff_eq(target.rotation, 1.0e-9));
    }

    #[test]
    fn test_set_world_zero_parent_scale() {
        let links = [(2, 1)];
        let mut graph = TransformGraph::new();
        graph.set_local(id(1), Transform::from_parts(DVec3::ZERO, DQuat::IDENTITY, DVec3::ZERO));
        graph.insert(id(2), Transform::new(), Some(id(1))).unwrap();
        let lookup = CountingLookup::new(&links);

        assert_eq!(
            graph.set_world(&lookup, id(2), Transform::new()),
            Err(RigError::SingularScale { entity: id(2) })
        );
    }

    #[test]
    fn test_missing_parent_treated_as_root() {
        let mut graph = TransformGraph::new();
        graph.set_local(id(2), Transform::from_position(DVec3::Y));
        // Lookup reports a parent the graph never heard of.
        let lookup = CountingLookup::new(&[(2, 99)]);

        assert!(approx(graph.world(&lookup, id(2)).unwrap().position, DVec3::Y));
        assert!(approx(graph.propagate(&lookup, id(2)).unwrap().unwrap().position, DVec3::Y));
    }

    #[test]
    fn test_unknown_entity() {
        let mut graph = TransformGraph::new();
        let lookup = CountingLookup::new(&[]);

        assert_eq!(graph.world(&lookup, id(5)), Err(RigError::UnknownEntity(id(5))));
        assert_eq!(graph.propagate(&lookup, id(5)), Ok(None));
        assert_eq!(graph.sync(id(5)), None);
    }

    #[test]
    fn test_remove_orphans_children() {
        let links = [(2, 1), (3, 2)];
        let mut graph = chain_graph(&links, &[(1, DVec3::X), (2, DVec3::Y), (3, DVec3::Z)]);
        let lookup = CountingLookup::new(&links);
        graph.resolve_all(&lookup).unwrap();

        assert!(graph.remove(id(1)).is_some());

        assert!(!graph.contains(id(1)));
        assert_eq!(graph.parent(id(2)), None);
        assert_eq!(graph.is_dirty(id(3)), Some(true));
        assert!(approx(graph.world(&lookup, id(3)).unwrap().position, DVec3::new(0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_reparent_invalidates_subtree() {
        let mut graph = chain_graph(
            &[(3, 1)],
            &[(1, DVec3::X), (2, DVec3::new(0.0, 10.0, 0.0)), (3, DVec3::Z)],
        );
        let mut links: HashMap<EntityId, EntityId> = [(id(3), id(1))].into_iter().collect();
        graph.resolve_all(&links).unwrap();

        graph.set_parent(id(3), Some(id(2))).unwrap();
        links.insert(id(3), id(2));

        assert_eq!(graph.children(id(2)), &[id(3)]);
        assert!(graph.children(id(1)).is_empty());
        assert!(approx(graph.world(&links, id(3)).unwrap().position, DVec3::new(0.0, 10.0, 1.0)));
    }

    #[test]
    fn test_hop_limit_boundary() {
        let links = [(2, 1), (3, 2), (4, 3)];
        let mut graph = TransformGraph::with_max_depth(3);
        for i in 1..=5 {
            graph.set_local(id(i), Transform::from_position(DVec3::X));
        }
        for &(child, parent) in &links {
            graph.set_parent(id(child), Some(id(parent))).unwrap();
        }
        let within: HashMap<EntityId, EntityId> =
            links.iter().map(|&(c, p)| (id(c), id(p))).collect();
        let mut beyond = within.clone();
        beyond.insert(id(5), id(4));

        // Four hops from 5 to the root
        assert!(matches!(
            graph.set_parent(id(5), Some(id(4))),
            Err(RigError::CycleDetected { depth: 4, .. })
        ));
        assert!(matches!(
            graph.propagate(&beyond, id(5)),
            Err(RigError::CycleDetected { .. })
        ));
        assert!(matches!(
            graph.world(&beyond, id(5)),
            Err(RigError::CycleDetected { .. })
        ));

        // Exactly three hops from 4 to the root
        let expected = DVec3::new(4.0, 0.0, 0.0);
        assert!(approx(graph.propagate(&within, id(4)).unwrap().unwrap().position, expected));
        assert!(approx(graph.world(&within, id(4)).unwrap().position, expected));
        assert!(graph.resolve_all(&within).is_ok());
    }

    #[test]
    fn test_set_world_new_parent_dirties_descendants() {
        let links = [(3, 1), (4, 3)];
        let mut graph = chain_graph(
            &links,
            &[(1, DVec3::X), (2, DVec3::X), (3, DVec3::Z), (4, DVec3::Y)],
        );
        let before: HashMap<EntityId, EntityId> =
            links.iter().map(|&(c, p)| (id(c), id(p))).collect();
        graph.resolve_all(&before).unwrap();
        let placed = graph.world(&before, id(3)).unwrap();

        // 2 sits where 1 does, so the back-solved local is unchanged
        let mut after = before.clone();
        after.insert(id(3), id(2));
        graph.set_world(&after, id(3), placed).unwrap();

        assert_eq!(graph.local(id(3)), Some(Transform::from_position(DVec3::Z)));
        assert_eq!(graph.parent(id(3)), Some(id(2)));
        assert_eq!(graph.is_dirty(id(4)), Some(true));
        assert!(graph.children(id(1)).is_empty());
    }
}
