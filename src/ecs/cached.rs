//! Dirty Flag Pattern for Cached World Transforms
//!
//! A [`TransformEntry`] pairs an entity's local transform with the last world
//! transform computed for it. Mutating the local transform or the parent link
//! marks the entry dirty; the owning graph recomputes and marks it clean.
//!
//! # Design Principles
//!
//! - **Lazy Evaluation**: World transforms are only recomputed when read
//! - **Automatic Invalidation**: Any effective mutation marks the cache as dirty
//! - **Zero-Cost When Clean**: Reading a clean entry is a copy

use super::components::{EntityId, Transform};

// ============================================================================
// Transform Entry
// ============================================================================

/// Per-entity transform state owned by the transform graph.
///
/// | State | Meaning                                   |
/// |-------|-------------------------------------------|
/// | Clean | `world` equals parent.world ∘ local       |
/// | Dirty | `world` is stale and must be recomputed   |
#[derive(Debug, Clone)]
pub struct TransformEntry {
    /// Transform relative to the parent
    local: Transform,
    /// Last computed world transform
    world: Transform,
    /// Last known parent link
    parent: Option<EntityId>,
    /// Whether `world` is stale
    dirty: bool,
}

impl TransformEntry {
    /// Create a dirty entry. The cached world starts out equal to `local`.
    #[must_use]
    pub fn new(local: Transform) -> Self {
        Self {
            local,
            world: local,
            parent: None,
            dirty: true,
        }
    }

    // -------------------------------------------------------------------------
    // Getters (don't invalidate cache)
    // -------------------------------------------------------------------------

    /// Get the local transform.
    #[must_use]
    #[inline]
    pub fn local(&self) -> Transform {
        self.local
    }

    /// Get the cached world transform, stale or not.
    #[must_use]
    #[inline]
    pub fn world(&self) -> Transform {
        self.world
    }

    /// Get the last known parent.
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    // -------------------------------------------------------------------------
    // Setters (invalidate cache)
    // -------------------------------------------------------------------------

    /// Set the local transform. Returns `true` if it changed.
    #[inline]
    pub fn set_local(&mut self, local: Transform) -> bool {
        if self.local != local {
            self.local = local;
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Set the parent link. Returns `true` if it changed.
    #[inline]
    pub fn set_parent(&mut self, parent: Option<EntityId>) -> bool {
        if self.parent != parent {
            self.parent = parent;
            self.dirty = true;
            true
        } else {
            false
        }
    }

    /// Store a freshly computed world transform and mark the entry clean.
    #[inline]
    pub fn store_world(&mut self, world: Transform) {
        self.world = world;
        self.dirty = false;
    }

    // -------------------------------------------------------------------------
    // Cache State
    // -------------------------------------------------------------------------

    /// Check if the cache is dirty (needs recomputation).
    #[must_use]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Manually mark the cache as dirty.
    ///
    /// Used when an ancestor changed.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
