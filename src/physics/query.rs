//! Shape-cast query interface
//!
//! The camera rig only needs "sweep a sphere, report the first obstruction".
//! Anything that can answer that implements [`ShapeCast`].

use glam::DVec3;

use crate::core::RigError;
use crate::ecs::EntityId;

/// Volume swept through the world by a cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CastShape {
    /// Ball of the given radius
    Sphere {
        /// Ball radius
        radius: f64,
    },
}

/// Outcome reported by the cast solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeCastStatus {
    /// The solver found the time of impact
    Converged,
    /// The solver gave up; the hit is approximate
    OutOfIterations,
    /// The solver failed; the hit is unreliable
    Failed,
    /// The shapes already overlapped at the start of the cast
    Penetrating,
}

/// Reference to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderRef {
    /// Arena index
    pub index: u32,
    /// Arena generation
    pub generation: u32,
    /// Entity the collider was attached for, if any
    pub entity: Option<EntityId>,
}

/// First obstruction found by a shape cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastHit {
    /// The collider that was hit
    pub collider: ColliderRef,
    /// Distance travelled along the (unit) cast direction
    pub distance: f64,
    /// Contact point on the hit collider, in its local space
    pub witness1: DVec3,
    /// Contact point on the cast shape, in its local space
    pub witness2: DVec3,
    /// Contact normal on the hit collider, in its local space
    pub normal1: DVec3,
    /// Contact normal on the cast shape, in its local space
    pub normal2: DVec3,
    /// Solver status
    pub status: ShapeCastStatus,
}

/// First collider hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The collider that was hit
    pub collider: ColliderRef,
    /// Distance travelled along the (unit) ray direction
    pub distance: f64,
}

/// A world that can sweep shapes
pub trait ShapeCast {
    /// Sweep `shape` from `origin` along `direction` for up to `max_distance`.
    ///
    /// With `solid == false` a shape that starts out overlapping a collider
    /// and moves away from it does not report that collider.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ShapeCastUnavailable`] when the query cannot be
    /// answered.
    fn cast(
        &self,
        origin: DVec3,
        shape: CastShape,
        direction: DVec3,
        max_distance: f64,
        solid: bool,
    ) -> Result<Option<ShapeCastHit>, RigError>;
}

impl<T: ShapeCast + ?Sized> ShapeCast for &T {
    fn cast(
        &self,
        origin: DVec3,
        shape: CastShape,
        direction: DVec3,
        max_distance: f64,
        solid: bool,
    ) -> Result<Option<ShapeCastHit>, RigError> {
        (**self).cast(origin, shape, direction, max_distance, solid)
    }
}

/// A world with nothing in it. Every cast misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySpace;

impl ShapeCast for EmptySpace {
    fn cast(
        &self,
        _origin: DVec3,
        _shape: CastShape,
        _direction: DVec3,
        _max_distance: f64,
        _solid: bool,
    ) -> Result<Option<ShapeCastHit>, RigError> {
        Ok(None)
    }
}
