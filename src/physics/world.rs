//! Collision world using rapier3d
//!
//! Only collision queries live here: bodies are fixed or kinematic and are
//! placed by the host. Rigid-body dynamics are not simulated.

use glam::{DQuat, DVec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::parry::query::{ShapeCastOptions, ShapeCastStatus as ParryStatus};
use rapier3d::parry::shape::Ball;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

use super::query::{CastShape, ColliderRef, RayHit, ShapeCast, ShapeCastHit, ShapeCastStatus};
use crate::core::RigError;
use crate::ecs::EntityId;

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Convert glam DQuat to rapier3d UnitQuaternion
fn quat_to_rapier(q: DQuat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w as f32, q.x as f32, q.y as f32, q.z as f32))
}

/// Convert rapier3d UnitQuaternion to glam DQuat
fn rapier_to_quat(uq: &UnitQuaternion<f32>) -> DQuat {
    let q = uq.quaternion();
    DQuat::from_xyzw(f64::from(q.i), f64::from(q.j), f64::from(q.k), f64::from(q.w))
}

fn isometry(position: DVec3, rotation: DQuat) -> Isometry<Real> {
    Isometry::from_parts(
        Translation3::new(position.x as f32, position.y as f32, position.z as f32),
        quat_to_rapier(rotation),
    )
}

fn to_dvec3(x: f32, y: f32, z: f32) -> DVec3 {
    DVec3::new(f64::from(x), f64::from(y), f64::from(z))
}

impl From<ParryStatus> for ShapeCastStatus {
    fn from(status: ParryStatus) -> Self {
        match status {
            ParryStatus::Converged => Self::Converged,
            ParryStatus::OutOfIterations => Self::OutOfIterations,
            ParryStatus::Failed => Self::Failed,
            ParryStatus::PenetratingOrWithinTargetDist => Self::Penetrating,
        }
    }
}

/// Collision world manager
pub struct PhysicsWorld {
    /// Island manager (needed to remove bodies)
    island_manager: IslandManager,
    /// Rigid body set
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,
    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,
    /// Query pipeline for shape casts
    query_pipeline: QueryPipeline,
    /// Entity each collider was attached for
    collider_entities: FxHashMap<rapier3d::geometry::ColliderHandle, EntityId>,
    /// Whether bodies or colliders changed since the last refresh
    queries_stale: bool,
}

impl PhysicsWorld {
    /// Create an empty collision world
    pub fn new() -> Self {
        Self {
            island_manager: IslandManager::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            query_pipeline: QueryPipeline::new(),
            collider_entities: FxHashMap::default(),
            queries_stale: false,
        }
    }

    /// Bring collider poses and the query pipeline up to date.
    ///
    /// Casts fail with [`RigError::ShapeCastUnavailable`] until this is called
    /// after any change to bodies or colliders.
    pub fn refresh_queries(&mut self) {
        self.rigid_body_set
            .propagate_modified_body_positions_to_colliders(&mut self.collider_set);
        self.query_pipeline.update(&self.collider_set);
        self.queries_stale = false;
    }

    /// Whether [`Self::refresh_queries`] must run before the next cast
    pub fn queries_stale(&self) -> bool {
        self.queries_stale
    }

    /// Create a static rigid body (doesn't move)
    pub fn create_static_body(&mut self, position: DVec3, rotation: DQuat) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .position(isometry(position, rotation))
            .build();

        self.queries_stale = true;
        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a kinematic rigid body (placed by the host each frame)
    pub fn create_kinematic_body(&mut self, position: DVec3, rotation: DQuat) -> RigidBodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .position(isometry(position, rotation))
            .build();

        self.queries_stale = true;
        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Add a box collider to a rigid body
    pub fn add_box_collider(
        &mut self,
        body: RigidBodyHandle,
        half_extents: DVec3,
        entity: Option<EntityId>,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(
            half_extents.x as f32,
            half_extents.y as f32,
            half_extents.z as f32,
        )
        .build();

        self.attach(body, collider, entity)
    }

    /// Add a sphere collider to a rigid body
    pub fn add_sphere_collider(
        &mut self,
        body: RigidBodyHandle,
        radius: f64,
        entity: Option<EntityId>,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius as f32).build();

        self.attach(body, collider, entity)
    }

    /// Add a capsule collider to a rigid body
    pub fn add_capsule_collider(
        &mut self,
        body: RigidBodyHandle,
        half_height: f64,
        radius: f64,
        entity: Option<EntityId>,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::capsule_y(half_height as f32, radius as f32).build();

        self.attach(body, collider, entity)
    }

    fn attach(
        &mut self,
        body: RigidBodyHandle,
        collider: Collider,
        entity: Option<EntityId>,
    ) -> ColliderHandle {
        let handle =
            self.collider_set
                .insert_with_parent(collider, body.0, &mut self.rigid_body_set);
        if let Some(entity) = entity {
            self.collider_entities.insert(handle, entity);
        }

        self.queries_stale = true;
        ColliderHandle(handle)
    }

    /// Get the position of a rigid body
    pub fn get_position(&self, body: RigidBodyHandle) -> Option<DVec3> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let pos = rb.translation();
            to_dvec3(pos.x, pos.y, pos.z)
        })
    }

    /// Get the rotation of a rigid body
    pub fn get_rotation(&self, body: RigidBodyHandle) -> Option<DQuat> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_quat(rb.rotation()))
    }

    /// Teleport a body, typically to follow an entity's world transform
    pub fn set_body_pose(&mut self, body: RigidBodyHandle, position: DVec3, rotation: DQuat) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_position(isometry(position, rotation), true);
            self.queries_stale = true;
        }
    }

    /// Entity a collider was attached for
    pub fn collider_entity(&self, collider: ColliderHandle) -> Option<EntityId> {
        self.collider_entities.get(&collider.0).copied()
    }

    /// Number of colliders
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Cast a ray from `origin` along `direction` for up to `max_distance`.
    ///
    /// With `solid == false` a ray starting inside a collider reports where
    /// it exits instead of a hit at distance zero.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ShapeCastUnavailable`] when the query pipeline is
    /// stale or the ray is not usable.
    pub fn raycast(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_distance: f64,
        solid: bool,
    ) -> Result<Option<RayHit>, RigError> {
        let dir = self.query_direction(origin, direction, max_distance)?;

        let ray = Ray::new(
            point![origin.x as f32, origin.y as f32, origin.z as f32],
            vector![dir.x as f32, dir.y as f32, dir.z as f32],
        );
        let hit = self.query_pipeline.cast_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance.max(0.0) as f32,
            solid,
            QueryFilter::default(),
        );

        Ok(hit.map(|(handle, distance)| RayHit {
            collider: self.collider_ref(handle),
            distance: f64::from(distance),
        }))
    }

    /// Checks that queries can run and returns the unit direction
    fn query_direction(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_distance: f64,
    ) -> Result<DVec3, RigError> {
        if self.queries_stale {
            return Err(RigError::ShapeCastUnavailable(
                "query pipeline is out of date".to_string(),
            ));
        }
        if !origin.is_finite() || !direction.is_finite() || !max_distance.is_finite() {
            return Err(RigError::ShapeCastUnavailable(
                "non-finite cast parameters".to_string(),
            ));
        }

        let length = direction.length();
        if length <= f64::EPSILON {
            return Err(RigError::ShapeCastUnavailable(
                "zero cast direction".to_string(),
            ));
        }
        Ok(direction / length)
    }

    fn collider_ref(&self, handle: rapier3d::geometry::ColliderHandle) -> ColliderRef {
        let (index, generation) = handle.into_raw_parts();
        ColliderRef {
            index,
            generation,
            entity: self.collider_entities.get(&handle).copied(),
        }
    }

    /// Remove a rigid body and its colliders
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.rigid_body_set.get(body.0) {
            for collider in rb.colliders() {
                self.collider_entities.remove(collider);
            }
        }

        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.queries_stale = true;
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeCast for PhysicsWorld {
    fn cast(
        &self,
        origin: DVec3,
        shape: CastShape,
        direction: DVec3,
        max_distance: f64,
        solid: bool,
    ) -> Result<Option<ShapeCastHit>, RigError> {
        let dir = self.query_direction(origin, direction, max_distance)?;

        let CastShape::Sphere { radius } = shape;
        let ball = Ball::new(radius as f32);
        let pose = Isometry::translation(origin.x as f32, origin.y as f32, origin.z as f32);
        let velocity = vector![dir.x as f32, dir.y as f32, dir.z as f32];

        let options = ShapeCastOptions {
            max_time_of_impact: max_distance.max(0.0) as f32,
            target_distance: 0.0,
            stop_at_penetration: solid,
            compute_impact_geometry_on_penetration: true,
        };

        let hit = self.query_pipeline.cast_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &pose,
            &velocity,
            &ball,
            options,
            QueryFilter::default(),
        );

        Ok(hit.map(|(handle, toi)| ShapeCastHit {
            collider: self.collider_ref(handle),
            distance: f64::from(toi.time_of_impact),
            witness1: to_dvec3(toi.witness1.x, toi.witness1.y, toi.witness1.z),
            witness2: to_dvec3(toi.witness2.x, toi.witness2.y, toi.witness2.z),
            normal1: to_dvec3(toi.normal1.x, toi.normal1.y, toi.normal1.z),
            normal2: to_dvec3(toi.normal2.x, toi.normal2.y, toi.normal2.z),
            status: toi.status.into(),
        }))
    }
}
