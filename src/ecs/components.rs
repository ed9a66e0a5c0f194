//! Common ECS components

use std::fmt;

use glam::{DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that a rotation is a unit quaternion
pub const ROTATION_EPSILON: f64 = 1.0e-6;

/// Opaque identifier of an entity within one world
///
/// Built from the bit representation of a [`hecs::Entity`], so the generation
/// travels with the index and stale ids never alias a respawned slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Create an id from raw bits
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get the raw bits
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Get the hecs entity this id was built from, if the bits are valid
    #[must_use]
    pub fn entity(self) -> Option<hecs::Entity> {
        hecs::Entity::from_bits(self.0)
    }
}

impl From<hecs::Entity> for EntityId {
    fn from(entity: hecs::Entity) -> Self {
        Self(entity.to_bits().get())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {:#x}", self.0)
    }
}

/// Position, rotation and scale of an entity, in local or world space
///
/// Negative scale components are accepted as a mirroring convention and are
/// never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation
    pub position: DVec3,
    /// Rotation as a unit quaternion
    pub rotation: DQuat,
    /// Per-axis scale factor
    pub scale: DVec3,
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    /// Create a new transform at the origin
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    #[must_use]
    pub fn from_position_rotation(position: DVec3, rotation: DQuat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create from position, rotation, and scale
    #[must_use]
    pub fn from_parts(position: DVec3, rotation: DQuat, scale: DVec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Whether the rotation is a unit quaternion within [`ROTATION_EPSILON`]
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        (self.rotation.length() - 1.0).abs() <= ROTATION_EPSILON
    }

    /// Applies `local` inside the frame described by `self`.
    ///
    /// `self` is the parent (world) frame:
    /// - position = parent.position + parent.rotation * (parent.scale * local.position)
    /// - rotation = parent.rotation * local.rotation
    /// - scale = parent.scale * local.scale
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        let parent_rotation = unit(self.rotation);
        let local_rotation = unit(local.rotation);

        Self {
            position: self.position + parent_rotation * (self.scale * local.position),
            rotation: parent_rotation * local_rotation,
            scale: self.scale * local.scale,
        }
    }

    /// Back-solves the local transform that yields `world` when composed
    /// under `self`.
    ///
    /// Returns `None` when a scale component of `self` is zero.
    #[must_use]
    pub fn inverse_compose(&self, world: &Self) -> Option<Self> {
        if self.scale.cmpeq(DVec3::ZERO).any() {
            return None;
        }

        let inverse_rotation = unit(self.rotation).inverse();

        Some(Self {
            position: (inverse_rotation * (world.position - self.position)) / self.scale,
            rotation: inverse_rotation * unit(world.rotation),
            scale: world.scale / self.scale,
        })
    }

    /// Get the transformation matrix
    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Transform a point from this frame into the enclosing one
    #[must_use]
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.position + unit(self.rotation) * (self.scale * point)
    }

    /// Get the forward direction (negative Z in local space)
    #[must_use]
    pub fn forward(&self) -> DVec3 {
        self.rotation * DVec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    #[must_use]
    pub fn right(&self) -> DVec3 {
        self.rotation * DVec3::X
    }

    /// Get the up direction (positive Y in local space)
    #[must_use]
    pub fn up(&self) -> DVec3 {
        self.rotation * DVec3::Y
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: DVec3) {
        self.position += delta;
    }

    /// Rotate by euler angles (in radians)
    pub fn rotate_euler(&mut self, euler: DVec3) {
        self.rotation =
            DQuat::from_euler(glam::EulerRot::XYZ, euler.x, euler.y, euler.z) * self.rotation;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalizes a rotation unless it already is a unit quaternion.
fn unit(rotation: DQuat) -> DQuat {
    if (rotation.length() - 1.0).abs() <= ROTATION_EPSILON {
        rotation
    } else {
        rotation.normalize()
    }
}

/// Name component for debugging and scene files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1.0e-9
    }

    #[test]
    fn test_compose_scaled_parent() {
        let parent = Transform::from_parts(DVec3::new(1.0, 0.0, 0.0), DQuat::IDENTITY, DVec3::splat(2.0));
        let local = Transform::from_position(DVec3::new(1.0, 0.0, 0.0));

        let world = parent.compose(&local);

        assert!(approx(world.position, DVec3::new(3.0, 0.0, 0.0)));
        assert!(approx(world.scale, DVec3::splat(2.0)));
    }

    #[test]
    fn test_compose_rotated_parent() {
        let parent = Transform::from_position_rotation(
            DVec3::ZERO,
            DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2),
        );
        let local = Transform::from_position(DVec3::new(0.0, 0.0, -1.0));

        let world = parent.compose(&local);

        // A quarter turn about +Y maps -Z onto -X
        assert!(approx(world.position, DVec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_compose_normalizes_rotation() {
        let parent = Transform::from_position_rotation(DVec3::ZERO, DQuat::from_xyzw(0.0, 0.0, 0.0, 2.0));
        let local = Transform::from_position(DVec3::X);

        let world = parent.compose(&local);

        assert!(world.is_normalized());
        assert!(approx(world.position, DVec3::X));
    }

    #[test]
    fn test_inverse_compose_recovers_local() {
        let parent = Transform::from_parts(
            DVec3::new(2.0, -1.0, 4.0),
            DQuat::from_rotation_z(0.7),
            DVec3::new(2.0, 0.5, 3.0),
        );
        let local = Transform::from_parts(
            DVec3::new(0.3, 1.5, -2.0),
            DQuat::from_rotation_x(-0.4),
            DVec3::new(1.0, 2.0, 0.5),
        );

        let world = parent.compose(&local);
        let solved = parent.inverse_compose(&world).unwrap();

        assert!(approx(solved.position, local.position));
        assert!(approx(solved.scale, local.scale));
        assert!(solved.rotation.abs_diff_eq(local.rotation, 1.0e-9));
    }

    #[test]
    fn test_inverse_compose_zero_scale() {
        let parent = Transform::from_parts(DVec3::ZERO, DQuat::IDENTITY, DVec3::new(1.0, 0.0, 1.0));
        assert!(parent.inverse_compose(&Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_negative_scale_mirrors() {
        let parent = Transform::from_parts(DVec3::ZERO, DQuat::IDENTITY, DVec3::new(-1.0, 1.0, 1.0));
        let local = Transform::from_position(DVec3::new(2.0, 0.0, 0.0));

        let world = parent.compose(&local);

        assert!(approx(world.position, DVec3::new(-2.0, 0.0, 0.0)));
        assert_eq!(world.scale.x, -1.0);
    }

    #[test]
    fn test_entity_id_roundtrip() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());

        let id = EntityId::from(entity);

        assert_eq!(id.entity(), Some(entity));
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn test_directions() {
        let t = Transform::new();
        assert!(approx(t.forward(), DVec3::NEG_Z));
        assert!(approx(t.right(), DVec3::X));
        assert!(approx(t.up(), DVec3::Y));
    }
}
