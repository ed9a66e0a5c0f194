//! Hierarchical transforms and a collision-aware third-person camera
//!
//! This crate provides:
//! - Entity Component System (ECS) world built on hecs
//! - Lazily propagated parent/child transforms with cycle detection
//! - Spring-arm camera that snaps in front of obstructions and eases back out
//! - Shape-cast queries backed by rapier3d
//! - Scene and config persistence in RON or JSON

pub mod camera;
pub mod core;
pub mod ecs;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::camera::{
        Camera, ControllerSettings, SpringCameraRig, SpringSettings, ThirdPersonController,
    };
    pub use crate::core::{PersistError, RigConfig, RigError, SceneSnapshot};
    pub use crate::ecs::{EntityId, Name, ParentLookup, Transform, TransformGraph, World};
    pub use crate::physics::{EmptySpace, PhysicsWorld, ShapeCast};
    pub use glam::{DMat4, DQuat, DVec3};
}
