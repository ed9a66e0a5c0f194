//! Collision queries module
//!
//! Built on top of rapier3d

mod query;
mod world;

pub use query::{CastShape, ColliderRef, EmptySpace, RayHit, ShapeCast, ShapeCastHit, ShapeCastStatus};
pub use world::{ColliderHandle, PhysicsWorld, RigidBodyHandle};
