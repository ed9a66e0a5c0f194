//! Entity Component System module
//!
//! Built on top of the hecs ECS library. Transforms are kept outside hecs in
//! a [`TransformGraph`] that caches world transforms.

mod cached;
mod components;
mod graph;
mod hierarchy;
mod world;

pub use cached::TransformEntry;
pub use components::{EntityId, Name, ROTATION_EPSILON, Transform};
pub use graph::TransformGraph;
pub use hierarchy::{Children, MAX_HIERARCHY_DEPTH, Parent, ParentLookup};
pub use world::World;
