//! Camera module
//!
//! A perspective [`Camera`], the collision-aware [`SpringCameraRig`] and a
//! [`ThirdPersonController`] that ties them to an entity.

mod camera;
mod controller;
mod spring;

pub use camera::Camera;
pub use controller::{ControllerSettings, ThirdPersonController};
pub use spring::{DIRECTION_EPSILON, MIN_CAMERA_DISTANCE, SpringCameraRig, SpringSettings};
