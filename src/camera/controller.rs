//! Third-person orbit controller
//!
//! Follows an entity, orbits around it with yaw/pitch input and keeps the
//! camera out of walls through a [`SpringCameraRig`].

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::spring::{MIN_CAMERA_DISTANCE, SpringCameraRig, SpringSettings};
use crate::core::RigError;
use crate::ecs::{EntityId, World};
use crate::physics::ShapeCast;

/// Steepest pitch the orbit may reach, in degrees
const MAX_PITCH_DEGREES: f64 = 89.0;

/// Tuning for a [`ThirdPersonController`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Preferred arm length
    pub distance: f64,
    /// Offset from the followed entity's origin to the orbit pivot
    pub pivot_offset: DVec3,
    /// Radians of rotation per unit of input
    pub sensitivity: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            distance: 5.0,
            pivot_offset: DVec3::new(0.0, 1.5, 0.0),
            sensitivity: 0.003,
        }
    }
}

/// Springy third-person camera controller
#[derive(Debug, Clone)]
pub struct ThirdPersonController {
    /// Entity being followed
    pub target: EntityId,
    /// Offset from the followed entity's origin to the orbit pivot
    pub pivot_offset: DVec3,
    /// Radians of rotation per unit of input
    pub sensitivity: f64,
    distance: f64,
    /// Yaw angle (rotation around Y axis)
    yaw: f64,
    /// Pitch angle (rotation around X axis)
    pitch: f64,
    rig: SpringCameraRig,
}

impl ThirdPersonController {
    /// Attach a controller to `target`
    pub fn new(target: EntityId, settings: &ControllerSettings, spring: SpringSettings) -> Self {
        let distance = settings.distance.max(MIN_CAMERA_DISTANCE);
        Self {
            target,
            pivot_offset: settings.pivot_offset,
            sensitivity: settings.sensitivity,
            distance,
            yaw: -90.0_f64.to_radians(),
            pitch: 0.0,
            rig: SpringCameraRig::with_distance(spring, distance),
        }
    }

    /// Preferred arm length
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Change the preferred arm length. The arm eases towards it.
    pub fn set_distance(&mut self, distance: f64) {
        self.distance = distance.max(MIN_CAMERA_DISTANCE);
    }

    /// Yaw and pitch in radians
    pub fn angles(&self) -> (f64, f64) {
        (self.yaw, self.pitch)
    }

    /// The spring arm driving this controller
    pub fn rig(&self) -> &SpringCameraRig {
        &self.rig
    }

    /// Rotate the orbit using mouse delta
    pub fn rotate(&mut self, delta_x: f64, delta_y: f64) {
        self.yaw += delta_x * self.sensitivity;
        self.pitch -= delta_y * self.sensitivity;

        // Clamp pitch to avoid gimbal lock
        let max_pitch = MAX_PITCH_DEGREES.to_radians();
        self.pitch = self.pitch.clamp(-max_pitch, max_pitch);
    }

    /// Direction the camera looks along
    pub fn forward(&self) -> DVec3 {
        DVec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Move `camera` for this frame.
    ///
    /// When the pivot and the desired eye coincide the camera keeps its
    /// previous pose.
    ///
    /// # Errors
    ///
    /// Returns the transform error if the followed entity's world transform
    /// cannot be resolved.
    pub fn update<C: ShapeCast + ?Sized>(
        &mut self,
        world: &mut World,
        caster: &C,
        camera: &mut Camera,
        dt: f64,
    ) -> Result<(), RigError> {
        let followed = world.world_transform(self.target).inspect_err(|err| {
            log::warn!("Camera lost its target: {err}");
        })?;

        let pivot = followed.position + self.pivot_offset;
        let desired_eye = pivot - self.forward() * self.distance;

        match self.rig.update(caster, pivot, desired_eye, dt) {
            Ok(eye) => {
                camera.eye = eye;
                camera.target = pivot;
                Ok(())
            }
            Err(RigError::DegenerateDirection) => {
                log::debug!("Camera pivot and eye coincide, holding previous pose");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
