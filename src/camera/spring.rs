//! Spring-arm camera distance solver
//!
//! Each frame a sphere is cast from the anchor (usually the followed entity's
//! head) towards the desired camera position. When something is in the way
//! the arm snaps in to just in front of it; when the way clears it eases back
//! out at `return_speed`.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::RigError;
use crate::physics::{CastShape, ShapeCast};

/// Closest the camera may get to its anchor
pub const MIN_CAMERA_DISTANCE: f64 = 0.1;

/// Anchor/target separations below this have no usable direction
pub const DIRECTION_EPSILON: f64 = 1.0e-6;

/// Tuning for a [`SpringCameraRig`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringSettings {
    /// Clearance kept between the camera and an obstruction
    pub margin: f64,
    /// Radius of the cast sphere
    pub sphere_radius: f64,
    /// Fraction of the remaining gap recovered per second when unobstructed
    pub return_speed: f64,
}

impl Default for SpringSettings {
    fn default() -> Self {
        Self {
            margin: 0.2,
            sphere_radius: 0.25,
            return_speed: 5.0,
        }
    }
}

/// Collision-aware camera distance with asymmetric damping
#[derive(Debug, Clone)]
pub struct SpringCameraRig {
    current_distance: f64,
    settings: SpringSettings,
    obstructed: bool,
}

impl SpringCameraRig {
    /// Create a rig that starts fully retracted
    #[must_use]
    pub fn new(settings: SpringSettings) -> Self {
        Self::with_distance(settings, 0.0)
    }

    /// Create a rig that starts at `distance`
    #[must_use]
    pub fn with_distance(settings: SpringSettings, distance: f64) -> Self {
        Self {
            current_distance: distance.max(0.0),
            settings,
            obstructed: false,
        }
    }

    /// Current arm length
    #[must_use]
    pub fn current_distance(&self) -> f64 {
        self.current_distance
    }

    /// Tuning in use
    #[must_use]
    pub fn settings(&self) -> &SpringSettings {
        &self.settings
    }

    /// Replace the tuning, keeping the current arm length
    pub fn set_settings(&mut self, settings: SpringSettings) {
        self.settings = settings;
    }

    /// Whether the last successful update found an obstruction
    #[must_use]
    pub fn last_obstruction(&self) -> bool {
        self.obstructed
    }

    /// Jump the arm to `distance`, e.g. after a camera cut
    pub fn reset(&mut self, distance: f64) {
        self.current_distance = distance.max(0.0);
        self.obstructed = false;
    }

    /// Advance the arm by one frame and return the camera position.
    ///
    /// A shape cast failure is logged and treated as "nothing in the way".
    /// A `dt` large enough to close the gap in one step is clamped to a
    /// single full step.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::DegenerateDirection`] when `anchor` and `target`
    /// coincide (or are not finite). The rig state is left untouched and the
    /// caller should keep its previous camera position.
    pub fn update<C: ShapeCast + ?Sized>(
        &mut self,
        caster: &C,
        anchor: DVec3,
        target: DVec3,
        dt: f64,
    ) -> Result<DVec3, RigError> {
        let to_target = target - anchor;
        let max_distance = to_target.length();
        if !max_distance.is_finite() || max_distance < DIRECTION_EPSILON {
            return Err(RigError::DegenerateDirection);
        }
        let direction = to_target / max_distance;

        let shape = CastShape::Sphere {
            radius: self.settings.sphere_radius,
        };
        let hit = match caster.cast(anchor, shape, direction, max_distance, false) {
            Ok(hit) => hit,
            Err(err) => {
                log::warn!("Camera shape cast failed, assuming clear line of sight: {err}");
                None
            }
        };

        let target_distance = match hit {
            Some(hit) => (hit.distance - self.settings.margin).max(MIN_CAMERA_DISTANCE),
            None => max_distance,
        };
        self.obstructed = hit.is_some();

        if target_distance < self.current_distance {
            self.current_distance = target_distance;
        } else {
            let step = self.settings.return_speed * dt;
            let t = if step.is_nan() { 0.0 } else { step.clamp(0.0, 1.0) };
            self.current_distance += (target_distance - self.current_distance) * t;
        }

        Ok(anchor + direction * self.current_distance)
    }
}

impl Default for SpringCameraRig {
    fn default() -> Self {
        Self::new(SpringSettings::default())
    }
}
