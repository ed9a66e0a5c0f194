//! Perspective camera

use glam::{DMat4, DVec3};

/// Perspective camera positioned by an eye and a look-at target
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub eye: DVec3,
    /// Point the camera looks at
    pub target: DVec3,
    /// Up vector
    pub up: DVec3,
    /// Vertical field of view in radians
    pub fov_y: f64,
    /// Near clipping plane
    pub near: f64,
    /// Far clipping plane
    pub far: f64,
    /// Aspect ratio (width / height)
    pub aspect: f64,
}

impl Camera {
    /// Create a new camera with default settings
    pub fn new() -> Self {
        Self {
            eye: DVec3::new(0.0, 0.0, 5.0),
            target: DVec3::ZERO,
            up: DVec3::Y,
            fov_y: std::f64::consts::FRAC_PI_4, // 45 degrees
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
        }
    }

    /// Create a camera at a specific position looking at a target
    pub fn look_at(eye: DVec3, target: DVec3, up: DVec3) -> Self {
        Self {
            eye,
            target,
            up,
            ..Self::new()
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> DMat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = f64::from(width) / f64::from(height.max(1));
    }

    /// Get the forward vector (zero if eye and target coincide)
    pub fn forward(&self) -> DVec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    /// Get the right vector
    pub fn right(&self) -> DVec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
