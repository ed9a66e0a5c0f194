//! Rig configuration
//!
//! Loaded from RON or JSON. Missing fields fall back to their defaults, so a
//! file only needs to list what it changes.

use std::fs;
use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::error::PersistError;
use crate::camera::{ControllerSettings, SpringSettings};
use crate::ecs::MAX_HIERARCHY_DEPTH;

/// Configuration for the transform hierarchy and camera rig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Hop limit for parent chains
    pub max_hierarchy_depth: usize,
    /// Spring arm tuning
    pub spring: SpringSettings,
    /// Orbit controller tuning
    pub controller: ControllerSettings,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: MAX_HIERARCHY_DEPTH,
            spring: SpringSettings::default(),
            controller: ControllerSettings::default(),
        }
    }
}

impl RigConfig {
    /// Set the hop limit for parent chains
    pub fn with_max_hierarchy_depth(mut self, depth: usize) -> Self {
        self.max_hierarchy_depth = depth;
        self
    }

    /// Set the clearance kept in front of obstructions
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.spring.margin = margin;
        self
    }

    /// Set the radius of the swept sphere
    pub fn with_sphere_radius(mut self, radius: f64) -> Self {
        self.spring.sphere_radius = radius;
        self
    }

    /// Set how quickly the arm extends again after an obstruction
    pub fn with_return_speed(mut self, speed: f64) -> Self {
        self.spring.return_speed = speed;
        self
    }

    /// Set the preferred arm length
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.controller.distance = distance;
        self
    }

    /// Set the pivot offset from the followed entity
    pub fn with_pivot_offset(mut self, offset: DVec3) -> Self {
        self.controller.pivot_offset = offset;
        self
    }

    /// Set the rotation sensitivity
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.controller.sensitivity = sensitivity;
        self
    }

    /// Parse a config from a RON string
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config
    pub fn from_ron_str(text: &str) -> Result<Self, PersistError> {
        ron::from_str(text).map_err(|e| PersistError::Deserialize(e.to_string()))
    }

    /// Render the config as pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, PersistError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| PersistError::Serialize(e.to_string()))
    }

    /// Load a config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Load a config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| PersistError::Deserialize(e.to_string()))
    }

    /// Save the config to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PersistError::Serialize(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}
