//! Scene serialization and deserialization
//!
//! Captures the transform hierarchy of a [`World`] and restores it into
//! another one. Supports RON (Rusty Object Notation) and JSON files.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::PersistError;
use crate::ecs::{EntityId, Name, Transform, World};

/// A serializable entity with its transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEntity {
    /// Optional entity name
    #[serde(default)]
    pub name: Option<String>,
    /// Local transform
    pub transform: Transform,
    /// Parent entity index (if any)
    #[serde(default)]
    pub parent_index: Option<usize>,
}

impl Default for SerializedEntity {
    fn default() -> Self {
        Self {
            name: None,
            transform: Transform::IDENTITY,
            parent_index: None,
        }
    }
}

/// A serializable snapshot of a transform hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    pub version: u32,
    /// All entities in the scene
    pub entities: Vec<SerializedEntity>,
}

impl SceneSnapshot {
    /// Create a new empty scene
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            entities: Vec::new(),
        }
    }

    /// Capture every entity that has a transform.
    ///
    /// Entities are ordered by id so captures of the same world are stable.
    #[must_use]
    pub fn capture(name: impl Into<String>, world: &World) -> Self {
        let mut ids: Vec<EntityId> = world.transforms().iter().map(|(id, _)| id).collect();
        ids.sort_by_key(|id| id.to_bits());

        let index: FxHashMap<EntityId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut scene = Self::new(name);
        for &id in &ids {
            let Some(transform) = world.local_transform(id) else {
                continue;
            };
            scene.entities.push(SerializedEntity {
                name: world.get::<Name>(id).ok().map(|n| n.0.clone()),
                transform,
                parent_index: world.parent(id).and_then(|p| index.get(&p).copied()),
            });
        }

        log::debug!("Captured {} entities into scene '{}'", scene.entities.len(), scene.name);
        scene
    }

    /// Spawn the scene's entities into `world`.
    ///
    /// Returns the new ids in scene order. Parent indices that are out of
    /// range, point at the entity itself, or would close a cycle are skipped
    /// and the entity stays a root.
    pub fn spawn_into(&self, world: &mut World) -> Vec<EntityId> {
        let spawned: Vec<EntityId> = self
            .entities
            .iter()
            .map(|entity| {
                let id = match &entity.name {
                    Some(name) => world.spawn((Name::new(name.clone()),)),
                    None => world.spawn(()),
                };
                // The id was just spawned, so this cannot fail
                let _ = world.set_local(id, entity.transform);
                id
            })
            .collect();

        for (i, entity) in self.entities.iter().enumerate() {
            let Some(parent_index) = entity.parent_index else {
                continue;
            };
            let Some(&parent) = spawned.get(parent_index).filter(|_| parent_index != i) else {
                log::warn!("Scene '{}': entity {i} has invalid parent index {parent_index}", self.name);
                continue;
            };
            if let Err(err) = world.set_parent(spawned[i], parent) {
                log::warn!("Scene '{}': skipping parent of entity {i}: {err}", self.name);
            }
        }

        spawned
    }

    /// Add an entity to the scene
    pub fn add_entity(&mut self, entity: SerializedEntity) -> usize {
        let index = self.entities.len();
        self.entities.push(entity);
        index
    }

    /// Save the scene to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| PersistError::Serialize(e.to_string()))?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    /// Load a scene from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path)?;
        ron::from_str(&content).map_err(|e| PersistError::Deserialize(e.to_string()))
    }

    /// Save the scene to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| PersistError::Serialize(e.to_string()))?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load a scene from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| PersistError::Deserialize(e.to_string()))
    }

    /// Get the number of entities
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Check if the scene is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
