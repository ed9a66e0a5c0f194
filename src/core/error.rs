//! Error types shared by the transform graph, camera rig and persistence

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors reported by transform and camera queries.
///
/// None of these are fatal to the process: callers degrade to a safe default
/// (previous camera position, treating an entity as a root, no obstruction).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    /// The parent chain did not reach a root within the hop limit
    #[error("parent chain of {entity} did not terminate within {depth} hops")]
    CycleDetected {
        /// Entity whose query walked the chain
        entity: EntityId,
        /// Hops walked before giving up
        depth: usize,
    },

    /// The entity has no transform entry
    #[error("{0} has no transform")]
    UnknownEntity(EntityId),

    /// Camera anchor and target coincide, so there is no cast direction
    #[error("camera anchor and target coincide")]
    DegenerateDirection,

    /// The physics collaborator could not answer a shape cast
    #[error("shape cast unavailable: {0}")]
    ShapeCastUnavailable(String),

    /// A world transform cannot be expressed under a parent with zero scale
    #[error("cannot solve local transform of {entity}: parent scale has a zero component")]
    SingularScale {
        /// Entity whose world transform was being set
        entity: EntityId,
    },
}

/// Errors that can occur while reading or writing scene and config files
#[derive(Debug, Error)]
pub enum PersistError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
