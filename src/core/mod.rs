//! Core module
//!
//! Errors, configuration and scene persistence

mod config;
mod error;
mod scene;

pub use config::RigConfig;
pub use error::{PersistError, RigError};
pub use scene::{SceneSnapshot, SerializedEntity};
