//! Error types for the diet_core library.

use crate::types::Collection;
use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for diet_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the underlying storage engine
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Update referenced a record that does not exist
    #[error("no {collection} record with id {id}")]
    NotFound { collection: Collection, id: Uuid },

    /// Insert collided with an existing record id
    #[error("duplicate {collection} id {id}")]
    DuplicateKey { collection: Collection, id: Uuid },

    /// Record or import document failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
