//! Error types for stack composition.

use std::path::PathBuf;

use thiserror::Error;

use crate::region::Environment;

/// Result type alias for stack operations.
pub type InfraResult<T> = Result<T, InfraError>;

/// Errors that can occur while composing or synthesizing stacks.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    #[error("Invalid stack kind: {0}")]
    InvalidStackKind(String),

    #[error("Missing required parameter '{field}' for environment {environment}")]
    MissingParameter { environment: Environment, field: String },

    #[error("No parameters configured for environment {0}")]
    MissingEnvironment(Environment),

    #[error("State key collision in bucket {bucket}: {key} is used by both {first} and {second}")]
    StateKeyCollision {
        bucket: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("Duplicate stack id: {0}")]
    DuplicateStack(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Cannot read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
