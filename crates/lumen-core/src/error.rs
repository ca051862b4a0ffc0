//! Error types for the Lumen upload pipeline.
//!
//! Errors are organized by pipeline stage so the HTTP layer can log which
//! remote call failed while still returning a uniform response to clients.

use std::fmt;
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variables are unset or empty
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// A failure reported by the object store for one raw operation.
///
/// Store operations are narrow (put/copy/delete/head); the pipeline wraps
/// these into the [`PipelineError`] variant of the step that invoked them.
#[derive(Error, Debug)]
#[error("{operation} failed for key '{key}': {message}")]
pub struct StoreError {
    /// Operation name ("put", "copy", "delete", "head")
    pub operation: &'static str,
    /// Key the operation targeted
    pub key: String,
    /// Underlying SDK error text
    pub message: String,
}

/// Which leg of the copy-then-delete rename failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamePhase {
    /// Copying to the new key
    Copy,
    /// Deleting the original key after a successful copy
    Delete,
}

impl fmt::Display for RenamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenamePhase::Copy => write!(f, "copy"),
            RenamePhase::Delete => write!(f, "delete"),
        }
    }
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Request failed validation before any remote call
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Storing the uploaded file failed
    #[error("Upload failed for '{key}': {message}")]
    Upload { key: String, message: String },

    /// The remote caption request failed or reached a failed terminal state
    #[error("Caption request failed for {image_url}: {message}")]
    Caption { image_url: String, message: String },

    /// The copy or delete leg of a rename failed.
    ///
    /// A failed delete leaves the object at both keys; callers get the error
    /// and no rollback is attempted.
    #[error("Rename failed in {phase} phase ('{old_key}' -> '{new_key}'): {message}")]
    Rename {
        phase: RenamePhase,
        old_key: String,
        new_key: String,
        message: String,
    },

    /// Building or uploading the batch CSV manifest failed
    #[error("Manifest generation failed: {message}")]
    Manifest { message: String },
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
