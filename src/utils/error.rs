//! Error types for the image dropper.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Validation errors for ingested paths and settings.
#[derive(Error, Debug, Serialize)]
pub enum ValidationError {
    /// Path-related validation error
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Invalid settings error
    #[error("Settings error: {0}")]
    Settings(String),
}

/// File path errors.
#[derive(Error, Debug, Serialize)]
pub enum PathError {
    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// Path exists but is not a file
    #[error("Not a file: {0}")]
    NotFile(PathBuf),
}

/// Main error type for the application.
///
/// Every fallible service command except `transform` reports failures with
/// this type; its `Display` output is what ends up in a file entry's `error`.
#[derive(Error, Debug, Serialize)]
pub enum OptimizerError {
    /// Path or settings validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Image processing failed
    #[error("Processing error: {0}")]
    Processing(String),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// Unsupported or invalid image format
    #[error("Format error: {0}")]
    Format(String),

    /// Settings could not be loaded or saved
    #[error("Settings error: {0}")]
    Settings(String),
}

/// Convenience result type for optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Failure outcome of a `transform` command.
///
/// `NotSmaller` is not a hard failure: the optimizer ran but could not beat
/// the input size, so the original file is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum TransformError {
    #[error("{0}")]
    Generic(String),
    #[error("{0}")]
    NotSmaller(String),
}

impl TransformError {
    pub fn generic<T: Into<String>>(msg: T) -> Self {
        Self::Generic(msg.into())
    }

    pub fn not_smaller<T: Into<String>>(msg: T) -> Self {
        Self::NotSmaller(msg.into())
    }
}

// Helper methods for error creation
impl OptimizerError {
    pub fn processing<T: Into<String>>(msg: T) -> Self {
        Self::Processing(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        Self::IO(msg.into())
    }

    pub fn format<T: Into<String>>(msg: T) -> Self {
        Self::Format(msg.into())
    }

    pub fn settings<T: Into<String>>(msg: T) -> Self {
        Self::Settings(msg.into())
    }
}

// Helper methods for validation error creation
impl ValidationError {
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Path(PathError::NotFound(path.into()))
    }

    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::Path(PathError::NotFile(path.into()))
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

// Convert std::io::Error to OptimizerError
impl From<io::Error> for OptimizerError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

impl From<serde_json::Error> for OptimizerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Settings(err.to_string())
    }
}

// Convert PathError to OptimizerError
impl From<PathError> for OptimizerError {
    fn from(err: PathError) -> Self {
        Self::Validation(ValidationError::Path(err))
    }
}

impl From<OptimizerError> for TransformError {
    fn from(err: OptimizerError) -> Self {
        Self::Generic(err.to_string())
    }
}
