//! Error handling for webfeat
//!
//! One error type covers both the page renderer and the feature exporter.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for webfeat operations
pub type Result<T> = std::result::Result<T, WebfeatError>;

/// Main error type for webfeat operations
#[derive(Error, Debug)]
pub enum WebfeatError {
    // File Errors
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file: {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {}: {source}", path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {}: {source}", path.display())]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Template Errors
    #[error("Template has no '{name}' placeholder")]
    MissingPlaceholder { name: String },

    #[error("Invalid placeholder in template: line {line}, col {column}")]
    InvalidPlaceholder { line: usize, column: usize },

    #[error("Unknown placeholder in template: '{name}'")]
    UnknownPlaceholder { name: String },

    // Transform Errors
    #[error("Shape mismatch for {transform}: expected {expected}, got {actual}")]
    ShapeMismatch {
        transform: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unknown transform: {name}")]
    UnknownTransform { name: String },

    // Export Errors
    #[error("Unsupported operator '{op}' in node '{node}' of {transform}")]
    UnsupportedOperator {
        op: String,
        node: String,
        transform: String,
    },

    #[error("Invalid artifact at {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },

    // Audio Errors
    #[error("Invalid audio file: {reason}")]
    InvalidAudio { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WebfeatError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            WebfeatError::FileNotFound { .. } => "FILE_NOT_FOUND",
            WebfeatError::FileReadError { .. } => "FILE_READ_ERROR",
            WebfeatError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            WebfeatError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            WebfeatError::MissingPlaceholder { .. } => "MISSING_PLACEHOLDER",
            WebfeatError::InvalidPlaceholder { .. } => "INVALID_PLACEHOLDER",
            WebfeatError::UnknownPlaceholder { .. } => "UNKNOWN_PLACEHOLDER",
            WebfeatError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            WebfeatError::InvalidParameter { .. } => "INVALID_PARAMETER",
            WebfeatError::UnknownTransform { .. } => "UNKNOWN_TRANSFORM",
            WebfeatError::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            WebfeatError::InvalidArtifact { .. } => "INVALID_ARTIFACT",
            WebfeatError::InvalidAudio { .. } => "INVALID_AUDIO",
            WebfeatError::Io(_) => "IO_ERROR",
            WebfeatError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            WebfeatError::FileNotFound { .. } => Some("Check the file path and try again."),
            WebfeatError::MissingPlaceholder { .. } => {
                Some("Add a ${body} placeholder where the page content belongs.")
            }
            WebfeatError::InvalidPlaceholder { .. } | WebfeatError::UnknownPlaceholder { .. } => {
                Some("Write a literal dollar sign as $$ in the template.")
            }
            WebfeatError::DirectoryCreateError { .. } | WebfeatError::FileWriteError { .. } => {
                Some("Check that the output directory is writable.")
            }
            WebfeatError::UnsupportedOperator { .. } => {
                Some("The target graph format cannot express this operator.")
            }
            _ => None,
        }
    }
}
