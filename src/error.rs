//! Error types for UCP schema generation.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid annotation found while validating a source schema.
///
/// `path` locates the offending key with dots for object keys and
/// brackets for array indices (e.g. `properties.items[0].ucp_request`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("{path}: unknown annotation '{key}'")]
    UnknownAnnotation { path: String, key: String },

    #[error("{path}: unknown operation '{operation}'")]
    UnknownOperation { path: String, operation: String },

    #[error("{path}: invalid value '{value}'")]
    InvalidValue { path: String, value: String },

    #[error("{path}: must be string or object, got {actual}")]
    InvalidRequestType { path: String, actual: String },

    #[error("{path}: must be boolean, got {actual}")]
    InvalidSharedRequest { path: String, actual: String },
}

impl AnnotationError {
    /// Location of the offending key within its document.
    pub fn path(&self) -> &str {
        match self {
            AnnotationError::UnknownAnnotation { path, .. }
            | AnnotationError::UnknownOperation { path, .. }
            | AnnotationError::InvalidValue { path, .. }
            | AnnotationError::InvalidRequestType { path, .. }
            | AnnotationError::InvalidSharedRequest { path, .. } => path,
        }
    }
}

/// Errors collected during a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    // IO errors (exit code 3)
    #[error("source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse and schema errors (exit code 2)
    #[error("output directory {output} overlaps source directory {source_dir}")]
    OverlappingOutput { output: PathBuf, source_dir: PathBuf },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize {path}: {source}")]
    SerializeError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file}: {error}")]
    Annotation {
        file: PathBuf,
        error: AnnotationError,
    },

    #[error("invalid method descriptor {path}: {message}")]
    InvalidDescriptor { path: PathBuf, message: String },
}

impl GenerateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> u8 {
        match self {
            GenerateError::SourceNotFound { .. }
            | GenerateError::ReadError { .. }
            | GenerateError::WriteError { .. } => 3,
            _ => 2,
        }
    }
}
