//! Error types for fundrank-retrieve.

use std::fmt;

/// Errors that can occur during retrieval operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrieveError {
    /// Empty index (no documents indexed).
    EmptyIndex,
    /// Invalid parameter value.
    InvalidParameter(String),
    /// Dimension mismatch between query and indexed vectors.
    DimensionMismatch { query_dim: usize, index_dim: usize },
    /// Vector contains NaN or infinite components, or has zero norm.
    InvalidVector(String),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::EmptyIndex => write!(f, "Index is empty"),
            RetrieveError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            RetrieveError::DimensionMismatch {
                query_dim,
                index_dim,
            } => {
                write!(
                    f,
                    "Dimension mismatch: query has {} dimensions, index has {}",
                    query_dim, index_dim
                )
            }
            RetrieveError::InvalidVector(msg) => write!(f, "Invalid vector: {}", msg),
        }
    }
}

impl std::error::Error for RetrieveError {}

/// Errors that can occur while writing or restoring index artifacts.
#[derive(Debug)]
pub enum PersistenceError {
    /// I/O error (file operations, disk I/O)
    Io(std::io::Error),
    /// Format error (invalid magic bytes, version mismatch, corruption)
    Format {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },
    /// Checksum mismatch (data corruption detected)
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Serialization or deserialization error
    Serialization(String),
    /// Artifact file not found
    NotFound(String),
    /// Vector count does not match the id mapping size
    CountMismatch { vectors: usize, mapping: usize },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Format {
                message,
                expected,
                actual,
            } => {
                write!(f, "Format error: {}", message)?;
                if let Some(e) = expected {
                    write!(f, " (expected: {})", e)?;
                }
                if let Some(a) = actual {
                    write!(f, " (actual: {})", a)?;
                }
                Ok(())
            }
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "Checksum mismatch: expected {}, got {}", expected, actual)
            }
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::NotFound(path) => write!(f, "Artifact not found: {}", path),
            Self::CountMismatch { vectors, mapping } => {
                write!(
                    f,
                    "Vector count {} does not match mapping size {}",
                    vectors, mapping
                )
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<postcard::Error> for PersistenceError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(format!("Postcard error: {}", e))
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", e))
    }
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
