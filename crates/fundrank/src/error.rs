//! Error types for the fundrank engine.

use fundrank_retrieve::{PersistenceError, RetrieveError};
use std::fmt;

/// Errors raised while building an index generation.
///
/// All build errors are fatal for the build in progress; the previously
/// active generation stays untouched.
#[derive(Debug)]
pub enum BuildError {
    /// A corpus row could not be parsed. Carries the 1-based line number.
    MalformedRow { line: usize, message: String },
    /// The same fund id appeared twice in the corpus.
    DuplicateFundId(String),
    /// The embedding provider returned a vector of the wrong dimension.
    DimensionMismatch { expected: usize, actual: usize },
    /// Stored artifacts disagree with the manifest or the live corpus.
    ManifestMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
    /// The embedding provider failed.
    Embedding(EmbedError),
    /// Index-level failure (invalid vectors, bad parameters).
    Retrieve(RetrieveError),
    /// Artifact I/O or format failure.
    Persistence(PersistenceError),
    /// Corpus input could not be read.
    Io(std::io::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRow { line, message } => {
                write!(f, "Malformed row at line {}: {}", line, message)
            }
            Self::DuplicateFundId(id) => write!(f, "Duplicate fund id: {}", id),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Embedding dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            Self::ManifestMismatch {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Manifest mismatch on {}: expected {}, got {}",
                    field, expected, actual
                )
            }
            Self::Embedding(e) => write!(f, "Embedding failed during build: {}", e),
            Self::Retrieve(e) => write!(f, "Index build failed: {}", e),
            Self::Persistence(e) => write!(f, "Artifact persistence failed: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Embedding(e) => Some(e),
            Self::Retrieve(e) => Some(e),
            Self::Persistence(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EmbedError> for BuildError {
    fn from(e: EmbedError) -> Self {
        Self::Embedding(e)
    }
}

impl From<RetrieveError> for BuildError {
    fn from(e: RetrieveError) -> Self {
        Self::Retrieve(e)
    }
}

impl From<PersistenceError> for BuildError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

impl From<std::io::Error> for BuildError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors surfaced to search callers.
///
/// Per-request errors never mutate shared state; a failed request leaves
/// the active generation exactly as it found it.
#[derive(Debug)]
pub enum SearchError {
    /// Requested k outside [1, 100].
    InvalidK(usize),
    /// The request deadline elapsed before results were ready.
    DeadlineExceeded,
    /// The embedding provider failed and the caller did not request
    /// lexical-only search.
    Embedding(EmbedError),
    /// Index-level failure.
    Retrieve(RetrieveError),
    /// Engine configuration was rejected.
    InvalidConfig(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidK(k) => write!(f, "Invalid k {}: must be in [1, 100]", k),
            Self::DeadlineExceeded => write!(f, "Request deadline exceeded"),
            Self::Embedding(e) => write!(f, "Embedding failed: {}", e),
            Self::Retrieve(e) => write!(f, "Retrieval failed: {}", e),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Embedding(e) => Some(e),
            Self::Retrieve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EmbedError> for SearchError {
    fn from(e: EmbedError) -> Self {
        Self::Embedding(e)
    }
}

impl From<RetrieveError> for SearchError {
    fn from(e: RetrieveError) -> Self {
        Self::Retrieve(e)
    }
}

/// Failure reported by an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedError {
    pub message: String,
}

impl EmbedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EmbedError {}
