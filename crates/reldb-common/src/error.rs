//! Error types for reldb.

use thiserror::Error;

/// Result type alias using RelError.
pub type Result<T> = std::result::Result<T, RelError>;

/// Errors that can occur in reldb operations.
#[derive(Debug, Error)]
pub enum RelError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Snapshot errors
    #[error("snapshot corrupted: {0}")]
    SnapshotCorrupted(String),

    // Schema errors
    #[error("invalid schema for relation {relation}: {reason}")]
    InvalidSchema { relation: String, reason: String },

    #[error("incompatible schemas: {reason}")]
    SchemaMismatch { reason: String },

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    // Tuple errors
    #[error("tuple arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("type mismatch at column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: usize,
        expected: String,
        actual: String,
    },

    // Index errors
    #[error("duplicate key")]
    DuplicateKey,

    #[error("operation on empty index")]
    EmptyIndex,

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("attributes {attributes:?} are not the primary key of {relation}")]
    NotPrimaryKey {
        attributes: Vec<String>,
        relation: String,
    },
}
