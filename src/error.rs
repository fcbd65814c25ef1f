//! Error types for the vector store engine

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types that can occur in store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Schema conflict on table '{table}': {reason}")]
    SchemaConflict { table: String, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage not found: {table}")]
    NotFound { table: String },

    #[error("Backend call timed out during {operation}")]
    BackendTimeout { operation: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Shorthand for a backend failure with a plain message.
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
        }
    }
}
