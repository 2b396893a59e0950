//! Error types for local persistence

use thiserror::Error;

/// Result type for key-value store operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Errors that can occur when reading or writing the local store
#[derive(Debug, Error)]
pub enum KvError {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store content could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store file exists but does not contain a JSON object
    #[error("Invalid store file {path}: expected a JSON object")]
    InvalidStore { path: String },
}
