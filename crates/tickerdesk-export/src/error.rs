//! Error types for spreadsheet export operations

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Export and enumeration errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Refusing to export an empty result set
    #[error("Nothing to export: the aggregate list is empty")]
    EmptyExport,

    /// No spreadsheet with the given id exists
    #[error("No spreadsheet found with id {0}")]
    NotFound(Uuid),

    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Manifest could not be serialized or deserialized
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}
