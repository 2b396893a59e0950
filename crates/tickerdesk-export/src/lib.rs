//! Spreadsheet export for tickerdesk
//!
//! Serializes fetched OHLCV bars to CSV files in an export directory and
//! keeps a queryable index over everything exported so far. Metadata and
//! the "selected for chat context" flag live in a JSON manifest next to
//! the files; nothing is ever parsed back out of a filename.

pub mod error;
pub mod manifest;
pub mod spreadsheet;

pub use error::{ExportError, Result};
pub use manifest::{Manifest, ManifestEntry};
pub use spreadsheet::{SavedSpreadsheet, SpreadsheetStore, CSV_HEADER};
