//! Persisted index over exported spreadsheets
//!
//! Maps each exported file name to its stable id and metadata. The id is a
//! v4 UUID minted once at export time and stored here, so identity survives
//! restarts without being re-derived from the path. The "selected for chat
//! context" flag lives in the same entry and is written through on every
//! mutation.

use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Metadata for one exported spreadsheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Stable identifier, assigned at export time
    pub id: Uuid,

    /// Uppercase ticker the file contains
    pub ticker: String,

    /// Reference date of the export
    pub date: NaiveDate,

    /// Bar width in minutes
    pub granularity_minutes: u32,

    /// Export timestamp
    pub created_at: DateTime<Utc>,

    /// Whether this file is included in the chat context
    #[serde(default)]
    pub selected: bool,
}

/// The on-disk manifest: file name to entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Entries keyed by file name (not full path, so the export directory
    /// can be relocated)
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load a manifest, returning an empty one if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save the manifest atomically (temp file, then rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), entries = self.entries.len(), "Saved manifest");
        Ok(())
    }

    /// Find the file name carrying the given id
    pub fn file_for(&self, id: Uuid) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(name, _)| name.as_str())
    }

    /// Mutable access to the entry carrying the given id
    pub fn entry_mut(&mut self, id: Uuid) -> Option<&mut ManifestEntry> {
        self.entries.values_mut().find(|entry| entry.id == id)
    }
}
