//! CSV spreadsheet export and enumeration
//!
//! Files keep the upstream naming convention
//! `{TICKER}_{yyyy-MM-dd}_{LabelNoSpaces}.xlsx` (the content is CSV text;
//! the extension is part of the documented interchange format). All
//! metadata lives in the manifest, so a ticker containing `_` cannot break
//! enumeration.

use crate::error::{ExportError, Result};
use crate::manifest::{Manifest, ManifestEntry};
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tickerdesk_market::{Granularity, StockAggregate};
use tracing::{debug, warn};
use uuid::Uuid;

/// Fixed CSV header row
pub const CSV_HEADER: [&str; 8] = [
    "Ticker",
    "Timestamp",
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "Granularity (minutes)",
];

const MANIFEST_FILE: &str = "manifest.json";
const EXPORT_EXTENSION: &str = "xlsx";

/// Metadata record describing one exported CSV file
#[derive(Debug, Clone)]
pub struct SavedSpreadsheet {
    /// Stable identifier from the manifest
    pub id: Uuid,

    /// Absolute or store-relative path of the file
    pub path: PathBuf,

    /// Uppercase ticker
    pub ticker: String,

    /// Reference date of the export
    pub date: NaiveDate,

    /// Bar width
    pub granularity: Granularity,

    /// Number of data rows (file lines minus the header line)
    pub row_count: usize,

    /// Export timestamp
    pub created_at: DateTime<Utc>,

    /// Whether this file is included in the chat context
    pub selected: bool,
}

/// Durable store of exported spreadsheets plus their selection manifest
#[derive(Debug)]
pub struct SpreadsheetStore {
    dir: PathBuf,
    manifest: Manifest,
}

impl SpreadsheetStore {
    /// Open (or create) a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let manifest = Manifest::load(&dir.join(MANIFEST_FILE))?;
        Ok(Self { dir, manifest })
    }

    /// Export directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Export a non-empty aggregate list as one CSV file
    ///
    /// Rows are written sorted ascending by timestamp and the file is
    /// created atomically. Returns the freshly registered metadata record
    /// (new id, unselected). Re-exporting the same ticker/date/granularity
    /// overwrites the file and replaces its manifest entry.
    pub fn export(
        &mut self,
        aggregates: &[StockAggregate],
        ticker: &str,
        date: NaiveDate,
        granularity: Granularity,
    ) -> Result<SavedSpreadsheet> {
        if aggregates.is_empty() {
            return Err(ExportError::EmptyExport);
        }

        let ticker = ticker.trim().to_uppercase();
        let file_name = format!(
            "{}_{}_{}.{}",
            ticker,
            date.format("%Y-%m-%d"),
            granularity.label().replace(' ', ""),
            EXPORT_EXTENSION,
        );
        let path = self.dir.join(&file_name);

        let mut rows: Vec<&StockAggregate> = aggregates.iter().collect();
        rows.sort_by_key(|bar| bar.timestamp);

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for bar in rows {
            writer.write_record(&[
                ticker.clone(),
                bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
                granularity.minutes().to_string(),
            ])?;
        }
        let body = writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?;

        // Atomic write: no partial file is ever visible under the final name
        let tmp = path.with_extension("xlsx.tmp");
        fs::write(&tmp, &body)?;
        fs::rename(&tmp, &path)?;

        let entry = ManifestEntry {
            id: Uuid::new_v4(),
            ticker: ticker.clone(),
            date,
            granularity_minutes: granularity.minutes(),
            created_at: Utc::now(),
            selected: false,
        };
        let saved = SavedSpreadsheet {
            id: entry.id,
            path,
            ticker,
            date,
            granularity,
            row_count: aggregates.len(),
            created_at: entry.created_at,
            selected: false,
        };

        self.manifest.entries.insert(file_name, entry);
        self.save_manifest()?;

        debug!(id = %saved.id, rows = saved.row_count, path = %saved.path.display(), "Exported spreadsheet");
        Ok(saved)
    }

    /// List all exported spreadsheets, newest first
    ///
    /// Manifest entries whose file has disappeared (deleted outside the
    /// app) are skipped; their stale entries are pruned only when `delete`
    /// is called. Row counts are re-read from file content every time.
    pub fn list(&self) -> Result<Vec<SavedSpreadsheet>> {
        let mut records = Vec::new();

        for (file_name, entry) in &self.manifest.entries {
            let path = self.dir.join(file_name);
            if !path.exists() {
                warn!(file = %file_name, "Manifest entry has no backing file; skipping");
                continue;
            }

            let Ok(granularity) = Granularity::from_minutes(entry.granularity_minutes) else {
                warn!(file = %file_name, minutes = entry.granularity_minutes,
                      "Manifest entry has unsupported granularity; skipping");
                continue;
            };

            let row_count = Self::count_data_rows(&path)?;

            records.push(SavedSpreadsheet {
                id: entry.id,
                path,
                ticker: entry.ticker.clone(),
                date: entry.date,
                granularity,
                row_count,
                created_at: entry.created_at,
                selected: entry.selected,
            });
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Set or clear the "selected for chat context" flag
    ///
    /// Every toggle is an immediate synchronous manifest write.
    pub fn set_selected(&mut self, id: Uuid, selected: bool) -> Result<()> {
        let entry = self
            .manifest
            .entry_mut(id)
            .ok_or(ExportError::NotFound(id))?;
        entry.selected = selected;
        self.save_manifest()
    }

    /// Delete a spreadsheet: removes both the file and its manifest entry
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let file_name = self
            .manifest
            .file_for(id)
            .ok_or(ExportError::NotFound(id))?
            .to_string();

        let path = self.dir.join(&file_name);
        if path.exists() {
            fs::remove_file(&path)?;
        }

        self.manifest.entries.remove(&file_name);
        self.save_manifest()?;

        debug!(id = %id, file = %file_name, "Deleted spreadsheet");
        Ok(())
    }

    /// Read the raw CSV text of one spreadsheet
    pub fn read_csv(&self, id: Uuid) -> Result<String> {
        let file_name = self.manifest.file_for(id).ok_or(ExportError::NotFound(id))?;
        Ok(fs::read_to_string(self.dir.join(file_name))?)
    }

    fn save_manifest(&self) -> Result<()> {
        self.manifest.save(&self.dir.join(MANIFEST_FILE))
    }

    /// Data rows = total newline-delimited lines minus the header
    fn count_data_rows(path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)?;
        Ok(text.lines().count().saturating_sub(1))
    }
}
