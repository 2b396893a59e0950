//! Data context assembly from selected spreadsheets
//!
//! Each spreadsheet flagged "selected" contributes one labeled block with
//! its metadata and raw CSV body. A file that cannot be read contributes an
//! inline error string instead of failing the whole send.

use crate::error::Result;
use tickerdesk_export::SpreadsheetStore;
use tracing::warn;

/// Build the textual data context injected into the system framing
///
/// Returns an empty string when nothing is selected; a chat send with an
/// empty context is still valid.
pub fn build_data_context(store: &SpreadsheetStore) -> Result<String> {
    let mut context = String::new();

    for sheet in store.list()?.into_iter().filter(|s| s.selected) {
        let body = match store.read_csv(sheet.id) {
            Ok(text) => text,
            Err(e) => {
                warn!(id = %sheet.id, error = %e, "Could not read spreadsheet for chat context");
                format!("[could not read {}: {}]", sheet.path.display(), e)
            }
        };

        context.push_str(&format!(
            "### {} {} ({}, {} rows)\n{}\n\n",
            sheet.ticker,
            sheet.date.format("%Y-%m-%d"),
            sheet.granularity.label(),
            sheet.row_count,
            body.trim_end(),
        ));
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;
    use tickerdesk_market::{Granularity, StockAggregate};

    fn bars() -> Vec<StockAggregate> {
        vec![StockAggregate {
            ticker: "AAPL".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
            open: 185.0,
            high: 186.0,
            low: 184.0,
            close: 185.5,
            volume: 1000,
            granularity: Granularity::M5,
            vwap: None,
            trades: None,
        }]
    }

    #[test]
    fn test_empty_context_when_nothing_selected() {
        let dir = tempdir().unwrap();
        let mut store = SpreadsheetStore::new(dir.path()).unwrap();
        store
            .export(&bars(), "AAPL", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), Granularity::M5)
            .unwrap();

        let context = build_data_context(&store).unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn test_selected_sheet_is_inlined_with_label() {
        let dir = tempdir().unwrap();
        let mut store = SpreadsheetStore::new(dir.path()).unwrap();
        let saved = store
            .export(&bars(), "AAPL", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), Granularity::M5)
            .unwrap();
        store.set_selected(saved.id, true).unwrap();

        let context = build_data_context(&store).unwrap();
        assert!(context.contains("### AAPL 2024-01-02 (5 Minutes, 1 rows)"));
        assert!(context.contains("Ticker,Timestamp,Open,High,Low,Close,Volume,Granularity (minutes)"));
        assert!(context.contains("AAPL,2024-01-02 14:30:00,185,186,184,185.5,1000,5"));
    }
}
