//! Aggregation use case: validation and chronological ordering wrapped
//! around a market data repository

use crate::error::{MarketError, Result};
use crate::models::{Granularity, StockAggregate, TickerDetails};
use crate::repository::MarketDataRepository;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Use case for fetching OHLCV bars
///
/// Owns the validation rules the repository must never be reached through:
/// a blank ticker, a future start date, or an inverted range all fail here
/// without issuing any network call.
pub struct AggregatesUseCase {
    repository: Arc<dyn MarketDataRepository>,
}

impl AggregatesUseCase {
    /// Create a use case over the given repository
    pub fn new(repository: Arc<dyn MarketDataRepository>) -> Self {
        Self { repository }
    }

    /// Name of the backing repository
    pub fn source(&self) -> &str {
        self.repository.name()
    }

    /// Fetch bars for a ticker between two calendar dates (inclusive)
    ///
    /// Dates are interpreted as UTC days: the range spans midnight at the
    /// start of `start` to midnight after the end of `end`. Results are
    /// re-sorted ascending by timestamp regardless of upstream ordering.
    pub async fn fetch_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<StockAggregate>> {
        let ticker = Self::validate_ticker(ticker)?;
        Self::validate_dates(start, end)?;

        let from = start.and_time(NaiveTime::MIN).and_utc();
        let to = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc();

        self.fetch_instants(&ticker, granularity, from, to).await
    }

    /// Fetch bars for a ticker between two instants
    pub async fn fetch_instants(
        &self,
        ticker: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StockAggregate>> {
        let ticker = Self::validate_ticker(ticker)?;
        Self::validate_dates(from.date_naive(), to.date_naive())?;

        let mut bars = self
            .repository
            .fetch_aggregates(&ticker, granularity, from, to)
            .await?;

        // Upstream promises ascending order; do not trust it
        bars.sort_by_key(|bar| bar.timestamp);

        debug!(count = bars.len(), source = self.repository.name(), "Fetched aggregates");
        Ok(bars)
    }

    /// Fetch reference details for a ticker
    pub async fn ticker_details(
        &self,
        ticker: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<TickerDetails> {
        let ticker = Self::validate_ticker(ticker)?;
        self.repository.fetch_ticker_details(&ticker, as_of).await
    }

    fn validate_ticker(ticker: &str) -> Result<String> {
        let trimmed = ticker.trim();
        if trimmed.is_empty() {
            return Err(MarketError::InvalidTicker(ticker.to_string()));
        }
        Ok(trimmed.to_uppercase())
    }

    /// Business rule: a start date after today's local start-of-day is
    /// rejected before any request goes out
    fn validate_dates(start: NaiveDate, end: NaiveDate) -> Result<()> {
        let today = Local::now().date_naive();
        if start > today {
            return Err(MarketError::InvalidDate { start, today });
        }
        if start > end {
            return Err(MarketError::InvalidRange { start, end });
        }
        Ok(())
    }
}

/// Guard against overlapping fetches clobbering each other
///
/// Each fetch begins by taking a new generation token; when its response
/// arrives, `accept` succeeds only if no newer fetch has started since.
/// The in-flight request itself is not cancelled, its result is simply
/// discarded.
#[derive(Debug, Default)]
pub struct FetchGeneration {
    current: AtomicU64,
}

impl FetchGeneration {
    /// Create a fresh guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch, superseding any earlier one
    pub fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether the given token still identifies the most recent fetch
    pub fn is_current(&self, token: u64) -> bool {
        self.current.load(Ordering::SeqCst) == token
    }

    /// Accept a completed fetch; returns false if it has been superseded
    /// and its result should be dropped
    pub fn accept(&self, token: u64) -> bool {
        let current = self.is_current(token);
        if !current {
            debug!(token, "Discarding stale fetch result");
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SyntheticRepository;
    use chrono::Datelike;

    fn use_case() -> AggregatesUseCase {
        AggregatesUseCase::new(Arc::new(SyntheticRepository::new()))
    }

    #[tokio::test]
    async fn test_rejects_blank_ticker() {
        let uc = use_case();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let result = uc.fetch_range("   ", start, start, Granularity::M5).await;
        assert!(matches!(result, Err(MarketError::InvalidTicker(_))));
    }

    #[tokio::test]
    async fn test_rejects_future_start_date() {
        let uc = use_case();
        let tomorrow = Local::now().date_naive().succ_opt().unwrap();

        let result = uc
            .fetch_range("AAPL", tomorrow, tomorrow, Granularity::M5)
            .await;
        assert!(matches!(result, Err(MarketError::InvalidDate { .. })));
    }

    #[tokio::test]
    async fn test_rejects_inverted_range() {
        let uc = use_case();
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let result = uc.fetch_range("AAPL", start, end, Granularity::M5).await;
        assert!(matches!(result, Err(MarketError::InvalidRange { .. })));
    }

    #[tokio::test]
    async fn test_results_sorted_ascending() {
        let uc = use_case();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let bars = uc
            .fetch_range("AAPL", start, start, Granularity::M15)
            .await
            .unwrap();

        assert!(!bars.is_empty());
        assert!(bars.windows(2).all(|p| p[0].timestamp <= p[1].timestamp));
        assert!(bars.iter().all(|b| b.timestamp.date_naive().day() == 2));
    }

    #[tokio::test]
    async fn test_ticker_is_normalized() {
        let uc = use_case();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let bars = uc
            .fetch_range(" aapl ", start, start, Granularity::H1)
            .await
            .unwrap();
        assert!(bars.iter().all(|b| b.ticker == "AAPL"));
    }

    #[test]
    fn test_generation_guard_discards_stale_fetch() {
        let guard = FetchGeneration::new();

        let first = guard.begin();
        let second = guard.begin();

        // The older fetch completes last; its result must be dropped
        assert!(guard.accept(second));
        assert!(!guard.accept(first));
    }

    #[test]
    fn test_generation_tokens_increase() {
        let guard = FetchGeneration::new();
        let a = guard.begin();
        let b = guard.begin();
        assert!(b > a);
        assert!(guard.is_current(b));
        assert!(!guard.is_current(a));
    }
}
