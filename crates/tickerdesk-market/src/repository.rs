//! Repository abstraction over market data sources
//!
//! The use case layer talks to `MarketDataRepository`, never to a concrete
//! client. Two implementations exist: the live HTTP client, and a
//! deterministic synthetic generator for tests and offline work. Which one
//! backs the application is decided once, at construction time.

use crate::api::PolygonClient;
use crate::error::Result;
use crate::models::{Granularity, StockAggregate, TickerDetails};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of OHLCV bars and ticker reference data
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    /// Fetch bars for a ticker over a time range
    async fn fetch_aggregates(
        &self,
        ticker: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StockAggregate>>;

    /// Fetch reference details for a ticker
    async fn fetch_ticker_details(
        &self,
        ticker: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<TickerDetails>;

    /// Repository name (e.g. "polygon", "synthetic")
    fn name(&self) -> &str;
}

/// Live repository backed by the HTTP client
#[derive(Debug, Clone)]
pub struct PolygonRepository {
    client: PolygonClient,
}

impl PolygonRepository {
    /// Wrap an existing client
    pub fn new(client: PolygonClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketDataRepository for PolygonRepository {
    async fn fetch_aggregates(
        &self,
        ticker: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StockAggregate>> {
        self.client.aggregates(ticker, granularity, from, to).await
    }

    async fn fetch_ticker_details(
        &self,
        ticker: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<TickerDetails> {
        self.client.ticker_details(ticker, as_of).await
    }

    fn name(&self) -> &'static str {
        "polygon"
    }
}

/// Deterministic synthetic data source
///
/// Generates a pseudo-random walk keyed by the ticker text, so the same
/// request always produces the same bars. Useful for tests and for working
/// without a network connection or credential.
#[derive(Debug, Clone, Default)]
pub struct SyntheticRepository;

impl SyntheticRepository {
    /// Create a synthetic repository
    pub fn new() -> Self {
        Self
    }

    fn seed_for(ticker: &str) -> u64 {
        ticker
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
                (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            })
    }
}

/// Minimal linear congruential generator; quality does not matter here,
/// determinism does
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    /// Uniform-ish value in [-1.0, 1.0]
    fn signed_unit(&mut self) -> f64 {
        (self.next() % 2_000_001) as f64 / 1_000_000.0 - 1.0
    }
}

#[async_trait]
impl MarketDataRepository for SyntheticRepository {
    async fn fetch_aggregates(
        &self,
        ticker: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StockAggregate>> {
        let ticker = ticker.trim().to_uppercase();
        let seed = Self::seed_for(&ticker);
        let mut rng = Lcg(seed);

        let mut price = 20.0 + (seed % 480) as f64;
        let step = Duration::minutes(i64::from(granularity.minutes()));
        let mut bars = Vec::new();
        let mut cursor = from;

        while cursor < to {
            let open = price;
            let close = open * (1.0 + rng.signed_unit() * 0.005);
            let spread = open.max(close) * rng.signed_unit().abs() * 0.002;
            let high = open.max(close) + spread;
            let low = (open.min(close) - spread).max(0.01);
            let volume = 10_000 + rng.next() % 500_000;

            bars.push(StockAggregate {
                ticker: ticker.clone(),
                timestamp: cursor,
                open,
                high,
                low,
                close,
                volume,
                granularity,
                vwap: Some((high + low + close) / 3.0),
                trades: Some(volume / 100),
            });

            price = close;
            cursor += step;
        }

        Ok(bars)
    }

    async fn fetch_ticker_details(
        &self,
        ticker: &str,
        _as_of: Option<NaiveDate>,
    ) -> Result<TickerDetails> {
        let ticker = ticker.trim().to_uppercase();
        let seed = Self::seed_for(&ticker);
        let shares = 1_000_000_000 + seed % 9_000_000_000;

        Ok(TickerDetails {
            ticker: ticker.clone(),
            name: Some(format!("{ticker} (synthetic)")),
            market_cap: Some(shares as f64 * (20.0 + (seed % 480) as f64)),
            share_class_shares_outstanding: Some(shares),
            weighted_shares_outstanding: Some(shares),
        })
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 2, 4, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 20, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_synthetic_is_deterministic() {
        let repo = SyntheticRepository::new();
        let (from, to) = range();

        let a = repo
            .fetch_aggregates("AAPL", Granularity::M5, from, to)
            .await
            .unwrap();
        let b = repo
            .fetch_aggregates("aapl", Granularity::M5, from, to)
            .await
            .unwrap();

        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].open, b[0].open);
        assert_eq!(a.last().unwrap().close, b.last().unwrap().close);
    }

    #[tokio::test]
    async fn test_synthetic_bar_count_and_spacing() {
        let repo = SyntheticRepository::new();
        let (from, to) = range();

        let bars = repo
            .fetch_aggregates("MSFT", Granularity::M5, from, to)
            .await
            .unwrap();

        // 16 hours of 5-minute bars
        assert_eq!(bars.len(), 16 * 12);
        for pair in bars.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(5));
        }
    }

    #[tokio::test]
    async fn test_synthetic_bars_are_coherent() {
        let repo = SyntheticRepository::new();
        let (from, to) = range();

        let bars = repo
            .fetch_aggregates("TSLA", Granularity::M15, from, to)
            .await
            .unwrap();

        assert!(!bars.is_empty());
        for bar in &bars {
            assert!(bar.is_coherent(), "incoherent bar at {}", bar.timestamp);
        }
    }

    #[tokio::test]
    async fn test_synthetic_differs_per_ticker() {
        let repo = SyntheticRepository::new();
        let (from, to) = range();

        let a = repo
            .fetch_aggregates("AAPL", Granularity::M5, from, to)
            .await
            .unwrap();
        let b = repo
            .fetch_aggregates("MSFT", Granularity::M5, from, to)
            .await
            .unwrap();

        assert_ne!(a[0].open, b[0].open);
    }

    #[tokio::test]
    async fn test_synthetic_details() {
        let repo = SyntheticRepository::new();
        let details = repo.fetch_ticker_details(" nvda ", None).await.unwrap();
        assert_eq!(details.ticker, "NVDA");
        assert!(details.market_cap.unwrap() > 0.0);
    }
}
