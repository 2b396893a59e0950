//! Polygon-style aggregates API client
//!
//! Two endpoints are used:
//!
//! - `/v2/aggs/ticker/{TICKER}/range/{mult}/{unit}/{fromMs}/{toMs}` for
//!   OHLCV bars
//! - `/v3/reference/tickers/{TICKER}` for shares-outstanding / market-cap
//!   reference data
//!
//! The credential travels both as the `X-API-KEY` header and as the
//! `apiKey` query parameter, matching what the upstream service accepts.

use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::models::{Granularity, StockAggregate, TickerDetails};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Market data API client
#[derive(Debug, Clone)]
pub struct PolygonClient {
    client: Client,
    config: MarketConfig,
    rate_limiter: SharedRateLimiter,
}

impl PolygonClient {
    /// Create a new client from a validated configuration
    pub fn new(config: MarketConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute)
                .unwrap_or(NonZeroU32::new(5).unwrap()),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(MarketConfig::from_env()?)
    }

    /// Current configuration
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Fetch OHLCV bars for one ticker over a half-open time range
    ///
    /// Bars are requested pre-sorted ascending and adjusted for splits.
    /// A response without a `results` array means the range simply has no
    /// bars; that yields an empty list, not an error.
    #[instrument(skip(self), fields(ticker = %ticker, granularity = %granularity.minutes()))]
    pub async fn aggregates(
        &self,
        ticker: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StockAggregate>> {
        self.rate_limiter.until_ready().await;

        let ticker = ticker.trim().to_uppercase();
        let (multiplier, unit) = granularity.range_segment();
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.config.api_base,
            ticker,
            multiplier,
            unit,
            from.timestamp_millis(),
            to.timestamp_millis(),
        );

        debug!(url = %self.redact(&url), "Requesting aggregates");

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.config.api_key)
            .query(&[
                ("adjusted", "true".to_string()),
                ("sort", "asc".to_string()),
                ("limit", self.config.result_limit.to_string()),
                ("apiKey", self.config.api_key.clone()),
            ])
            .send()
            .await?;

        debug!(status = %response.status(), "Aggregates response received");
        let envelope: AggregatesEnvelope = Self::decode(response).await?;

        let bars = envelope.results.unwrap_or_default();
        bars.into_iter()
            .map(|bar| bar.into_aggregate(&ticker, granularity))
            .collect()
    }

    /// Fetch reference details (market cap, shares outstanding) for a ticker
    #[instrument(skip(self), fields(ticker = %ticker))]
    pub async fn ticker_details(
        &self,
        ticker: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<TickerDetails> {
        self.rate_limiter.until_ready().await;

        let ticker = ticker.trim().to_uppercase();
        let url = format!("{}/v3/reference/tickers/{}", self.config.api_base, ticker);

        debug!(url = %self.redact(&url), "Requesting ticker details");

        let mut query = vec![("apiKey", self.config.api_key.clone())];
        if let Some(date) = as_of {
            query.push(("date", date.format("%Y-%m-%d").to_string()));
        }

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.config.api_key)
            .query(&query)
            .send()
            .await?;

        debug!(status = %response.status(), "Ticker details response received");
        let envelope: TickerDetailsEnvelope = Self::decode(response).await?;

        let wire = envelope.results.ok_or_else(|| {
            MarketError::UnexpectedResponse(format!("no details returned for {ticker}"))
        })?;

        Ok(TickerDetails {
            ticker: wire.ticker.unwrap_or(ticker),
            name: wire.name,
            market_cap: wire.market_cap,
            share_class_shares_outstanding: wire.share_class_shares_outstanding,
            weighted_shares_outstanding: wire.weighted_shares_outstanding,
        })
    }

    /// Classify a non-2xx status and decode a 2xx body
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => MarketError::Unauthorized(body),
                400 | 404 => MarketError::BadRequest(body),
                code => MarketError::Status { code, body },
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(body = %body, "Failed to decode response body");
            MarketError::UnexpectedResponse(format!("failed to parse response: {e}"))
        })
    }

    /// Replace the credential with a placeholder before a URL is logged
    fn redact(&self, url: &str) -> String {
        url.replace(&self.config.api_key, "[REDACTED]")
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct AggregatesEnvelope {
    results: Option<Vec<AggregateBar>>,
    #[allow(dead_code)]
    #[serde(rename = "resultsCount")]
    results_count: Option<u64>,
    #[allow(dead_code)]
    status: Option<String>,
}

/// One bar as the vendor sends it: short field names, millisecond timestamp
#[derive(Debug, Deserialize)]
struct AggregateBar {
    #[serde(rename = "t")]
    timestamp_ms: i64,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
    #[serde(rename = "vw")]
    vwap: Option<f64>,
    #[serde(rename = "n")]
    trades: Option<u64>,
}

impl AggregateBar {
    fn into_aggregate(self, ticker: &str, granularity: Granularity) -> Result<StockAggregate> {
        let timestamp = Utc
            .timestamp_millis_opt(self.timestamp_ms)
            .single()
            .ok_or_else(|| {
                MarketError::UnexpectedResponse(format!(
                    "bar timestamp out of range: {}",
                    self.timestamp_ms
                ))
            })?;

        Ok(StockAggregate {
            ticker: ticker.to_string(),
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.max(0.0) as u64,
            granularity,
            vwap: self.vwap,
            trades: self.trades,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TickerDetailsEnvelope {
    results: Option<TickerDetailsWire>,
}

#[derive(Debug, Deserialize)]
struct TickerDetailsWire {
    ticker: Option<String>,
    name: Option<String>,
    market_cap: Option<f64>,
    share_class_shares_outstanding: Option<u64>,
    weighted_shares_outstanding: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PolygonClient {
        PolygonClient::new(MarketConfig::new("secret-key")).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client();
        assert_eq!(client.config().api_key, "secret-key");
    }

    #[test]
    fn test_redaction() {
        let client = client();
        let url = "https://api.polygon.io/v2/aggs?apiKey=secret-key";
        let redacted = client.redact(url);
        assert!(!redacted.contains("secret-key"));
        assert!(redacted.contains("[REDACTED]"));
    }

    #[test]
    fn test_envelope_with_missing_results() {
        let envelope: AggregatesEnvelope =
            serde_json::from_str(r#"{"status":"OK","resultsCount":0}"#).unwrap();
        assert!(envelope.results.is_none());
    }

    #[test]
    fn test_bar_decoding_short_names() {
        let json = r#"{
            "t": 1704204000000,
            "o": 185.2, "h": 185.9, "l": 184.8, "c": 185.5,
            "v": 120345.0, "vw": 185.4, "n": 861
        }"#;
        let bar: AggregateBar = serde_json::from_str(json).unwrap();
        let aggregate = bar.into_aggregate("AAPL", Granularity::M5).unwrap();

        assert_eq!(aggregate.ticker, "AAPL");
        assert_eq!(aggregate.volume, 120345);
        assert_eq!(aggregate.vwap, Some(185.4));
        assert_eq!(aggregate.trades, Some(861));
        assert_eq!(aggregate.timestamp.timestamp_millis(), 1_704_204_000_000);
        assert!(aggregate.is_coherent());
    }

    #[test]
    fn test_bar_decoding_without_optionals() {
        let json = r#"{"t": 1704204000000, "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5, "v": 10.0}"#;
        let bar: AggregateBar = serde_json::from_str(json).unwrap();
        let aggregate = bar.into_aggregate("MSFT", Granularity::M1).unwrap();
        assert_eq!(aggregate.vwap, None);
        assert_eq!(aggregate.trades, None);
    }

    #[test]
    fn test_details_envelope_decoding() {
        let json = r#"{
            "results": {
                "ticker": "AAPL",
                "name": "Apple Inc.",
                "market_cap": 2900000000000.0,
                "share_class_shares_outstanding": 15500000000,
                "weighted_shares_outstanding": 15480000000
            },
            "status": "OK"
        }"#;
        let envelope: TickerDetailsEnvelope = serde_json::from_str(json).unwrap();
        let wire = envelope.results.unwrap();
        assert_eq!(wire.ticker.as_deref(), Some("AAPL"));
        assert_eq!(wire.share_class_shares_outstanding, Some(15_500_000_000));
    }
}
