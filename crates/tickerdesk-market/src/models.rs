//! Domain models for market data

use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported bar widths
///
/// A closed enumeration: the upstream API accepts arbitrary multipliers but
/// the product only ever requests these five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// 1-minute bars
    M1,
    /// 5-minute bars
    M5,
    /// 15-minute bars
    M15,
    /// 30-minute bars
    M30,
    /// 60-minute bars
    H1,
}

impl Default for Granularity {
    fn default() -> Self {
        Self::M5
    }
}

impl Granularity {
    /// All granularities, narrowest first
    pub const ALL: [Granularity; 5] = [
        Granularity::M1,
        Granularity::M5,
        Granularity::M15,
        Granularity::M30,
        Granularity::H1,
    ];

    /// Bar width in minutes
    pub fn minutes(&self) -> u32 {
        match self {
            Self::M1 => 1,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::M30 => 30,
            Self::H1 => 60,
        }
    }

    /// Human-readable display name
    pub fn label(&self) -> &'static str {
        match self {
            Self::M1 => "1 Minute",
            Self::M5 => "5 Minutes",
            Self::M15 => "15 Minutes",
            Self::M30 => "30 Minutes",
            Self::H1 => "1 Hour",
        }
    }

    /// The (multiplier, timespan-unit) pair used in the aggregates URL path
    ///
    /// Widths of 60 minutes and above map onto the "hour" unit.
    pub fn range_segment(&self) -> (u32, &'static str) {
        let minutes = self.minutes();
        if minutes >= 60 {
            (minutes / 60, "hour")
        } else {
            (minutes, "minute")
        }
    }

    /// Look up a granularity by its width in minutes
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.minutes() == minutes)
            .ok_or_else(|| {
                MarketError::Config(format!(
                    "unsupported granularity: {minutes} minutes (supported: 1, 5, 15, 30, 60)"
                ))
            })
    }

    /// Look up a granularity by its display label
    pub fn from_label(label: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| MarketError::Config(format!("unknown granularity label: {label:?}")))
    }
}

/// One OHLCV bar
///
/// Created by the market data client from API JSON and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAggregate {
    /// Uppercase-normalized ticker symbol
    pub ticker: String,

    /// Bar start time
    pub timestamp: DateTime<Utc>,

    /// Opening price
    pub open: f64,

    /// Highest price
    pub high: f64,

    /// Lowest price
    pub low: f64,

    /// Closing price
    pub close: f64,

    /// Trading volume
    pub volume: u64,

    /// Bar width
    pub granularity: Granularity,

    /// Volume-weighted average price, when the vendor supplies it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,

    /// Number of trades in the window, when the vendor supplies it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trades: Option<u64>,
}

impl StockAggregate {
    /// Deterministic identity: unique per bar start second, not across
    /// re-fetches with sub-second timestamp differences
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}",
            self.ticker,
            self.timestamp.timestamp(),
            self.granularity.minutes()
        )
    }

    /// Whether the bar satisfies low <= {open, close} <= high
    pub fn is_coherent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }
}

/// Reference data for one ticker (shares outstanding, market cap)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerDetails {
    /// Ticker symbol
    pub ticker: String,

    /// Company name
    pub name: Option<String>,

    /// Market capitalization in the listing currency
    pub market_cap: Option<f64>,

    /// Shares outstanding for this share class
    pub share_class_shares_outstanding: Option<u64>,

    /// Weighted shares outstanding
    pub weighted_shares_outstanding: Option<u64>,
}
