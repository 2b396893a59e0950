//! Configuration for market data operations

use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.polygon.io";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RESULT_LIMIT: u32 = 50_000;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 5;

/// Configuration for the market data client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Vendor API key
    pub api_key: String,

    /// Base URL for the aggregates API
    pub api_base: String,

    /// Request timeout
    pub request_timeout: Duration,

    /// Upper result-count limit sent with every aggregates request
    pub result_limit: u32,

    /// Maximum requests per minute (free tier default: 5)
    pub rate_limit_per_minute: u32,
}

impl MarketConfig {
    /// Create a configuration with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            result_limit: DEFAULT_RESULT_LIMIT,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }

    /// Create configuration from the `POLYGON_API_KEY` environment variable
    ///
    /// Optionally reads the base URL from `POLYGON_API_BASE` if set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("POLYGON_API_KEY").map_err(|_| {
            MarketError::Config("POLYGON_API_KEY environment variable not set".to_string())
        })?;

        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("POLYGON_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    /// Set a custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the per-request result limit
    pub fn with_result_limit(mut self, limit: u32) -> Self {
        self.result_limit = limit;
        self
    }

    /// Set the rate limit in requests per minute
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(MarketError::Config("API key must not be empty".to_string()));
        }

        if self.result_limit == 0 {
            return Err(MarketError::Config(
                "result_limit must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_per_minute == 0 {
            return Err(MarketError::Config(
                "rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MarketConfig::new("test_key");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.result_limit, 50_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = MarketConfig::new("test_key")
            .with_api_base("http://localhost:8080")
            .with_timeout(Duration::from_secs(5))
            .with_result_limit(100)
            .with_rate_limit(60);

        assert_eq!(config.api_base, "http://localhost:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.result_limit, 100);
        assert_eq!(config.rate_limit_per_minute, 60);
    }

    #[test]
    fn test_validation_rejects_blank_key() {
        let config = MarketConfig::new("   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_limit() {
        let config = MarketConfig::new("key").with_result_limit(0);
        assert!(config.validate().is_err());
    }
}
