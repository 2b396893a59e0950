//! Error types for market data operations

use thiserror::Error;

/// Result type alias for market data operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Market data specific errors
#[derive(Debug, Error)]
pub enum MarketError {
    /// Ticker was empty after trimming whitespace
    #[error("Invalid ticker: {0:?}")]
    InvalidTicker(String),

    /// Requested start date lies in the future
    #[error("Invalid date: {start} is after today ({today})")]
    InvalidDate {
        start: chrono::NaiveDate,
        today: chrono::NaiveDate,
    },

    /// Requested range has start after end
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// API rejected the credential
    #[error("Unauthorized: check your market data API key ({0})")]
    Unauthorized(String),

    /// API rejected the request itself
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Any other non-2xx API status
    #[error("API error (HTTP {code}): {body}")]
    Status { code: u16, body: String },

    /// Transport-level failure (DNS, connectivity, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketError::InvalidTicker("   ".to_string());
        assert_eq!(err.to_string(), "Invalid ticker: \"   \"");

        let err = MarketError::Status {
            code: 503,
            body: "upstream unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 503): upstream unavailable");
    }
}
