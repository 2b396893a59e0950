//! Market data retrieval for tickerdesk
//!
//! This crate turns a (ticker, time range, granularity) request into typed
//! OHLCV records. It includes:
//!
//! - Domain models (`StockAggregate`, `Granularity`, `TickerDetails`)
//! - A live HTTP client for a Polygon-style aggregates API
//! - A repository trait with live and deterministic synthetic implementations
//! - The aggregation use case (input validation + chronological ordering)
//! - A fetch-generation guard so stale responses can be discarded

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod repository;

// Re-export main types
pub use api::PolygonClient;
pub use config::MarketConfig;
pub use error::{MarketError, Result};
pub use fetch::{AggregatesUseCase, FetchGeneration};
pub use models::{Granularity, StockAggregate, TickerDetails};
pub use repository::{MarketDataRepository, PolygonRepository, SyntheticRepository};
