//! HTTP clients for market data vendors

pub mod polygon;

pub use polygon::PolygonClient;
