//! Shared utilities for tickerdesk
//!
//! This crate provides the pieces every other tickerdesk crate leans on:
//!
//! - Tracing/logging initialization
//! - A small JSON-file key-value store used for API credentials and
//!   per-conversation chat history

pub mod error;
pub mod kv;
pub mod logging;

pub use error::{KvError, Result};
pub use kv::{keys, KvStore};
pub use logging::init_tracing;
