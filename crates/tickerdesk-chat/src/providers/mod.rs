//! Concrete chat provider implementations

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};
