//! JSON-file key-value store
//!
//! Backs the credential store and per-conversation chat history. The whole
//! store is one JSON object on disk; every mutation writes the file back
//! through a temp-file-plus-rename so a crash never leaves a half-written
//! store behind.

use crate::error::{KvError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Well-known store keys
pub mod keys {
    /// API key for the market data vendor
    pub const MARKET_API_KEY: &str = "polygon_api_key";

    /// API key for the chat completion vendor
    pub const CHAT_API_KEY: &str = "gemini_api_key";

    /// Store key holding the message history of one named conversation
    pub fn conversation(name: &str) -> String {
        format!("chat.history.{name}")
    }
}

/// A JSON-object-backed key-value store
///
/// Constructed once at startup and passed by reference to whatever needs
/// credentials or conversation state. There is deliberately no ambient
/// global instance.
#[derive(Debug)]
pub struct KvStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl KvStore {
    /// Open a store at the given path, creating an empty one if the file
    /// does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => {
                    return Err(KvError::InvalidStore {
                        path: path.display().to_string(),
                    });
                }
            }
        } else {
            Map::new()
        };

        Ok(Self { path, entries })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Set a string value and persist immediately
    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.entries
            .insert(key.to_string(), Value::String(value.into()));
        self.persist()
    }

    /// Get a typed value stored as JSON
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Store a typed value as JSON and persist immediately
    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.entries
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.persist()
    }

    /// Remove a key and persist immediately
    ///
    /// Removing an absent key is not an error.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Write the store back atomically (temp file, then rename)
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let text = serde_json::to_string_pretty(&Value::Object(self.entries.clone()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "Persisted key-value store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path().join("settings.json")).unwrap();
        assert!(store.get_string("anything").is_none());
    }

    #[test]
    fn test_string_round_trip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let mut store = KvStore::open(&path).unwrap();
            store.set_string(keys::MARKET_API_KEY, "abc123").unwrap();
        }

        let store = KvStore::open(&path).unwrap();
        assert_eq!(
            store.get_string(keys::MARKET_API_KEY),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = KvStore::open(dir.path().join("settings.json")).unwrap();

        let value = Sample {
            name: "AAPL".to_string(),
            count: 3,
        };
        store.set_json("sample", &value).unwrap();

        let loaded: Option<Sample> = store.get_json("sample").unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = KvStore::open(&path).unwrap();
        store.set_string("key", "value").unwrap();
        store.remove("key").unwrap();
        assert!(!store.contains("key"));

        // Removing again is a no-op
        store.remove("key").unwrap();

        let reopened = KvStore::open(&path).unwrap();
        assert!(reopened.get_string("key").is_none());
    }

    #[test]
    fn test_invalid_store_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let result = KvStore::open(&path);
        assert!(matches!(result, Err(KvError::InvalidStore { .. })));
    }

    #[test]
    fn test_conversation_key() {
        assert_eq!(keys::conversation("default"), "chat.history.default");
    }
}
