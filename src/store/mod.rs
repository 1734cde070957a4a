//! Key-value store contract
//!
//! Settings (the enable toggle) and metrics live in an external,
//! last-write-wins key-value store. The engine only needs `get` and `set`;
//! change notification is delivered to the pipeline by whoever owns the
//! store's watch channel.
//!
//! - `MemoryStore` - in-process store with `watch` callbacks (native + tests)
//! - `LocalStore` (crate `web` module, wasm32 only) - `window.localStorage`

pub mod memory;

pub use memory::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("read of `{key}` failed: {reason}")]
    Read { key: String, reason: String },
    #[error("write of `{key}` failed: {reason}")]
    Write { key: String, reason: String },
}

/// Notification delivered after a key changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    pub key: String,
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
}

impl StorageChange {
    pub fn new(key: &str, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            key: key.to_string(),
            old_value,
            new_value,
        }
    }
}

/// Minimal JSON key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}
