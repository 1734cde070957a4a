//! LocalStore: `window.localStorage` holding JSON-encoded values

use serde_json::Value;
use web_sys::Storage;

use crate::store::{KeyValueStore, StoreError};

use super::describe;

pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    pub fn from_window() -> Result<Self, StoreError> {
        let window = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(describe(&e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".into()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw = self.storage.get_item(key).map_err(|e| StoreError::Read {
            key: key.to_string(),
            reason: describe(&e),
        })?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.storage
            .set_item(key, &value.to_string())
            .map_err(|e| StoreError::Write {
                key: key.to_string(),
                reason: describe(&e),
            })
    }
}
