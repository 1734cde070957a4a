//! MemoryStore: shared in-process key-value store
//!
//! Clones share one backing map, so a test (or a native host) can hand one
//! handle to the pipeline and keep another to inspect or watch the data.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{KeyValueStore, StorageChange, StoreError};

type Watcher = Box<dyn FnMut(&StorageChange)>;

#[derive(Default)]
struct Inner {
    values: HashMap<String, Value>,
    watchers: Vec<(String, Rc<RefCell<Watcher>>)>,
    fail_reads: bool,
    fail_writes: bool,
    writes: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryStore")
            .field("keys", &inner.values.len())
            .field("watchers", &inner.watchers.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` after every write to `key`
    pub fn watch<F>(&self, key: &str, callback: F)
    where
        F: FnMut(&StorageChange) + 'static,
    {
        let watcher: Watcher = Box::new(callback);
        self.inner
            .borrow_mut()
            .watchers
            .push((key.to_string(), Rc::new(RefCell::new(watcher))));
    }

    /// Remove a key, notifying watchers with `new_value: None`
    pub fn remove(&self, key: &str) {
        let old = self.inner.borrow_mut().values.remove(key);
        self.notify(StorageChange::new(key, old, None));
    }

    /// Make subsequent reads fail
    pub fn fail_reads(&self, fail: bool) {
        self.inner.borrow_mut().fail_reads = fail;
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Successful writes so far
    pub fn write_count(&self) -> u64 {
        self.inner.borrow().writes
    }

    fn notify(&self, change: StorageChange) {
        // Collect first so callbacks may use the store themselves
        let targets: Vec<_> = self
            .inner
            .borrow()
            .watchers
            .iter()
            .filter(|(key, _)| *key == change.key)
            .map(|(_, w)| Rc::clone(w))
            .collect();
        for watcher in targets {
            let mut callback = watcher.borrow_mut();
            (*callback)(&change);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.borrow();
        if inner.fail_reads {
            return Err(StoreError::Read {
                key: key.to_string(),
                reason: "reads disabled".into(),
            });
        }
        Ok(inner.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let old = {
            let mut inner = self.inner.borrow_mut();
            if inner.fail_writes {
                return Err(StoreError::Write {
                    key: key.to_string(),
                    reason: "writes disabled".into(),
                });
            }
            inner.writes += 1;
            inner.values.insert(key.to_string(), value.clone())
        };
        self.notify(StorageChange::new(key, old, Some(value)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn test_clones_share_data() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set("k", json!(1)).unwrap();
        assert_eq!(b.get("k").unwrap(), Some(json!(1)));
        assert_eq!(b.write_count(), 1);
    }

    #[test]
    fn test_watch_receives_old_and_new() {
        let mut store = MemoryStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.watch("k", move |change| sink.borrow_mut().push(change.clone()));

        store.set("k", json!(true)).unwrap();
        store.set("other", json!(0)).unwrap();
        store.set("k", json!(false)).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].old_value, Some(json!(true)));
        assert_eq!(seen[1].new_value, Some(json!(false)));
    }

    #[test]
    fn test_remove_notifies_with_none() {
        let mut store = MemoryStore::new();
        store.set("k", json!(1)).unwrap();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        store.watch("k", move |change| *sink.borrow_mut() = Some(change.new_value.clone()));

        store.remove("k");
        assert_eq!(*seen.borrow(), Some(None));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_failure_injection() {
        let mut store = MemoryStore::new();
        store.fail_writes(true);
        assert!(matches!(store.set("k", json!(1)), Err(StoreError::Write { .. })));
        store.fail_writes(false);
        store.set("k", json!(1)).unwrap();

        store.fail_reads(true);
        assert!(store.get("k").is_err());
    }
}
