//! Durable key-value storage abstraction.
//!
//! The browser's `localStorage` is the production backend (see the
//! wasm module); natively and in tests a shared in-memory map stands in.
//! Methods take `&self` so a single backend can be shared by both stores;
//! implementations use interior mutability, mirroring how the DOM
//! `Storage` interface itself behaves.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Failure reported by a storage backend (unavailable, over quota, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StorageError(pub String);

/// Synchronous string-record key-value store.
///
/// Matches the DOM `Storage` surface: get, set, remove, clear.
pub trait KeyValueStore {
    /// Read the record stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous record.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the record under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every record.
    fn clear(&self) -> Result<(), StorageError>;
}

/// In-memory backend for native use and tests.
///
/// Cloning is cheap and clones share the same underlying map, so a test
/// can hold one handle for inspection while the tracker owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        // Removing an absent key is a no-op
        store.remove("k").unwrap();
    }

    #[test]
    fn test_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();

        a.set("shared", "1").unwrap();
        assert_eq!(b.get("shared").unwrap(), Some("1".to_string()));

        b.clear().unwrap();
        assert!(a.is_empty());
    }
}
