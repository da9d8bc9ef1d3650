//! # rg-kv-memory
//!
//! In-process implementation of `KeyValueStore`.
//! Serves as session-scoped storage (it dies with the process) and as a
//! durable store in tests.

use dashmap::DashMap;
use rg_core::traits::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry, like a browser ending its session.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryKvStore::new();
        assert!(store.get("k").is_none());

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
        // Removing a missing key is not an error.
        store.remove("k").unwrap();
    }

    #[test]
    fn test_clear_ends_session() {
        let store = MemoryKvStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
