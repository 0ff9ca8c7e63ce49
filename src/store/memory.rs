//! In-memory content store
//!
//! Backs the `memory` config backend and most of the test suite. Contents
//! are lost on process exit.

use super::{ContentHash, ContentStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory content store
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<ContentHash, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryStore {
    fn put(&self, data: &[u8]) -> StoreResult<ContentHash> {
        let hash = ContentHash::new(blake3::hash(data).to_hex().to_string());
        self.blobs
            .lock()
            .unwrap()
            .entry(hash.clone())
            .or_insert_with(|| data.to_vec());
        Ok(hash)
    }

    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.clone()))
    }

    fn list_pins(&self) -> StoreResult<Vec<ContentHash>> {
        Ok(self.blobs.lock().unwrap().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = MemoryStore::new();
        let hash = store.put(b"payload").unwrap();
        assert_eq!(store.get(&hash).unwrap(), b"payload");
    }

    #[test]
    fn test_get_missing() {
        let store = MemoryStore::new();
        let fake = ContentHash::new("deadbeef");
        assert!(matches!(store.get(&fake), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_pins_sees_everything() {
        let store = MemoryStore::new();
        store.put(b"one").unwrap();
        store.put(b"two").unwrap();
        store.put(b"two").unwrap();
        assert_eq!(store.list_pins().unwrap().len(), 2);
    }
}
