//! File-backed content store
//!
//! Stores blobs under the base directory, organized in subdirectories by the
//! first 2 hex chars of the blake3 hash. A file on disk is a pinned object;
//! there is no separate pin ledger.

use super::{ContentHash, ContentStore, StoreError, StoreResult};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// File-backed content store
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a file store at the specified path
    pub fn new<P: AsRef<Path>>(base_path: P) -> StoreResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Convert hash to file path (organized as base/XX/YYYYYYYY...)
    fn hash_to_path(&self, hash: &ContentHash) -> Option<PathBuf> {
        let hex = hash.as_str();
        if hex.len() < 3 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let (prefix, suffix) = hex.split_at(2);
        Some(self.base_path.join(prefix).join(suffix))
    }
}

impl ContentStore for FileStore {
    fn put(&self, data: &[u8]) -> StoreResult<ContentHash> {
        let hash = ContentHash::new(blake3::hash(data).to_hex().to_string());

        let path = self
            .hash_to_path(&hash)
            .ok_or_else(|| StoreError::Backend(format!("unrepresentable hash: {}", hash)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Only write if doesn't exist (content-addressable = immutable)
        if !path.exists() {
            let mut file = File::create(&path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        Ok(hash)
    }

    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let path = self
            .hash_to_path(hash)
            .ok_or_else(|| StoreError::NotFound(hash.clone()))?;
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(hash.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn list_pins(&self) -> StoreResult<Vec<ContentHash>> {
        let mut pins = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let prefix = entry.file_name().to_string_lossy().to_string();

            for blob in fs::read_dir(entry.path())? {
                let blob = blob?;
                let suffix = blob.file_name().to_string_lossy().to_string();
                pins.push(ContentHash::new(format!("{}{}", prefix, suffix)));
            }
        }

        Ok(pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        let data = b"hello world";
        let hash = store.put(data).unwrap();

        let read_data = store.get(&hash).unwrap();
        assert_eq!(read_data, data);
    }

    #[test]
    fn test_idempotent_put() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        let data = b"duplicate test";
        let hash1 = store.put(data).unwrap();
        let hash2 = store.put(data).unwrap();

        // Same data = same hash, one pin
        assert_eq!(hash1, hash2);
        assert_eq!(store.list_pins().unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        let fake = ContentHash::new("ab".repeat(32));
        assert!(matches!(store.get(&fake), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_pins() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        let h1 = store.put(b"one").unwrap();
        let h2 = store.put(b"two").unwrap();

        let mut pins = store.list_pins().unwrap();
        pins.sort();
        let mut expected = vec![h1, h2];
        expected.sort();
        assert_eq!(pins, expected);
    }

    #[test]
    fn test_empty_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        let hash = store.put(b"").unwrap();
        assert_eq!(store.get(&hash).unwrap(), Vec::<u8>::new());
    }
}
