//! Metadata index rebuilt by scanning the store
//!
//! There is no separate index store: the artifact/version/manifest mapping
//! is reconstructed on demand by enumerating every pinned object and
//! filtering for manifest-shaped JSON. Nothing is cached - every query
//! repeats the full scan, trading read latency for zero additional storage.
//! Cost is O(total pins), not O(manifests of the queried model).

use crate::manifest::{decode_manifest, Manifest};
use crate::store::{ContentHash, ContentStore, StoreError, StoreResult};
use crate::version::Version;
use std::collections::HashMap;

/// A manifest together with the pin it was read from
#[derive(Debug, Clone)]
pub struct PinnedManifest {
    pub hash: ContentHash,
    pub manifest: Manifest,
}

/// Scan-based view over the manifests in a content store
pub struct MetadataIndex<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> MetadataIndex<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Enumerate every pin and decode the manifest-shaped ones.
    ///
    /// Objects that fail to decode (raw file blobs, unrelated JSON, objects
    /// missing required fields) are silently skipped - they are assumed to
    /// be unrelated store content, not failures. Pins that vanish mid-scan
    /// are skipped too; the scan is not an atomic snapshot and no
    /// cross-object consistency is assumed.
    pub fn scan(&self) -> StoreResult<Vec<PinnedManifest>> {
        let pins = self.store.list_pins()?;
        let mut manifests = Vec::new();

        for hash in pins {
            let bytes = match self.store.get(&hash) {
                Ok(bytes) => bytes,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            match decode_manifest(&bytes) {
                Ok(manifest) => manifests.push(PinnedManifest { hash, manifest }),
                Err(e) => {
                    log::debug!("skipping non-manifest pin {}: {}", hash, e);
                }
            }
        }

        Ok(manifests)
    }

    /// All versions observed for a model, sorted.
    ///
    /// Duplicates are possible (metadata updates leave the superseded
    /// manifest pinned) and are reported as-is.
    pub fn versions_of(&self, model_id: &str) -> StoreResult<Vec<Version>> {
        let mut versions: Vec<Version> = self
            .scan()?
            .into_iter()
            .filter(|p| p.manifest.model_id == model_id)
            .map(|p| p.manifest.version)
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// The manifest with the maximum version for a model, if any.
    ///
    /// When the same version appears twice (racing writers in another
    /// process), the first one in scan order wins - an arbitrary, not a
    /// deterministic, tie-break.
    pub fn latest_of(&self, model_id: &str) -> StoreResult<Option<PinnedManifest>> {
        let mut latest: Option<PinnedManifest> = None;

        for pinned in self.scan()? {
            if pinned.manifest.model_id != model_id {
                continue;
            }
            match &latest {
                Some(best) if pinned.manifest.version <= best.manifest.version => {}
                _ => latest = Some(pinned),
            }
        }

        Ok(latest)
    }

    /// Locate the manifest for an exact (model, version) pair.
    pub fn find(&self, model_id: &str, version: Version) -> StoreResult<Option<PinnedManifest>> {
        Ok(self
            .scan()?
            .into_iter()
            .find(|p| p.manifest.model_id == model_id && p.manifest.version == version))
    }

    /// Every model at its maximum version, sorted by model id.
    pub fn all_latest(&self) -> StoreResult<Vec<PinnedManifest>> {
        let mut by_model: HashMap<String, PinnedManifest> = HashMap::new();

        for pinned in self.scan()? {
            match by_model.get(&pinned.manifest.model_id) {
                Some(best) if pinned.manifest.version <= best.manifest.version => {}
                _ => {
                    by_model.insert(pinned.manifest.model_id.clone(), pinned);
                }
            }
        }

        let mut latest: Vec<PinnedManifest> = by_model.into_values().collect();
        latest.sort_by(|a, b| a.manifest.model_id.cmp(&b.manifest.model_id));
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn pin_manifest(store: &MemoryStore, model_id: &str, version: Version) -> ContentHash {
        let manifest = Manifest {
            model_id: model_id.to_string(),
            version,
            created_at: Utc::now(),
            release_notes: None,
            total_size: 0,
            files: BTreeMap::new(),
        };
        store.put(&serde_json::to_vec(&manifest).unwrap()).unwrap()
    }

    #[test]
    fn test_scan_skips_junk() {
        let store = MemoryStore::new();
        store.put(b"\x00\x01raw binary blob").unwrap();
        store.put(b"{\"unrelated\": true}").unwrap();
        store.put(b"[]").unwrap();
        pin_manifest(&store, "a", Version::new(1, 0));

        let index = MetadataIndex::new(&store);
        let manifests = index.scan().unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].manifest.model_id, "a");
    }

    #[test]
    fn test_scan_accepts_legacy_shape() {
        let store = MemoryStore::new();
        store
            .put(br#"{"ipfs_uuid": "old", "version": "3.01", "created_at": "2024-01-01T00:00:00Z"}"#)
            .unwrap();

        let index = MetadataIndex::new(&store);
        let versions = index.versions_of("old").unwrap();
        assert_eq!(versions, vec![Version::new(3, 1)]);
    }

    #[test]
    fn test_versions_of_sorted() {
        let store = MemoryStore::new();
        pin_manifest(&store, "a", Version::new(2, 0));
        pin_manifest(&store, "a", Version::new(1, 5));
        pin_manifest(&store, "a", Version::new(1, 99));
        pin_manifest(&store, "b", Version::new(9, 9));

        let index = MetadataIndex::new(&store);
        let versions = index.versions_of("a").unwrap();
        assert_eq!(
            versions,
            vec![Version::new(1, 5), Version::new(1, 99), Version::new(2, 0)]
        );
    }

    #[test]
    fn test_versions_of_unknown_model_is_empty() {
        let store = MemoryStore::new();
        let index = MetadataIndex::new(&store);
        assert!(index.versions_of("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_latest_of() {
        let store = MemoryStore::new();
        pin_manifest(&store, "a", Version::new(1, 99));
        pin_manifest(&store, "a", Version::new(2, 0));
        pin_manifest(&store, "b", Version::new(5, 0));

        let index = MetadataIndex::new(&store);
        let latest = index.latest_of("a").unwrap().unwrap();
        assert_eq!(latest.manifest.version, Version::new(2, 0));

        assert!(index.latest_of("missing").unwrap().is_none());
    }

    #[test]
    fn test_find_exact_version() {
        let store = MemoryStore::new();
        let hash = pin_manifest(&store, "a", Version::new(1, 2));
        pin_manifest(&store, "a", Version::new(1, 3));

        let index = MetadataIndex::new(&store);
        let found = index.find("a", Version::new(1, 2)).unwrap().unwrap();
        assert_eq!(found.hash, hash);
        assert!(index.find("a", Version::new(9, 99)).unwrap().is_none());
    }

    #[test]
    fn test_all_latest_groups_by_model() {
        let store = MemoryStore::new();
        pin_manifest(&store, "a", Version::new(1, 0));
        pin_manifest(&store, "a", Version::new(1, 1));
        pin_manifest(&store, "b", Version::new(2, 0));
        store.put(b"junk that is not a manifest").unwrap();

        let index = MetadataIndex::new(&store);
        let latest = index.all_latest().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].manifest.model_id, "a");
        assert_eq!(latest[0].manifest.version, Version::new(1, 1));
        assert_eq!(latest[1].manifest.model_id, "b");
    }
}
