//! Model repository façade
//!
//! Orchestrates the version allocator, manifest builder, and metadata index
//! to implement upload, download, list, latest-version, and metadata-patch
//! operations against a content store. The repository is a thin
//! orchestrator: it performs no retries and no recovery, and holds no
//! in-memory index - every read is a fresh scan.
//!
//! Writes to one model are serialized through a per-model mutex, so
//! sequential version allocation holds within a process. Writers in other
//! processes can still race; the store offers no compare-and-swap.

use crate::index::{MetadataIndex, PinnedManifest};
use crate::manifest::{build_manifest, ManifestError};
use crate::store::{ContentHash, ContentStore, StoreError};
use crate::version::{next_version, Version};
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no manifest for model {model_id} version {version}")]
    VersionNotFound { model_id: String, version: Version },

    #[error("no versions available for model {0}")]
    NoVersionsAvailable(String),

    #[error("invalid manifest {hash}: {reason}")]
    InvalidManifest { hash: ContentHash, reason: String },

    #[error("blob {hash} for file {filename} unavailable: {source}")]
    BlobUnavailable {
        filename: String,
        hash: ContentHash,
        source: StoreError,
    },

    #[error("file {filename} not in manifest for model {model_id} version {version}")]
    FileNotFound {
        model_id: String,
        version: Version,
        filename: String,
    },

    #[error("manifest encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub manifest_hash: ContentHash,
    pub version: Version,
}

/// Parameters for an upload beyond the files themselves
#[derive(Debug, Default)]
pub struct UploadOptions {
    /// Carry-forward map: prior filename -> filename in the new version
    pub carry_forward: BTreeMap<String, String>,
    pub release_notes: Option<String>,
    pub force_major_bump: bool,
}

/// The repository façade. Construct once at startup and share by handle;
/// there is no ambient global instance.
pub struct Repository {
    store: Arc<dyn ContentStore>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Repository {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    fn index(&self) -> MetadataIndex<'_> {
        MetadataIndex::new(self.store.as_ref())
    }

    fn model_lock(&self, model_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap();
        locks.entry(model_id.to_string()).or_default().clone()
    }

    /// Upload a new version of a model.
    ///
    /// Allocates the next version from the scanned history, assembles the
    /// manifest (writing new file blobs to the store), and pins the
    /// serialized manifest. Pinning the manifest blob *is* the index write;
    /// there is no separate registration step.
    pub fn upload(
        &self,
        model_id: &str,
        new_files: Vec<(String, Box<dyn Read + Send>)>,
        options: UploadOptions,
    ) -> Result<UploadOutcome, RepositoryError> {
        let lock = self.model_lock(model_id);
        let _guard = lock.lock().unwrap();

        let index = self.index();
        let prior = index.latest_of(model_id)?;
        let history = index.versions_of(model_id)?;
        let version = next_version(&history, options.force_major_bump);

        let manifest = build_manifest(
            self.store.as_ref(),
            model_id,
            prior.as_ref().map(|p| &p.manifest),
            new_files,
            &options.carry_forward,
            options.release_notes,
            version,
            Utc::now(),
        )?;

        let bytes = serde_json::to_vec(&manifest)?;
        let manifest_hash = self.store.put(&bytes)?;

        log::info!(
            "uploaded model {} version {} ({} files, {} bytes) as {}",
            model_id,
            version,
            manifest.files.len(),
            manifest.total_size,
            manifest_hash
        );

        Ok(UploadOutcome {
            manifest_hash,
            version,
        })
    }

    /// Locate the pinned manifest for an exact (model, version) pair.
    pub fn get_manifest(
        &self,
        model_id: &str,
        version: Version,
    ) -> Result<PinnedManifest, RepositoryError> {
        self.index()
            .find(model_id, version)?
            .ok_or_else(|| RepositoryError::VersionNotFound {
                model_id: model_id.to_string(),
                version,
            })
    }

    /// Download every file of one version. All-or-nothing: if any referenced
    /// blob cannot be retrieved the whole download fails and partial results
    /// are discarded. Blob fetches run in parallel; entries within a
    /// manifest have no ordering dependency.
    pub fn download(
        &self,
        model_id: &str,
        version: Version,
    ) -> Result<HashMap<String, Vec<u8>>, RepositoryError> {
        let pinned = self.get_manifest(model_id, version)?;
        let store = self.store.as_ref();

        let fetched: Vec<(String, ContentHash, Result<Vec<u8>, StoreError>)> =
            thread::scope(|s| {
                let handles: Vec<_> = pinned
                    .manifest
                    .files
                    .values()
                    .map(|entry| {
                        let filename = entry.filename.clone();
                        let hash = entry.file_cid.clone();
                        s.spawn(move || {
                            let result = store.get(&hash);
                            (filename, hash, result)
                        })
                    })
                    .collect();

                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

        let mut files = HashMap::new();
        for (filename, hash, result) in fetched {
            match result {
                Ok(bytes) => {
                    files.insert(filename, bytes);
                }
                Err(source) => {
                    return Err(RepositoryError::BlobUnavailable {
                        filename,
                        hash,
                        source,
                    });
                }
            }
        }

        log::debug!(
            "downloaded model {} version {} ({} files)",
            model_id,
            version,
            files.len()
        );
        Ok(files)
    }

    /// Download a single file of one version.
    pub fn download_file(
        &self,
        model_id: &str,
        version: Version,
        filename: &str,
    ) -> Result<Vec<u8>, RepositoryError> {
        let pinned = self.get_manifest(model_id, version)?;
        let entry =
            pinned
                .manifest
                .files
                .get(filename)
                .ok_or_else(|| RepositoryError::FileNotFound {
                    model_id: model_id.to_string(),
                    version,
                    filename: filename.to_string(),
                })?;

        self.store
            .get(&entry.file_cid)
            .map_err(|source| RepositoryError::BlobUnavailable {
                filename: filename.to_string(),
                hash: entry.file_cid.clone(),
                source,
            })
    }

    /// All versions observed for a model; empty (not an error) if the model
    /// has never been uploaded.
    pub fn list_versions(&self, model_id: &str) -> Result<Vec<Version>, RepositoryError> {
        Ok(self.index().versions_of(model_id)?)
    }

    /// The latest version of a model.
    pub fn get_latest_version(&self, model_id: &str) -> Result<Version, RepositoryError> {
        self.index()
            .latest_of(model_id)?
            .map(|p| p.manifest.version)
            .ok_or_else(|| RepositoryError::NoVersionsAvailable(model_id.to_string()))
    }

    /// Every model at its latest version.
    pub fn all_latest(&self) -> Result<Vec<PinnedManifest>, RepositoryError> {
        Ok(self.index().all_latest()?)
    }

    /// Patch manifest metadata, writing a new manifest blob.
    ///
    /// Field-level overwrite/delete over the stored JSON document: a `null`
    /// patch value removes the field, anything else replaces it. File
    /// entries are untouched unless the patch targets `files` explicitly.
    /// The patched document must still decode as a manifest.
    ///
    /// The original blob stays pinned and discoverable, so `list_versions`
    /// can report the same version twice afterwards - a structural
    /// consequence of immutable manifests layered on a pin-scan index.
    pub fn update_metadata(
        &self,
        model_id: &str,
        version: Version,
        patch: serde_json::Map<String, Value>,
    ) -> Result<ContentHash, RepositoryError> {
        let lock = self.model_lock(model_id);
        let _guard = lock.lock().unwrap();

        let pinned = self.get_manifest(model_id, version)?;
        let bytes = self.store.get(&pinned.hash)?;

        let mut doc: Value =
            serde_json::from_slice(&bytes).map_err(|e| RepositoryError::InvalidManifest {
                hash: pinned.hash.clone(),
                reason: e.to_string(),
            })?;
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| RepositoryError::InvalidManifest {
                hash: pinned.hash.clone(),
                reason: "not a JSON object".to_string(),
            })?;

        for (key, value) in patch {
            if value.is_null() {
                obj.remove(&key);
            } else {
                obj.insert(key, value);
            }
        }

        let patched = serde_json::to_vec(&doc)?;

        // The patch may not break the manifest shape
        crate::manifest::decode_manifest(&patched).map_err(|e| {
            RepositoryError::InvalidManifest {
                hash: pinned.hash.clone(),
                reason: format!("patch produced an invalid manifest: {}", e),
            }
        })?;

        let new_hash = self.store.put(&patched)?;
        log::info!(
            "patched metadata of model {} version {}: {} -> {}",
            model_id,
            version,
            pinned.hash,
            new_hash
        );
        Ok(new_hash)
    }
}
