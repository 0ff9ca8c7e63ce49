//! Version manifests
//!
//! A manifest is the authoritative description of one version of a model:
//! its file list, content hashes, sizes, and metadata. Manifests are
//! serialized as JSON and stored as single blobs in the content store; the
//! blob's hash is the manifest hash. They are immutable once pinned -
//! metadata updates write a new blob rather than mutating in place.
//!
//! Two wire shapes exist: the current one keys the model identifier as
//! `model_id`, legacy manifests use `ipfs_uuid`. Decoding accepts both via
//! an explicit union and migrates into the single in-memory type; writes
//! always emit the current shape.

use crate::store::{ContentHash, ContentStore, StoreError};
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;

/// Manifest assembly errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("carry-forward source not in prior manifest: {0}")]
    MissingCarryForwardSource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One file within a manifest. Immutable once part of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,

    /// Lower-cased extension after the last '.', empty if none
    pub file_type: String,

    pub file_cid: ContentHash,

    /// Size in bytes; carried as a string on the wire (historical format)
    #[serde(with = "size_as_string")]
    pub file_size: u64,

    pub created_at: DateTime<Utc>,
}

/// The description of one version of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub model_id: String,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
}

/// Legacy wire shape: identifier keyed as `ipfs_uuid`
#[derive(Debug, Deserialize)]
struct LegacyManifest {
    ipfs_uuid: String,
    version: Version,
    created_at: DateTime<Utc>,
    #[serde(default)]
    release_notes: Option<String>,
    #[serde(default)]
    total_size: u64,
    #[serde(default)]
    files: BTreeMap<String, FileEntry>,
}

impl LegacyManifest {
    fn migrate(self) -> Manifest {
        Manifest {
            model_id: self.ipfs_uuid,
            version: self.version,
            created_at: self.created_at,
            release_notes: self.release_notes,
            total_size: self.total_size,
            files: self.files,
        }
    }
}

/// Union of the known wire shapes, tried in order
#[derive(Deserialize)]
#[serde(untagged)]
enum WireManifest {
    Current(Manifest),
    Legacy(LegacyManifest),
}

/// Decode a blob as a manifest, accepting both wire shapes.
///
/// Fails on non-JSON input, non-object JSON, and objects missing any of the
/// required fields (identifier, version, created_at).
pub fn decode_manifest(bytes: &[u8]) -> Result<Manifest, serde_json::Error> {
    let wire: WireManifest = serde_json::from_slice(bytes)?;
    Ok(match wire {
        WireManifest::Current(m) => m,
        WireManifest::Legacy(m) => m.migrate(),
    })
}

/// Derive the file type from a filename extension
fn file_type_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Assemble a manifest from new files and entries carried forward from the
/// prior version.
///
/// New file bytes are written to the store here; the manifest itself is not
/// persisted (the repository pins it), which keeps the builder independently
/// testable. Carried-forward entries keep their content hash and size but
/// are stamped with `now` - logically re-published, not re-uploaded. New
/// files win over carried-forward entries on filename collision.
#[allow(clippy::too_many_arguments)]
pub fn build_manifest(
    store: &dyn ContentStore,
    model_id: &str,
    prior: Option<&Manifest>,
    new_files: Vec<(String, Box<dyn Read + Send>)>,
    carry_forward: &BTreeMap<String, String>,
    release_notes: Option<String>,
    version: Version,
    now: DateTime<Utc>,
) -> Result<Manifest, ManifestError> {
    let mut files = BTreeMap::new();

    for (old_name, new_name) in carry_forward {
        let source = prior
            .and_then(|m| m.files.get(old_name))
            .ok_or_else(|| ManifestError::MissingCarryForwardSource(old_name.clone()))?;

        files.insert(
            new_name.clone(),
            FileEntry {
                filename: new_name.clone(),
                file_type: source.file_type.clone(),
                file_cid: source.file_cid.clone(),
                file_size: source.file_size,
                created_at: now,
            },
        );
    }

    for (name, mut reader) in new_files {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let file_cid = store.put(&data)?;

        log::debug!("stored {} ({} bytes) as {}", name, data.len(), file_cid);

        files.insert(
            name.clone(),
            FileEntry {
                filename: name.clone(),
                file_type: file_type_of(&name),
                file_cid,
                file_size: data.len() as u64,
                created_at: now,
            },
        );
    }

    let total_size = files.values().map(|f| f.file_size).sum();

    Ok(Manifest {
        model_id: model_id.to_string(),
        version,
        created_at: now,
        release_notes,
        total_size,
        files,
    })
}

mod size_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(size: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(size)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        // Historical manifests carry the size as a string; accept bare
        // numbers as well.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
