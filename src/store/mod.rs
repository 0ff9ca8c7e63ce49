//! Content store abstraction
//!
//! Defines the ContentStore trait the repository consumes. The store is an
//! external collaborator: blobs are addressed solely by the hash it hands
//! back on write, and the pin list is the only enumeration mechanism it
//! offers. The store does not distinguish manifests from raw file blobs;
//! callers must self-filter.

pub mod file;
pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(ContentHash),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque content hash handed back by the store on write.
///
/// The repository never inspects the hash; it only passes it back to the
/// store for retrieval and embeds it in manifests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(s: impl Into<String>) -> Self {
        ContentHash(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        ContentHash(s)
    }
}

/// Content store trait - the external collaborator holding all blobs.
///
/// Writes are idempotent: storing the same bytes twice yields the same hash
/// and a single pinned object. Every pinned object, manifest or raw file
/// blob alike, appears in `list_pins`.
pub trait ContentStore: Send + Sync {
    /// Store a blob and return its content hash. Pins the object.
    fn put(&self, data: &[u8]) -> StoreResult<ContentHash>;

    /// Retrieve a blob by hash. Fails with NotFound if unpinned/unknown.
    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>>;

    /// Enumerate every pinned object, with no filtering by content type.
    fn list_pins(&self) -> StoreResult<Vec<ContentHash>>;
}

// Re-export implementations
pub use file::FileStore;
pub use memory::MemoryStore;
