//! Versioned model artifact registry over a content-addressable store
//!
//! This crate exposes versioned binary artifacts ("models") through an HTTP
//! API, persisting both the artifacts and their version metadata inside a
//! content-addressable store. There is no database: the metadata index is
//! reconstructed on demand by scanning every pinned object and filtering
//! for manifest-shaped JSON.

pub mod config;
pub mod index;
pub mod manifest;
pub mod repository;
pub mod server;
pub mod store;
pub mod version;

pub use config::Config;
pub use manifest::Manifest;
pub use repository::{Repository, RepositoryError};
pub use store::{ContentHash, ContentStore, StoreError};
pub use version::Version;
