//! TALLY Storage - Lazy Artifact Cache and Partition Store
//!
//! The cache creates one artifact per analysis key on first access. Bound to
//! a [`PartitionStore`], each artifact lives in an LMDB partition named by
//! its key's canonical string.

pub mod cache;
pub mod config;
pub mod lmdb_store;

pub use cache::{AnyArtifactCache, Artifact, ArtifactCache, CacheMode, CacheStats};
pub use config::{CacheConfig, StoreConfig};
pub use lmdb_store::{AccessMode, LmdbStoreError, Partition, PartitionStore};
