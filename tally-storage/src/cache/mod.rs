//! Lazy artifact cache.
//!
//! This module provides the memoizing cache that owns one artifact per
//! [`AnalysisKey`](tally_core::AnalysisKey):
//!
//! - **Artifact**: contract for the objects the cache creates
//! - **ArtifactCache**: get-or-create map in ephemeral or persistent mode
//! - **AnyArtifactCache**: the same cache with the artifact type erased
//! - **CacheStats**: hit/miss counters

mod lazy;
mod traits;

pub use lazy::{AnyArtifactCache, ArtifactCache, CacheMode};
pub use traits::{Artifact, CacheStats};
