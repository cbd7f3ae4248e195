//! Artifact contract and cache statistics.

use tally_core::TallyResult;

use crate::lmdb_store::Partition;

/// An object the cache constructs lazily, one per key.
///
/// The cache only decides *when* an artifact is created and *where* it lives;
/// what it records is entirely up to the implementation.
///
/// # Implementation Requirements
///
/// - `ephemeral` builds an artifact with no durable backing
/// - `bind` builds an artifact scoped to `partition`; when the partition is
///   read-only the artifact should load its existing state from it
/// - `fill_all` asks the artifact to also maintain its auxiliary derived
///   content; it is set for keys holding the cache's baseline value
pub trait Artifact: Sized {
    /// One recorded data point.
    type Event: ?Sized;

    /// Create an artifact with no partition binding.
    fn ephemeral(fill_all: bool) -> Self;

    /// Create an artifact scoped to `partition`.
    fn bind(partition: Partition, fill_all: bool) -> TallyResult<Self>;

    /// Record one data point with the given weight.
    fn fill(&mut self, event: &Self::Event, weight: f64);

    /// Write pending state to the bound partition, if any.
    fn flush(&self) -> TallyResult<()> {
        Ok(())
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the memo map.
    pub hits: u64,
    /// Lookups that had to create an artifact.
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats { hits: 3, misses: 1 };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
