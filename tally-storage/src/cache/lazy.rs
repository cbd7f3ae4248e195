//! Memoizing artifact cache keyed by [`AnalysisKey`].
//!
//! A lookup miss is a plain check-then-insert on a map owned by the cache,
//! which is why `get` takes `&mut self`. Share work across threads by giving
//! each worker its own cache, or wrap one cache in a lock.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tally_core::{AnalysisKey, StorageError, TallyResult};
use tracing::{debug, trace};

use super::traits::{Artifact, CacheStats};
use crate::config::CacheConfig;
use crate::lmdb_store::{AccessMode, PartitionStore};

/// Backing mode of an [`ArtifactCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// No durable backing.
    Ephemeral,
    /// Bound to a newly created store; partitions are created per key.
    PersistentWrite,
    /// Bound to an existing store opened read-only.
    PersistentRead,
}

/// Lazily constructs and memoizes one artifact per key.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(PartitionStore::create(path, &StoreConfig::default())?);
/// let mut cache: ArtifactCache<MyHistograms> = ArtifactCache::persistent(store);
///
/// for key in keys {
///     cache.fill(&key, &event, weight)?;
/// }
/// cache.flush()?;
/// ```
pub struct ArtifactCache<A: Artifact> {
    store: Option<Arc<PartitionStore>>,
    config: CacheConfig,
    /// Artifacts in creation order.
    entries: Vec<(AnalysisKey, A)>,
    /// Key -> position in `entries`.
    index: HashMap<AnalysisKey, usize>,
    stats: CacheStats,
}

impl<A: Artifact> ArtifactCache<A> {
    /// Cache whose artifacts live only as long as the cache.
    pub fn ephemeral() -> Self {
        Self::with_store(None)
    }

    /// Cache bound to `store`. The mode follows the store's access mode.
    pub fn persistent(store: Arc<PartitionStore>) -> Self {
        Self::with_store(Some(store))
    }

    fn with_store(store: Option<Arc<PartitionStore>>) -> Self {
        Self {
            store,
            config: CacheConfig::default(),
            entries: Vec::new(),
            index: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Replace the cache configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn mode(&self) -> CacheMode {
        match self.store.as_ref().map(|s| s.mode()) {
            None => CacheMode::Ephemeral,
            Some(AccessMode::Write) => CacheMode::PersistentWrite,
            Some(AccessMode::ReadOnly) => CacheMode::PersistentRead,
        }
    }

    pub fn store(&self) -> Option<&Arc<PartitionStore>> {
        self.store.as_ref()
    }

    /// Artifact for `key`, created on first access.
    ///
    /// Equal keys always yield the same artifact.
    ///
    /// # Errors
    ///
    /// - `StorageError::IncompleteKey` if a store is bound and `key` is not complete
    /// - `KeyError::MissingDimension` if `key` has no value in the baseline
    ///   dimension of the [`CacheConfig`]
    /// - `StorageError::PartitionNotFound` in read mode when the store has no
    ///   partition for `key`
    /// - any error raised by the store or by [`Artifact::bind`]
    pub fn get(&mut self, key: &AnalysisKey) -> TallyResult<&mut A> {
        if let Some(&slot) = self.index.get(key) {
            self.stats.hits += 1;
            trace!(key = %key, "artifact cache hit");
            return Ok(&mut self.entries[slot].1);
        }

        self.stats.misses += 1;
        let artifact = self.make(key)?;
        let slot = self.entries.len();
        self.entries.push((key.clone(), artifact));
        self.index.insert(key.clone(), slot);
        Ok(&mut self.entries[slot].1)
    }

    /// Record one data point in the artifact for `key`.
    pub fn fill(&mut self, key: &AnalysisKey, event: &A::Event, weight: f64) -> TallyResult<()> {
        self.get(key)?.fill(event, weight);
        Ok(())
    }

    /// Artifact for `key` if it was already created.
    pub fn lookup(&self, key: &AnalysisKey) -> Option<&A> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, key: &AnalysisKey) -> bool {
        self.index.contains_key(key)
    }

    /// Every key and its artifact, in creation order.
    pub fn get_all(&self) -> impl ExactSizeIterator<Item = (&AnalysisKey, &A)> + '_ {
        self.entries.iter().map(|(key, artifact)| (key, artifact))
    }

    pub fn get_all_mut(&mut self) -> impl ExactSizeIterator<Item = (&AnalysisKey, &mut A)> + '_ {
        self.entries.iter_mut().map(|(key, artifact)| (&*key, artifact))
    }

    /// Every key and its artifact, ordered by key.
    pub fn sorted(&self) -> Vec<(&AnalysisKey, &A)> {
        let mut all: Vec<_> = self.get_all().collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Flush every artifact to its partition.
    pub fn flush(&self) -> TallyResult<()> {
        if self.mode() == CacheMode::PersistentRead {
            return Err(StorageError::ReadOnly {
                operation: "flush artifacts".to_string(),
            }
            .into());
        }
        for (_, artifact) in &self.entries {
            artifact.flush()?;
        }
        debug!(count = self.entries.len(), "flushed artifacts");
        Ok(())
    }

    /// Materialize an artifact for every complete key found in the bound
    /// store. Returns the number of artifacts created. An ephemeral cache
    /// has nothing to load.
    pub fn load_all(&mut self) -> TallyResult<usize> {
        let keys = match &self.store {
            Some(store) => store.keys()?,
            None => return Ok(0),
        };

        let before = self.entries.len();
        for key in keys.iter().filter(|k| k.is_complete()) {
            self.get(key)?;
        }
        Ok(self.entries.len() - before)
    }

    /// Consume the cache, yielding its entries in creation order.
    pub fn into_entries(self) -> Vec<(AnalysisKey, A)> {
        self.entries
    }

    fn make(&self, key: &AnalysisKey) -> TallyResult<A> {
        match &self.store {
            Some(store) => {
                if !key.is_complete() {
                    return Err(StorageError::IncompleteKey {
                        key: key.clone(),
                        missing: key.missing_dimensions(),
                    }
                    .into());
                }
                let fill_all = self.config.fill_all(key)?;
                let partition = store.partition(&key.to_string())?;
                debug!(partition = partition.name(), fill_all, "creating artifact");
                A::bind(partition, fill_all)
            }
            None => {
                let fill_all = self.config.fill_all(key)?;
                debug!(key = %key, fill_all, "creating ephemeral artifact");
                Ok(A::ephemeral(fill_all))
            }
        }
    }
}

/// Artifact-type-erased view of an [`ArtifactCache`].
///
/// Lets callers hold caches of different artifact types behind one
/// interface. `get_any` yields the artifact as `dyn Any` for downcasting.
pub trait AnyArtifactCache {
    fn mode(&self) -> CacheMode;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: &AnalysisKey) -> bool;

    /// Keys in creation order.
    fn keys(&self) -> Vec<AnalysisKey>;

    fn stats(&self) -> &CacheStats;

    fn flush(&self) -> TallyResult<()>;

    /// Same as [`ArtifactCache::get`], with the artifact type erased.
    fn get_any(&mut self, key: &AnalysisKey) -> TallyResult<&mut dyn Any>;
}

impl<A: Artifact + 'static> AnyArtifactCache for ArtifactCache<A> {
    fn mode(&self) -> CacheMode {
        ArtifactCache::mode(self)
    }

    fn len(&self) -> usize {
        ArtifactCache::len(self)
    }

    fn contains(&self, key: &AnalysisKey) -> bool {
        ArtifactCache::contains(self, key)
    }

    fn keys(&self) -> Vec<AnalysisKey> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    fn stats(&self) -> &CacheStats {
        ArtifactCache::stats(self)
    }

    fn flush(&self) -> TallyResult<()> {
        ArtifactCache::flush(self)
    }

    fn get_any(&mut self, key: &AnalysisKey) -> TallyResult<&mut dyn Any> {
        let artifact = ArtifactCache::get(self, key)?;
        Ok(artifact as &mut dyn Any)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::lmdb_store::Partition;
    use proptest::prelude::*;
    use tally_core::{
        DatasetName, EventCategory, EventEnergyScale, EventRegion, EventSubCategory,
    };
    use tempfile::TempDir;

    /// Remembers the partition it was bound to.
    struct Binding {
        partition: Option<String>,
        fills: u32,
    }

    impl Artifact for Binding {
        type Event = ();

        fn ephemeral(_fill_all: bool) -> Self {
            Self {
                partition: None,
                fills: 0,
            }
        }

        fn bind(partition: Partition, _fill_all: bool) -> TallyResult<Self> {
            Ok(Self {
                partition: Some(partition.name().to_string()),
                fills: 0,
            })
        }

        fn fill(&mut self, _event: &(), _weight: f64) {
            self.fills += 1;
        }
    }

    fn arb_complete_key() -> impl Strategy<Value = AnalysisKey> {
        (
            prop::sample::select(EventCategory::ALL),
            prop::sample::select(EventSubCategory::ALL),
            prop::sample::select(EventRegion::ALL),
            prop::sample::select(EventEnergyScale::ALL),
            "[A-Za-z][A-Za-z0-9_]{0,11}",
        )
            .prop_map(|(c, s, r, e, d)| {
                let dataset = DatasetName::new(d).expect("generated dataset name is valid");
                AnalysisKey::new().set(c).set(s).set(r).set(e).set(dataset)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_get_memoizes_equal_keys(keys in prop::collection::vec(arb_complete_key(), 1..12)) {
            let mut cache: ArtifactCache<Binding> = ArtifactCache::ephemeral();
            for key in &keys {
                cache.fill(key, &(), 1.0).expect("fill");
            }

            let distinct: std::collections::HashSet<_> = keys.iter().collect();
            prop_assert_eq!(cache.len(), distinct.len());
            prop_assert_eq!(cache.stats().hits + cache.stats().misses, keys.len() as u64);
            for key in distinct {
                let expected = keys.iter().filter(|k| *k == key).count() as u32;
                prop_assert_eq!(cache.lookup(key).map(|p| p.fills), Some(expected));
            }
        }

        #[test]
        fn prop_persistent_partition_named_by_key(keys in prop::collection::vec(arb_complete_key(), 1..6)) {
            let temp_dir = TempDir::new().expect("TempDir creation should succeed");
            let store = Arc::new(
                PartitionStore::create(temp_dir.path(), &StoreConfig::new().with_map_size_mb(8))
                    .expect("store creation should succeed"),
            );
            let mut cache: ArtifactCache<Binding> = ArtifactCache::persistent(Arc::clone(&store));

            for key in &keys {
                let name = key.to_string();
                let binding = cache.get(key).expect("complete key");
                prop_assert_eq!(binding.partition.as_deref(), Some(name.as_str()));
            }
            for key in &keys {
                prop_assert!(store.has_partition(&key.to_string()).expect("has_partition"));
            }
        }
    }
}
