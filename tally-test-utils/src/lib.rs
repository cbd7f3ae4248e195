//! TALLY Test Utilities
//!
//! Centralized test infrastructure for the TALLY workspace:
//! - Proptest generators for dimension values and keys
//! - A fixture artifact that persists simple weighted totals
//! - Temporary partition stores
//! - Tracing setup for tests

// Re-export core types for convenience
pub use tally_core::{
    AnalysisKey, DatasetName, Dimension, DimensionValue, EventCategory, EventEnergyScale,
    EventRegion, EventSubCategory, KeyError, StorageError, TallyError, TallyResult,
};
pub use tally_storage::{
    Artifact, ArtifactCache, CacheConfig, CacheMode, Partition, PartitionStore, StoreConfig,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a fmt subscriber filtered by `RUST_LOG` (default `warn`).
/// Safe to call from every test; only the first call has an effect.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// FIXTURE ARTIFACT
// ============================================================================

/// Persisted state of a [`WeightedTally`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyTotals {
    pub entries: u64,
    pub sum_weights: f64,
    pub sum_weighted_values: f64,
}

/// Fixture artifact: weighted totals of an observable.
///
/// With `fill_all` set it also keeps unit-weight totals, standing in for the
/// auxiliary content a real artifact derives for baseline keys.
#[derive(Debug)]
pub struct WeightedTally {
    partition: Option<Partition>,
    pub fill_all: bool,
    pub totals: TallyTotals,
    pub unweighted: Option<TallyTotals>,
}

impl WeightedTally {
    pub const TOTALS_ENTRY: &'static str = "totals";
    pub const UNWEIGHTED_ENTRY: &'static str = "totals_unweighted";

    pub fn partition_name(&self) -> Option<&str> {
        self.partition.as_ref().map(Partition::name)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.totals.sum_weights != 0.0)
            .then(|| self.totals.sum_weighted_values / self.totals.sum_weights)
    }
}

impl Artifact for WeightedTally {
    type Event = f64;

    fn ephemeral(fill_all: bool) -> Self {
        Self {
            partition: None,
            fill_all,
            totals: TallyTotals::default(),
            unweighted: fill_all.then(TallyTotals::default),
        }
    }

    fn bind(partition: Partition, fill_all: bool) -> TallyResult<Self> {
        let totals = partition.get(Self::TOTALS_ENTRY)?.unwrap_or_default();
        let unweighted = if fill_all {
            Some(partition.get(Self::UNWEIGHTED_ENTRY)?.unwrap_or_default())
        } else {
            None
        };
        Ok(Self {
            partition: Some(partition),
            fill_all,
            totals,
            unweighted,
        })
    }

    fn fill(&mut self, value: &f64, weight: f64) {
        self.totals.entries += 1;
        self.totals.sum_weights += weight;
        self.totals.sum_weighted_values += weight * value;
        if let Some(unweighted) = &mut self.unweighted {
            unweighted.entries += 1;
            unweighted.sum_weights += 1.0;
            unweighted.sum_weighted_values += value;
        }
    }

    fn flush(&self) -> TallyResult<()> {
        let Some(partition) = &self.partition else {
            return Ok(());
        };
        partition.put(Self::TOTALS_ENTRY, &self.totals)?;
        if let Some(unweighted) = &self.unweighted {
            partition.put(Self::UNWEIGHTED_ENTRY, unweighted)?;
        }
        Ok(())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Dataset name for tests. Panics on an invalid name.
pub fn dataset(name: &str) -> DatasetName {
    DatasetName::new(name).expect("test dataset name should be valid")
}

/// A complete key varying only in energy scale.
pub fn complete_key(scale: EventEnergyScale) -> AnalysisKey {
    AnalysisKey::new()
        .set(EventCategory::TwoJetsTwoBtag)
        .set(EventSubCategory::MassWindow)
        .set(EventRegion::OsIsolated)
        .set(scale)
        .set(dataset("DYJets"))
}

/// Small store config suitable for tests.
pub fn test_store_config() -> StoreConfig {
    StoreConfig::new().with_map_size_mb(8).with_max_partitions(512)
}

/// Create a fresh store in a new temporary directory.
pub fn temp_store() -> (Arc<PartitionStore>, TempDir) {
    let temp_dir = TempDir::new().expect("TempDir creation should succeed");
    let store = PartitionStore::create(temp_dir.path(), &test_store_config())
        .expect("store creation should succeed");
    (Arc::new(store), temp_dir)
}

/// Open the store at `path` read-only.
pub fn reopen_read_only(path: &Path) -> Arc<PartitionStore> {
    Arc::new(
        PartitionStore::open_read_only(path, &test_store_config())
            .expect("read-only open should succeed"),
    )
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_category() -> impl Strategy<Value = EventCategory> {
        prop::sample::select(EventCategory::ALL)
    }

    pub fn arb_sub_category() -> impl Strategy<Value = EventSubCategory> {
        prop::sample::select(EventSubCategory::ALL)
    }

    pub fn arb_region() -> impl Strategy<Value = EventRegion> {
        prop::sample::select(EventRegion::ALL)
    }

    pub fn arb_energy_scale() -> impl Strategy<Value = EventEnergyScale> {
        prop::sample::select(EventEnergyScale::ALL)
    }

    pub fn arb_dataset() -> impl Strategy<Value = DatasetName> {
        "[A-Za-z][A-Za-z0-9_]{0,15}".prop_map(|name| dataset(&name))
    }

    pub fn arb_dimension() -> impl Strategy<Value = Dimension> {
        prop::sample::select(Dimension::ALL.to_vec())
    }

    pub fn arb_dimension_value() -> impl Strategy<Value = DimensionValue> {
        prop_oneof![
            arb_category().prop_map(DimensionValue::from),
            arb_sub_category().prop_map(DimensionValue::from),
            arb_region().prop_map(DimensionValue::from),
            arb_energy_scale().prop_map(DimensionValue::from),
            arb_dataset().prop_map(DimensionValue::from),
        ]
    }

    /// Keys with every slot independently present or absent.
    pub fn arb_key() -> impl Strategy<Value = AnalysisKey> {
        prop::collection::vec(arb_dimension_value(), 0..8).prop_map(AnalysisKey::from_values)
    }

    /// Keys with every slot present.
    pub fn arb_complete_key() -> impl Strategy<Value = AnalysisKey> {
        (
            arb_category(),
            arb_sub_category(),
            arb_region(),
            arb_energy_scale(),
            arb_dataset(),
        )
            .prop_map(|(c, s, r, e, d)| {
                AnalysisKey::new().set(c).set(s).set(r).set(e).set(d)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_tally_mean() {
        let mut tally = WeightedTally::ephemeral(false);
        assert_eq!(tally.mean(), None);
        tally.fill(&2.0, 1.0);
        tally.fill(&4.0, 3.0);
        assert_eq!(tally.totals.entries, 2);
        assert_eq!(tally.mean(), Some(3.5));
        assert!(tally.unweighted.is_none());
    }

    #[test]
    fn test_weighted_tally_fill_all_keeps_unweighted() {
        let mut tally = WeightedTally::ephemeral(true);
        tally.fill(&2.0, 0.5);
        let unweighted = tally.unweighted.as_ref().expect("fill_all keeps unweighted totals");
        assert_eq!(unweighted.sum_weights, 1.0);
        assert_eq!(unweighted.sum_weighted_values, 2.0);
    }

    #[test]
    fn test_complete_key_fixture() {
        assert!(complete_key(EventEnergyScale::Central).is_complete());
    }
}
