//! Configuration types for the partition store and the artifact cache

use serde::{Deserialize, Serialize};
use tally_core::{
    AnalysisKey, ConfigError, DimensionValue, EventEnergyScale, KeyError, TallyError,
    TallyResult,
};

/// Settings for opening or creating a [`PartitionStore`](crate::PartitionStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum size of the memory map in megabytes.
    pub map_size_mb: usize,
    /// Maximum number of partitions (named databases) in the store.
    pub max_partitions: u32,
    /// Remove an existing store at the target path when creating.
    pub overwrite_existing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            map_size_mb: 64,
            max_partitions: 4096,
            overwrite_existing: false,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map_size_mb(mut self, map_size_mb: usize) -> Self {
        self.map_size_mb = map_size_mb;
        self
    }

    pub fn with_max_partitions(mut self, max_partitions: u32) -> Self {
        self.max_partitions = max_partitions;
        self
    }

    pub fn with_overwrite(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }

    /// Map size in bytes, as passed to LMDB.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> TallyResult<()> {
        if self.map_size_mb == 0 {
            return Err(TallyError::Config(ConfigError::InvalidValue {
                field: "map_size_mb".to_string(),
                value: self.map_size_mb.to_string(),
                reason: "map_size_mb must be greater than 0".to_string(),
            }));
        }

        if self.max_partitions == 0 {
            return Err(TallyError::Config(ConfigError::InvalidValue {
                field: "max_partitions".to_string(),
                value: self.max_partitions.to_string(),
                reason: "max_partitions must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

/// Settings for an [`ArtifactCache`](crate::ArtifactCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Keys holding this value in its dimension create artifacts with the
    /// `fill_all` flag set.
    pub baseline: DimensionValue,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            baseline: DimensionValue::EnergyScale(EventEnergyScale::Central),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the baseline value that enables `fill_all`.
    pub fn with_baseline(mut self, baseline: impl Into<DimensionValue>) -> Self {
        self.baseline = baseline.into();
        self
    }

    /// Whether an artifact created for `key` should fill everything.
    ///
    /// # Errors
    ///
    /// `KeyError::MissingDimension` if `key` has no value in the baseline's
    /// dimension.
    pub fn fill_all(&self, key: &AnalysisKey) -> Result<bool, KeyError> {
        let dimension = self.baseline.dimension();
        match key.value(dimension) {
            Some(value) => Ok(value == self.baseline),
            None => Err(KeyError::MissingDimension {
                dimension,
                key: key.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Dimension, EventRegion, TallyError};

    #[test]
    fn test_store_config_defaults_validate() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.map_size_bytes(), 64 * 1024 * 1024);
    }

    #[test]
    fn test_store_config_rejects_zero_map_size() {
        let result = StoreConfig::new().with_map_size_mb(0).validate();
        match result {
            Err(TallyError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "map_size_mb");
            }
            other => panic!("expected map_size_mb config error, got {:?}", other),
        }
    }

    #[test]
    fn test_store_config_rejects_zero_partitions() {
        let result = StoreConfig::new().with_max_partitions(0).validate();
        assert!(matches!(
            result,
            Err(TallyError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_store_config_partial_json_uses_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{ "map_size_mb": 8 }"#).expect("partial config parses");
        assert_eq!(config.map_size_mb, 8);
        assert_eq!(config.max_partitions, StoreConfig::default().max_partitions);
        assert!(!config.overwrite_existing);
    }

    #[test]
    fn test_fill_all_uses_central_by_default() {
        let config = CacheConfig::default();
        let key = AnalysisKey::new().set(EventRegion::OsIsolated);
        assert_eq!(config.fill_all(&key.set(EventEnergyScale::Central)), Ok(true));
        assert_eq!(config.fill_all(&key.set(EventEnergyScale::TauUp)), Ok(false));
    }

    #[test]
    fn test_fill_all_missing_baseline_dimension() {
        let config = CacheConfig::default();
        let key = AnalysisKey::new().set(EventRegion::OsIsolated);
        assert_eq!(
            config.fill_all(&key),
            Err(KeyError::MissingDimension {
                dimension: Dimension::EnergyScale,
                key: key.clone(),
            })
        );
    }

    #[test]
    fn test_fill_all_with_custom_baseline() {
        let config = CacheConfig::new().with_baseline(EventRegion::OsIsolated);
        let key = AnalysisKey::new().set(EventEnergyScale::TauDown);
        assert!(config.fill_all(&key).is_err());
        assert_eq!(config.fill_all(&key.set(EventRegion::SsIsolated)), Ok(false));
        assert_eq!(config.fill_all(&key.set(EventRegion::OsIsolated)), Ok(true));
    }
}
