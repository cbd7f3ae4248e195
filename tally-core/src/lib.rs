//! TALLY Core - Analysis Keys and Sweeps
//!
//! Typed dimension domains, the composite [`AnalysisKey`] built from them,
//! and sweep expansion over per-dimension value sets. All other crates
//! depend on this one.

pub mod dimension;
pub mod error;
pub mod key;
pub mod sweep;

pub use dimension::{
    DatasetName, Dimension, DimensionValue, EventCategory, EventEnergyScale, EventRegion,
    EventSubCategory,
};
pub use error::{ConfigError, KeyError, StorageError, TallyError, TallyResult, ValidationError};
pub use key::{AnalysisKey, KeyElement, SEPARATOR, WILDCARD};
pub use sweep::{expand, DimensionValues, Sweep, SweepSource};
