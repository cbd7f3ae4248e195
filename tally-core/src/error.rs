//! Error types for TALLY operations
//!
//! Every variant is a caller-facing contract violation or a failure of the
//! backing store. Nothing here is retried internally.

use crate::{AnalysisKey, Dimension};
use thiserror::Error;

/// Errors raised by key access, parsing and sweep expansion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("{dimension} is not specified in analysis key '{key}'")]
    MissingDimension {
        dimension: Dimension,
        key: AnalysisKey,
    },

    #[error("Duplicated dimension {dimension} in sweep")]
    DuplicateDimension { dimension: Dimension },

    #[error("Malformed analysis key '{input}': {reason}")]
    Malformed { input: String, reason: String },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Analysis key '{key}' is not complete (missing: {missing:?})")]
    IncompleteKey {
        key: AnalysisKey,
        missing: Vec<Dimension>,
    },

    #[error("Backing store failure: {reason}")]
    BackingResource { reason: String },

    #[error("Partition not found: {name}")]
    PartitionNotFound { name: String },

    #[error("Store is read-only, cannot {operation}")]
    ReadOnly { operation: String },

    #[error("Codec error: {reason}")]
    Codec { reason: String },
}

/// Validation errors for dimension values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: '{value}' - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all TALLY errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TallyError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for TALLY operations.
pub type TallyResult<T> = Result<T, TallyError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventRegion;

    #[test]
    fn test_missing_dimension_display() {
        let err = KeyError::MissingDimension {
            dimension: Dimension::EnergyScale,
            key: AnalysisKey::new().set(EventRegion::OsIsolated),
        };
        let msg = err.to_string();
        assert!(msg.contains("EnergyScale"));
        assert!(msg.contains("*/*/OS_Isolated/*/*"));
    }

    #[test]
    fn test_duplicate_dimension_display() {
        let err = KeyError::DuplicateDimension {
            dimension: Dimension::Region,
        };
        assert_eq!(err.to_string(), "Duplicated dimension Region in sweep");
    }

    #[test]
    fn test_incomplete_key_display() {
        let key = AnalysisKey::new().set(EventRegion::SsIsolated);
        let err = StorageError::IncompleteKey {
            missing: key.missing_dimensions(),
            key,
        };
        let msg = err.to_string();
        assert!(msg.contains("not complete"));
        assert!(msg.contains("Category"));
        assert!(!msg.contains("Region,"));
    }

    #[test]
    fn test_master_error_from_conversions() {
        let err: TallyError = KeyError::DuplicateDimension {
            dimension: Dimension::Dataset,
        }
        .into();
        assert!(matches!(err, TallyError::Key(_)));

        let err: TallyError = StorageError::BackingResource {
            reason: "disk".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Storage error:"));

        let err: TallyError = ConfigError::InvalidValue {
            field: "map_size_mb".to_string(),
            value: "0".to_string(),
            reason: "must be greater than 0".to_string(),
        }
        .into();
        assert!(matches!(err, TallyError::Config(_)));
    }
}
