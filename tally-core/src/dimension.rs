//! Dimension domains of an analysis key
//!
//! Each dimension is a closed, typed categorical domain. The declaration
//! order of [`Dimension`] is the slot order of [`AnalysisKey`](crate::AnalysisKey)
//! and therefore its ordering priority.

use crate::error::ValidationError;
use crate::key::{SEPARATOR, WILDCARD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DIMENSION DISCRIMINATOR
// ============================================================================

/// One independent categorical axis of an analysis key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Category,
    SubCategory,
    Region,
    EnergyScale,
    Dataset,
}

impl Dimension {
    /// Number of slots in a key.
    pub const COUNT: usize = 5;

    /// All dimensions in declared slot order.
    pub const ALL: [Dimension; Dimension::COUNT] = [
        Dimension::Category,
        Dimension::SubCategory,
        Dimension::Region,
        Dimension::EnergyScale,
        Dimension::Dataset,
    ];

    /// Position of this dimension's slot.
    pub fn index(self) -> usize {
        match self {
            Dimension::Category => 0,
            Dimension::SubCategory => 1,
            Dimension::Region => 2,
            Dimension::EnergyScale => 3,
            Dimension::Dataset => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Category => "Category",
            Dimension::SubCategory => "SubCategory",
            Dimension::Region => "Region",
            Dimension::EnergyScale => "EnergyScale",
            Dimension::Dataset => "Dataset",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALUE DOMAINS
// ============================================================================

/// Jet/b-tag multiplicity class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Inclusive,
    TwoJets,
    TwoJetsZeroBtag,
    TwoJetsOneBtag,
    TwoJetsTwoBtag,
    TwoJetsTwoLooseBtag,
    TwoJetsOneBtagResolved,
    TwoJetsTwoBtagBoosted,
}

/// Additional selection applied on top of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventSubCategory {
    NoCuts,
    MassWindow,
    OutsideMassWindow,
    KinematicFitConverged,
    KinematicFitConvergedMassWindow,
}

/// Charge/isolation control region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventRegion {
    OsIsolated,
    OsAntiIsolated,
    SsIsolated,
    SsAntiIsolated,
    SsLooseIsolated,
}

/// Systematic energy-scale variation. `Central` is the nominal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventEnergyScale {
    Central,
    TauUp,
    TauDown,
    JetUp,
    JetDown,
    BtagUp,
    BtagDown,
}

/// Name of an input dataset.
///
/// Names render verbatim inside a key's canonical string, so they may not be
/// empty, contain the separator, or equal the wildcard token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetName(String);

impl DatasetName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("dataset name must not be empty".to_string())
        } else if name.contains(SEPARATOR) {
            Some(format!("dataset name must not contain '{}'", SEPARATOR))
        } else if name == WILDCARD {
            Some(format!("dataset name must not be the wildcard '{}'", WILDCARD))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ValidationError::InvalidValue {
                field: "DatasetName".to_string(),
                value: name,
                reason,
            }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatasetName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatasetName> for String {
    fn from(value: DatasetName) -> Self {
        value.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatasetName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// STRING CONVERSIONS
// ============================================================================

/// Implements `ALL`, `as_str`, `Display` and `FromStr` for a closed value
/// domain from its token table. Tokens must be separator-free and distinct.
macro_rules! impl_value_tokens {
    ($ty:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $ty {
            /// All values in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($ty::$variant),)+
                    _ => Err(ValidationError::InvalidValue {
                        field: stringify!($ty).to_string(),
                        value: s.to_string(),
                        reason: "unknown token".to_string(),
                    }),
                }
            }
        }
    };
}

impl_value_tokens!(EventCategory {
    Inclusive => "Inclusive",
    TwoJets => "2j",
    TwoJetsZeroBtag => "2j0b",
    TwoJetsOneBtag => "2j1b",
    TwoJetsTwoBtag => "2j2b",
    TwoJetsTwoLooseBtag => "2j2Lb",
    TwoJetsOneBtagResolved => "2j1b+R",
    TwoJetsTwoBtagBoosted => "2j2b+B",
});

impl_value_tokens!(EventSubCategory {
    NoCuts => "NoCuts",
    MassWindow => "mh",
    OutsideMassWindow => "NO_mh",
    KinematicFitConverged => "KinFitConv",
    KinematicFitConvergedMassWindow => "KinFitConv_mh",
});

impl_value_tokens!(EventRegion {
    OsIsolated => "OS_Isolated",
    OsAntiIsolated => "OS_AntiIsolated",
    SsIsolated => "SS_Isolated",
    SsAntiIsolated => "SS_AntiIsolated",
    SsLooseIsolated => "SS_LooseIsolated",
});

impl_value_tokens!(EventEnergyScale {
    Central => "Central",
    TauUp => "TauUp",
    TauDown => "TauDown",
    JetUp => "JetUp",
    JetDown => "JetDown",
    BtagUp => "BtagUp",
    BtagDown => "BtagDown",
});

// ============================================================================
// TAGGED VALUE
// ============================================================================

/// A single value of exactly one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionValue {
    Category(EventCategory),
    SubCategory(EventSubCategory),
    Region(EventRegion),
    EnergyScale(EventEnergyScale),
    Dataset(DatasetName),
}

impl DimensionValue {
    /// The dimension this value belongs to.
    pub fn dimension(&self) -> Dimension {
        match self {
            DimensionValue::Category(_) => Dimension::Category,
            DimensionValue::SubCategory(_) => Dimension::SubCategory,
            DimensionValue::Region(_) => Dimension::Region,
            DimensionValue::EnergyScale(_) => Dimension::EnergyScale,
            DimensionValue::Dataset(_) => Dimension::Dataset,
        }
    }

    /// Parse a rendered value of the given dimension.
    pub fn parse(dimension: Dimension, s: &str) -> Result<Self, ValidationError> {
        Ok(match dimension {
            Dimension::Category => DimensionValue::Category(s.parse()?),
            Dimension::SubCategory => DimensionValue::SubCategory(s.parse()?),
            Dimension::Region => DimensionValue::Region(s.parse()?),
            Dimension::EnergyScale => DimensionValue::EnergyScale(s.parse()?),
            Dimension::Dataset => DimensionValue::Dataset(s.parse()?),
        })
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Category(v) => v.fmt(f),
            DimensionValue::SubCategory(v) => v.fmt(f),
            DimensionValue::Region(v) => v.fmt(f),
            DimensionValue::EnergyScale(v) => v.fmt(f),
            DimensionValue::Dataset(v) => v.fmt(f),
        }
    }
}

impl From<EventCategory> for DimensionValue {
    fn from(value: EventCategory) -> Self {
        DimensionValue::Category(value)
    }
}

impl From<EventSubCategory> for DimensionValue {
    fn from(value: EventSubCategory) -> Self {
        DimensionValue::SubCategory(value)
    }
}

impl From<EventRegion> for DimensionValue {
    fn from(value: EventRegion) -> Self {
        DimensionValue::Region(value)
    }
}

impl From<EventEnergyScale> for DimensionValue {
    fn from(value: EventEnergyScale) -> Self {
        DimensionValue::EnergyScale(value)
    }
}

impl From<DatasetName> for DimensionValue {
    fn from(value: DatasetName) -> Self {
        DimensionValue::Dataset(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_index_matches_all_order() {
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            assert_eq!(dimension.index(), i);
        }
    }

    #[test]
    fn test_tokens_round_trip_and_are_separator_free() {
        for category in EventCategory::ALL {
            assert!(!category.as_str().contains(SEPARATOR));
            assert_eq!(category.as_str().parse::<EventCategory>(), Ok(*category));
        }
        for scale in EventEnergyScale::ALL {
            assert_ne!(scale.as_str(), WILDCARD);
            assert_eq!(scale.to_string().parse::<EventEnergyScale>(), Ok(*scale));
        }
    }

    #[test]
    fn test_tokens_are_distinct() {
        let mut tokens: Vec<&str> = EventSubCategory::ALL.iter().map(|v| v.as_str()).collect();
        tokens.sort_unstable();
        tokens.dedup();
        assert_eq!(tokens.len(), EventSubCategory::ALL.len());
    }

    #[test]
    fn test_unknown_token_rejected() {
        let err = "OS_Whatever".parse::<EventRegion>().unwrap_err();
        let ValidationError::InvalidValue { field, value, .. } = err;
        assert_eq!(field, "EventRegion");
        assert_eq!(value, "OS_Whatever");
    }

    #[test]
    fn test_dataset_name_validation() {
        assert!(DatasetName::new("DYJets").is_ok());
        assert!(DatasetName::new("").is_err());
        assert!(DatasetName::new("TT/semilep").is_err());
        assert!(DatasetName::new("*").is_err());
    }

    #[test]
    fn test_dataset_name_serde_validates() {
        let ok: DatasetName = serde_json::from_str("\"Data_SingleMuon\"").expect("valid name");
        assert_eq!(ok.as_str(), "Data_SingleMuon");
        assert!(serde_json::from_str::<DatasetName>("\"a/b\"").is_err());
    }

    #[test]
    fn test_dimension_value_reports_dimension() {
        let value: DimensionValue = EventEnergyScale::TauUp.into();
        assert_eq!(value.dimension(), Dimension::EnergyScale);
        assert_eq!(value.to_string(), "TauUp");
    }

    #[test]
    fn test_dimension_value_parse() {
        let value = DimensionValue::parse(Dimension::Category, "2j2b").expect("known token");
        assert_eq!(value, DimensionValue::Category(EventCategory::TwoJetsTwoBtag));
        assert!(DimensionValue::parse(Dimension::Region, "2j2b").is_err());
    }
}
