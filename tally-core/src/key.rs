//! Composite analysis key
//!
//! An [`AnalysisKey`] holds one optional slot per [`Dimension`]. Keys are
//! immutable values: every update returns a new key.
//!
//! # Construction vs. sweeps
//!
//! Building a key from several values silently keeps the last value given for
//! a dimension, while [`expand`](crate::expand) rejects two sources for the
//! same dimension with [`KeyError::DuplicateDimension`]. Both behaviors are
//! kept as they are; callers relying on either should not assume the other.

use crate::dimension::{
    DatasetName, Dimension, DimensionValue, EventCategory, EventEnergyScale, EventRegion,
    EventSubCategory,
};
use crate::error::KeyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendering of an absent slot.
pub const WILDCARD: &str = "*";

/// Separator between rendered slots.
pub const SEPARATOR: char = '/';

/// Composite key over all analysis dimensions.
///
/// Ordering is lexicographic in slot order; within a slot an absent value
/// sorts before every present value.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AnalysisKey {
    category: Option<EventCategory>,
    sub_category: Option<EventSubCategory>,
    region: Option<EventRegion>,
    energy_scale: Option<EventEnergyScale>,
    dataset: Option<DatasetName>,
}

/// A value type that occupies one slot of an [`AnalysisKey`].
///
/// Implemented for every dimension value domain; the slot is selected by
/// the implementing type.
pub trait KeyElement: Clone + Into<DimensionValue> + private::Sealed {
    /// The dimension whose slot this type occupies.
    const DIMENSION: Dimension;

    #[doc(hidden)]
    fn slot(key: &AnalysisKey) -> &Option<Self>;

    #[doc(hidden)]
    fn slot_mut(key: &mut AnalysisKey) -> &mut Option<Self>;
}

mod private {
    pub trait Sealed {}
}

macro_rules! impl_key_element {
    ($ty:ty, $dimension:ident, $field:ident) => {
        impl private::Sealed for $ty {}

        impl KeyElement for $ty {
            const DIMENSION: Dimension = Dimension::$dimension;

            fn slot(key: &AnalysisKey) -> &Option<Self> {
                &key.$field
            }

            fn slot_mut(key: &mut AnalysisKey) -> &mut Option<Self> {
                &mut key.$field
            }
        }
    };
}

impl_key_element!(EventCategory, Category, category);
impl_key_element!(EventSubCategory, SubCategory, sub_category);
impl_key_element!(EventRegion, Region, region);
impl_key_element!(EventEnergyScale, EnergyScale, energy_scale);
impl_key_element!(DatasetName, Dataset, dataset);

impl AnalysisKey {
    /// Key with every slot absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a key from values whose dimensions are inferred from their type.
    ///
    /// A later value replaces an earlier one in the same slot.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DimensionValue>,
    {
        let mut key = Self::new();
        for value in values {
            key.put(value.into());
        }
        key
    }

    /// True iff the slot for `T` is populated.
    pub fn has<T: KeyElement>(&self) -> bool {
        T::slot(self).is_some()
    }

    /// True iff the given dimension's slot is populated.
    pub fn has_dimension(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Category => self.category.is_some(),
            Dimension::SubCategory => self.sub_category.is_some(),
            Dimension::Region => self.region.is_some(),
            Dimension::EnergyScale => self.energy_scale.is_some(),
            Dimension::Dataset => self.dataset.is_some(),
        }
    }

    /// Copy of this key with the slot for `T` overwritten.
    #[must_use]
    pub fn set<T: KeyElement>(&self, value: T) -> Self {
        let mut key = self.clone();
        *T::slot_mut(&mut key) = Some(value);
        key
    }

    /// Copy of this key with the value's slot overwritten.
    #[must_use]
    pub fn with_value(&self, value: impl Into<DimensionValue>) -> Self {
        let mut key = self.clone();
        key.put(value.into());
        key
    }

    /// Copy of this key with the given dimension's slot cleared.
    #[must_use]
    pub fn without(&self, dimension: Dimension) -> Self {
        let mut key = self.clone();
        match dimension {
            Dimension::Category => key.category = None,
            Dimension::SubCategory => key.sub_category = None,
            Dimension::Region => key.region = None,
            Dimension::EnergyScale => key.energy_scale = None,
            Dimension::Dataset => key.dataset = None,
        }
        key
    }

    /// Value in the slot for `T`.
    pub fn get<T: KeyElement>(&self) -> Result<&T, KeyError> {
        T::slot(self)
            .as_ref()
            .ok_or_else(|| KeyError::MissingDimension {
                dimension: T::DIMENSION,
                key: self.clone(),
            })
    }

    /// Value in the given dimension's slot, if any.
    pub fn value(&self, dimension: Dimension) -> Option<DimensionValue> {
        match dimension {
            Dimension::Category => self.category.map(DimensionValue::Category),
            Dimension::SubCategory => self.sub_category.map(DimensionValue::SubCategory),
            Dimension::Region => self.region.map(DimensionValue::Region),
            Dimension::EnergyScale => self.energy_scale.map(DimensionValue::EnergyScale),
            Dimension::Dataset => self.dataset.clone().map(DimensionValue::Dataset),
        }
    }

    /// True iff every slot is populated.
    pub fn is_complete(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.has_dimension(*d))
    }

    /// Populated dimensions in slot order.
    pub fn dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.has_dimension(*d))
            .collect()
    }

    /// Absent dimensions in slot order.
    pub fn missing_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| !self.has_dimension(*d))
            .collect()
    }

    fn put(&mut self, value: DimensionValue) {
        match value {
            DimensionValue::Category(v) => self.category = Some(v),
            DimensionValue::SubCategory(v) => self.sub_category = Some(v),
            DimensionValue::Region(v) => self.region = Some(v),
            DimensionValue::EnergyScale(v) => self.energy_scale = Some(v),
            DimensionValue::Dataset(v) => self.dataset = Some(v),
        }
    }
}

/// Build an [`AnalysisKey`] from values of any dimension types.
///
/// ```
/// use tally_core::{analysis_key, EventEnergyScale, EventRegion};
///
/// let key = analysis_key!(EventRegion::OsIsolated, EventEnergyScale::Central);
/// assert_eq!(key.to_string(), "*/*/OS_Isolated/Central/*");
/// ```
#[macro_export]
macro_rules! analysis_key {
    () => {
        $crate::AnalysisKey::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::AnalysisKey::from_values([$($crate::DimensionValue::from($value)),+])
    };
}

impl fmt::Display for AnalysisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            match self.value(*dimension) {
                Some(value) => write!(f, "{}", value)?,
                None => f.write_str(WILDCARD)?,
            }
        }
        Ok(())
    }
}

impl FromStr for AnalysisKey {
    type Err = KeyError;

    /// Parse the canonical string form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        if parts.len() != Dimension::COUNT {
            return Err(KeyError::Malformed {
                input: s.to_string(),
                reason: format!(
                    "expected {} slots, found {}",
                    Dimension::COUNT,
                    parts.len()
                ),
            });
        }

        let mut key = Self::new();
        for (dimension, part) in Dimension::ALL.into_iter().zip(parts) {
            if part == WILDCARD {
                continue;
            }
            let value = DimensionValue::parse(dimension, part).map_err(|e| KeyError::Malformed {
                input: s.to_string(),
                reason: e.to_string(),
            })?;
            key.put(value);
        }
        Ok(key)
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
