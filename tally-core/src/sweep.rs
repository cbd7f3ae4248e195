//! Sweep expansion: the cartesian product of per-dimension value sets
//!
//! Sources are consumed in order. Earlier sources vary slowest in the
//! produced sequence, later sources fastest. An empty source empties the
//! whole sweep, and a dimension may only be swept once.

use crate::dimension::{Dimension, DimensionValue};
use crate::error::KeyError;
use crate::key::{AnalysisKey, KeyElement};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasher;

// ============================================================================
// SOURCES
// ============================================================================

/// A collection that can enumerate the values of one dimension.
///
/// Plain collections contribute their items. Maps contribute their keys only,
/// so lookup tables keyed by a dimension value double as sweep domains.
/// Enumeration follows the collection's own iteration order, which for
/// `HashMap` is unspecified.
pub trait SweepSource {
    type Element: KeyElement;

    /// Values contributed by this source, in order.
    fn elements(&self) -> Vec<Self::Element>;
}

impl<T: KeyElement> SweepSource for [T] {
    type Element = T;

    fn elements(&self) -> Vec<T> {
        self.to_vec()
    }
}

impl<T: KeyElement, const N: usize> SweepSource for [T; N] {
    type Element = T;

    fn elements(&self) -> Vec<T> {
        self.to_vec()
    }
}

impl<T: KeyElement> SweepSource for Vec<T> {
    type Element = T;

    fn elements(&self) -> Vec<T> {
        self.clone()
    }
}

impl<T: KeyElement> SweepSource for BTreeSet<T> {
    type Element = T;

    fn elements(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<K: KeyElement, V> SweepSource for BTreeMap<K, V> {
    type Element = K;

    fn elements(&self) -> Vec<K> {
        self.keys().cloned().collect()
    }
}

impl<K: KeyElement, V, S: BuildHasher> SweepSource for HashMap<K, V, S> {
    type Element = K;

    fn elements(&self) -> Vec<K> {
        self.keys().cloned().collect()
    }
}

/// Ordered values of a single dimension, with the element type erased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValues {
    dimension: Dimension,
    values: Vec<DimensionValue>,
}

impl DimensionValues {
    /// Collect values of one dimension type.
    pub fn of<T, I>(values: I) -> Self
    where
        T: KeyElement,
        I: IntoIterator<Item = T>,
    {
        Self {
            dimension: T::DIMENSION,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_source<S: SweepSource + ?Sized>(source: &S) -> Self {
        Self::of(source.elements())
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn values(&self) -> &[DimensionValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// EXPANSION
// ============================================================================

/// Incremental sweep over several dimensions.
///
/// # Example
///
/// ```
/// use tally_core::{EventEnergyScale, EventRegion, Sweep};
///
/// let keys = Sweep::new()
///     .over(&[EventRegion::OsIsolated, EventRegion::SsIsolated])?
///     .over(&vec![EventEnergyScale::Central, EventEnergyScale::TauUp])?
///     .into_keys();
/// assert_eq!(keys.len(), 4);
/// assert_eq!(keys[1].to_string(), "*/*/OS_Isolated/TauUp/*");
/// # Ok::<(), tally_core::KeyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Sweep {
    keys: Vec<AnalysisKey>,
    consumed: [bool; Dimension::COUNT],
}

impl Default for Sweep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sweep {
    /// Sweep seeded with a single empty key.
    pub fn new() -> Self {
        Self::from_key(AnalysisKey::new())
    }

    /// Sweep seeded with `base`. Dimensions already set on `base` count as
    /// swept and cannot be swept again.
    pub fn from_key(base: AnalysisKey) -> Self {
        let mut consumed = [false; Dimension::COUNT];
        for dimension in base.dimensions() {
            consumed[dimension.index()] = true;
        }
        Self {
            keys: vec![base],
            consumed,
        }
    }

    /// Add one level from a typed source.
    pub fn over<S: SweepSource + ?Sized>(self, source: &S) -> Result<Self, KeyError> {
        self.level(DimensionValues::from_source(source))
    }

    /// Add one level: every current key is combined with every value.
    pub fn level(mut self, level: DimensionValues) -> Result<Self, KeyError> {
        let slot = level.dimension.index();
        if self.consumed[slot] {
            return Err(KeyError::DuplicateDimension {
                dimension: level.dimension,
            });
        }
        self.consumed[slot] = true;

        let mut next = Vec::with_capacity(self.keys.len() * level.values.len());
        for partial in &self.keys {
            for value in &level.values {
                next.push(partial.with_value(value.clone()));
            }
        }
        self.keys = next;
        Ok(self)
    }

    /// Number of keys produced so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[AnalysisKey] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<AnalysisKey> {
        self.keys
    }
}

/// Expand the cartesian product of `sources` into keys.
///
/// With no sources the result is the single empty key.
pub fn expand<I>(sources: I) -> Result<Vec<AnalysisKey>, KeyError>
where
    I: IntoIterator<Item = DimensionValues>,
{
    sources
        .into_iter()
        .try_fold(Sweep::new(), Sweep::level)
        .map(Sweep::into_keys)
}
