//! Discrete size samples.

use crate::AnalyticsError;

/// A sorted multiset of positive integer sizes (e.g. city populations).
///
/// Order of the input is irrelevant; duplicates are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSample {
    values: Vec<u64>,
}

impl SizeSample {
    /// Builds a sample from real-valued sizes.
    ///
    /// Values are rounded to the nearest integer. Values that round below
    /// 1 are dropped with a warning, since the power law has positive
    /// support.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InvalidDomain`] if a value is NaN or infinite,
    ///   or if every value is non-positive.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(values: &[f64]) -> Result<Self, AnalyticsError> {
        let mut kept = Vec::with_capacity(values.len());
        let mut first_rejected = None;
        let mut rejected = 0usize;

        for &value in values {
            if !value.is_finite() {
                return Err(AnalyticsError::InvalidDomain { value });
            }
            let rounded = value.round();
            if rounded < 1.0 {
                rejected += 1;
                first_rejected.get_or_insert(value);
            } else {
                kept.push(rounded as u64);
            }
        }

        if kept.is_empty()
            && let Some(value) = first_rejected
        {
            return Err(AnalyticsError::InvalidDomain { value });
        }

        if rejected > 0 {
            log::warn!("Dropped {rejected} non-positive values from a sample of {}", values.len());
        }

        Ok(Self::from_unsorted(kept))
    }

    /// Builds a sample from integer sizes, dropping zeros.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidDomain`] if every value is zero.
    pub fn from_integers(values: impl IntoIterator<Item = u64>) -> Result<Self, AnalyticsError> {
        let mut saw_zero = false;
        let kept: Vec<u64> = values
            .into_iter()
            .filter(|&v| {
                saw_zero |= v == 0;
                v > 0
            })
            .collect();

        if kept.is_empty() && saw_zero {
            return Err(AnalyticsError::InvalidDomain { value: 0.0 });
        }

        Ok(Self::from_unsorted(kept))
    }

    pub(crate) fn from_unsorted(mut values: Vec<u64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// All values in ascending order.
    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the sample is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct values in ascending order.
    #[must_use]
    pub fn distinct(&self) -> Vec<u64> {
        let mut distinct = self.values.clone();
        distinct.dedup();
        distinct
    }

    /// Values strictly below `xmin`.
    #[must_use]
    pub fn below(&self, xmin: u64) -> &[u64] {
        &self.values[..self.split_at(xmin)]
    }

    /// Values at or above `xmin` (the tail).
    #[must_use]
    pub fn tail(&self, xmin: u64) -> &[u64] {
        &self.values[self.split_at(xmin)..]
    }

    fn split_at(&self, xmin: u64) -> usize {
        self.values.partition_point(|&v| v < xmin)
    }
}
