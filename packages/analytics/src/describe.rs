//! Descriptive statistics of a size variable.

use natural_cities_analytics_models::DescriptiveSummary;

use crate::AnalyticsError;

/// Summarizes `values` of `variable`.
///
/// The mean and the sample standard deviation (n - 1 denominator) are
/// rounded to the nearest integer, ties to even. A single value has an
/// undefined standard deviation, reported as NaN.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if `values` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn describe(
    values: &[f64],
    variable: &str,
    area_km2: Option<f64>,
) -> Result<DescriptiveSummary, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::InsufficientData {
            count: 0,
            distinct: 0,
        });
    }

    let n = values.len() as f64;
    let total: f64 = values.iter().sum();
    let mean = total / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

    let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);

    Ok(DescriptiveSummary {
        variable: variable.to_string(),
        count: values.len(),
        total,
        maximum,
        minimum,
        mean: mean.round_ties_even(),
        standard_deviation: if values.len() > 1 {
            variance.sqrt().round_ties_even()
        } else {
            f64::NAN
        },
        area_km2,
    })
}
