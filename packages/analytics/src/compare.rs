//! Likelihood-ratio comparison of the power law against a lognormal.

use natural_cities_analytics_models::{ComparisonResult, PowerLawModel};

use crate::special::erfc;
use crate::{AnalyticsError, SizeSample, lognormal, powerlaw};

/// Fits a lognormal to the tail `x >= model.xmin` and compares it with
/// `model` by the normalized log-likelihood ratio of Vuong's test.
///
/// With `R = sum(ln p_pl(x) - ln p_ln(x))` and `s` the standard deviation
/// of the pointwise differences, the reported ratio is `R / (s sqrt(n))`
/// and the p-value is `erfc(|ratio| / sqrt(2))`. A positive ratio favors
/// the power law. When every pointwise difference is equal the test has
/// no power and the result is a ratio of 0 with p-value 1.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if no value is `>= model.xmin`.
/// * [`AnalyticsError::Numerical`] if the lognormal fit fails or the
///   likelihoods are not finite.
pub fn compare_against_lognormal(
    sample: &SizeSample,
    model: &PowerLawModel,
) -> Result<ComparisonResult, AnalyticsError> {
    let tail = sample.tail(model.xmin);
    if tail.is_empty() {
        return Err(AnalyticsError::InsufficientData {
            count: 0,
            distinct: 0,
        });
    }

    let lognormal = lognormal::fit(tail, model.xmin)?;
    let differences: Vec<f64> = powerlaw::log_likelihoods(model, tail)
        .into_iter()
        .zip(lognormal::log_likelihoods(&lognormal, model.xmin, tail))
        .map(|(pl, ln)| pl - ln)
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let n = differences.len() as f64;
    let ratio: f64 = differences.iter().sum();
    if !ratio.is_finite() {
        return Err(AnalyticsError::Numerical {
            message: format!("log-likelihood ratio is not finite (xmin={})", model.xmin),
        });
    }

    let mean = ratio / n;
    let sd = (differences.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();

    let (loglikelihood_ratio, p_value) = if sd <= 1e-12 * mean.abs().max(1.0) {
        (0.0, 1.0)
    } else {
        let normalized = ratio / (sd * n.sqrt());
        (normalized, erfc(normalized.abs() / std::f64::consts::SQRT_2))
    };

    log::debug!(
        "Lognormal comparison at xmin={}: R={loglikelihood_ratio:.4} p={p_value:.4} (mu={:.4}, sigma={:.4})",
        model.xmin,
        lognormal.mu,
        lognormal.sigma
    );

    Ok(ComparisonResult {
        loglikelihood_ratio,
        p_value: p_value.clamp(0.0, 1.0),
        lognormal,
    })
}
