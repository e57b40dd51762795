//! Discrete power-law fitting.
//!
//! For every candidate cutoff the exponent of the tail above it is
//! estimated by maximum likelihood, and the Kolmogorov-Smirnov distance
//! between the tail and the fitted model is measured. The cutoff with the
//! smallest distance wins (Clauset, Shalizi & Newman 2009, section 3.3).

use natural_cities_analytics_models::{Estimator, PowerLawModel};
use rand::Rng;
use rayon::prelude::*;

use crate::optimize::golden_section;
use crate::special::hurwitz_zeta;
use crate::{AnalyticsError, CancellationToken, SizeSample};

/// Search interval for the exact estimator.
const ALPHA_MIN: f64 = 1.0 + 1e-6;
const ALPHA_MAX: f64 = 20.0;

/// Gaps between consecutive tail values up to this size update the zeta
/// sum term by term instead of re-evaluating it.
const ZETA_STEP_LIMIT: u64 = 32;

/// Largest value the exact sampler searches up to.
const MAX_DRAW: u64 = 1 << 53;

/// Options for [`fit`].
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// How the exponent is estimated for each candidate cutoff.
    pub estimator: Estimator,
    /// Checked before every candidate cutoff.
    pub cancel: CancellationToken,
}

impl FitOptions {
    /// Options with the given estimator and a fresh cancellation token.
    #[must_use]
    pub fn with_estimator(estimator: Estimator) -> Self {
        Self {
            estimator,
            cancel: CancellationToken::new(),
        }
    }
}

/// Fits a discrete power law to `sample`, choosing `xmin` by minimum
/// Kolmogorov-Smirnov distance.
///
/// Every distinct value except the largest is a candidate cutoff, so the
/// tail always holds at least two distinct values. Candidates are
/// evaluated in parallel; ties in distance go to the smaller cutoff.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if the sample has fewer than two
///   distinct values.
/// * [`AnalyticsError::Cancelled`] if `options.cancel` fires.
/// * [`AnalyticsError::Numerical`] if no candidate yields a finite fit.
pub fn fit(sample: &SizeSample, options: &FitOptions) -> Result<PowerLawModel, AnalyticsError> {
    let distinct = sample.distinct();
    if distinct.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            count: sample.len(),
            distinct: distinct.len(),
        });
    }

    let values = sample.values();
    let suffix_ln = suffix_ln_sums(values);
    let candidates = &distinct[..distinct.len() - 1];

    let fits = candidates
        .par_iter()
        .map(|&xmin| {
            options.cancel.check()?;
            let start = values.partition_point(|&v| v < xmin);
            let model = evaluate(&values[start..], suffix_ln[start], options.estimator);
            if let Some(model) = &model {
                log::debug!(
                    "xmin={} alpha={:.4} D={:.5} n_tail={}",
                    model.xmin,
                    model.alpha,
                    model.ks_distance,
                    model.n_tail
                );
            }
            Ok(model)
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    // Candidates are ascending, so keeping only strict improvements gives
    // ties to the smaller cutoff.
    fits.into_iter()
        .flatten()
        .fold(None, |best: Option<PowerLawModel>, model| match best {
            Some(best) if best.ks_distance <= model.ks_distance => Some(best),
            _ => Some(model),
        })
        .ok_or_else(|| AnalyticsError::Numerical {
            message: format!(
                "no finite power-law fit among {} candidate cutoffs",
                candidates.len()
            ),
        })
}

/// Fits the exponent of the tail at a fixed `xmin`.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if no value is `>= xmin`.
/// * [`AnalyticsError::Numerical`] if the estimate is not finite.
pub fn fit_with_xmin(
    sample: &SizeSample,
    xmin: u64,
    estimator: Estimator,
) -> Result<PowerLawModel, AnalyticsError> {
    let tail = sample.tail(xmin);
    if tail.is_empty() {
        return Err(AnalyticsError::InsufficientData {
            count: 0,
            distinct: 0,
        });
    }

    let sum_ln = tail.iter().map(|&v| ln(v)).sum();
    let mut model = evaluate(tail, sum_ln, estimator).ok_or_else(|| AnalyticsError::Numerical {
        message: format!("power-law fit at xmin={xmin} is not finite"),
    })?;
    model.xmin = xmin;
    Ok(model)
}

/// Log-likelihood of each tail observation under `model`:
/// `-alpha ln x - ln zeta(alpha, xmin)`.
#[must_use]
pub fn log_likelihoods(model: &PowerLawModel, tail: &[u64]) -> Vec<f64> {
    let ln_norm = hurwitz_zeta(model.alpha, as_f64(model.xmin)).ln();
    tail.iter()
        .map(|&x| model.alpha.mul_add(-ln(x), -ln_norm))
        .collect()
}

/// Draws `n` values from the fitted discrete power law.
///
/// [`Estimator::Exact`] models are sampled by inverting the exact CDF;
/// [`Estimator::Approximate`] models use the continuous approximation
/// `floor((xmin - 1/2) (1 - r)^(-1 / (alpha - 1)) + 1/2)`.
pub fn generate<R: Rng + ?Sized>(model: &PowerLawModel, n: usize, rng: &mut R) -> Vec<u64> {
    match model.estimator {
        Estimator::Approximate => (0..n).map(|_| draw_approximate(model, rng)).collect(),
        Estimator::Exact => {
            let z_min = hurwitz_zeta(model.alpha, as_f64(model.xmin));
            (0..n).map(|_| draw_exact(model, z_min, rng)).collect()
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_approximate<R: Rng + ?Sized>(model: &PowerLawModel, rng: &mut R) -> u64 {
    let u = 1.0 - rng.r#gen::<f64>();
    let x = (as_f64(model.xmin) - 0.5).mul_add(u.powf(-1.0 / (model.alpha - 1.0)), 0.5);
    (x.floor() as u64).max(model.xmin)
}

/// Smallest `x >= xmin` with `P(X > x) <= 1 - r`.
fn draw_exact<R: Rng + ?Sized>(model: &PowerLawModel, z_min: f64, rng: &mut R) -> u64 {
    let target = (1.0 - rng.r#gen::<f64>()) * z_min;
    let survives = |x: u64| hurwitz_zeta(model.alpha, as_f64(x) + 1.0) > target;

    let mut lo = model.xmin;
    let mut hi = model.xmin;
    while survives(hi) {
        if hi >= MAX_DRAW {
            return MAX_DRAW;
        }
        lo = hi + 1;
        hi = hi.saturating_mul(2).min(MAX_DRAW);
    }

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if survives(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Fits the exponent and distance for one sorted, non-empty tail.
fn evaluate(tail: &[u64], sum_ln: f64, estimator: Estimator) -> Option<PowerLawModel> {
    let xmin = *tail.first()?;
    let n = tail.len();
    let n_f = as_f64_usize(n);

    let alpha = match estimator {
        Estimator::Approximate => 1.0 + n_f / n_f.mul_add(-(as_f64(xmin) - 0.5).ln(), sum_ln),
        Estimator::Exact => {
            let q = as_f64(xmin);
            golden_section(
                |alpha| n_f.mul_add(hurwitz_zeta(alpha, q).ln(), alpha * sum_ln),
                ALPHA_MIN,
                ALPHA_MAX,
                1e-9,
            )
        }
    };
    if !(alpha.is_finite() && alpha > 1.0) {
        return None;
    }

    let ks_distance = ks_distance(tail, alpha);
    if !ks_distance.is_finite() {
        return None;
    }

    Some(PowerLawModel {
        xmin,
        alpha,
        sigma: (alpha - 1.0) / n_f.sqrt(),
        ks_distance,
        n_tail: n,
        estimator,
    })
}

/// Supremum distance between the empirical CDF of `tail` and the discrete
/// power-law CDF with exponent `alpha` and cutoff `tail[0]`.
///
/// Both CDFs are step functions, so the supremum is attained just below
/// or at one of the observed values.
fn ks_distance(tail: &[u64], alpha: f64) -> f64 {
    let n = as_f64_usize(tail.len());
    let xmin = tail[0];
    let z_min = hurwitz_zeta(alpha, as_f64(xmin));

    let mut z = z_min;
    let mut at = xmin;
    let mut distance: f64 = 0.0;
    let mut i = 0;

    while i < tail.len() {
        let v = tail[i];
        let j = i + tail[i..].partition_point(|&x| x == v);

        z = advance_zeta(z, at, v, alpha);
        at = v;

        let model_below = 1.0 - z / z_min;
        let model_at = 1.0 - (z - as_f64(v).powf(-alpha)) / z_min;
        distance = distance
            .max((as_f64_usize(i) / n - model_below).abs())
            .max((as_f64_usize(j) / n - model_at).abs());

        i = j;
    }

    distance
}

/// `zeta(alpha, to)` given `z = zeta(alpha, from)`.
fn advance_zeta(z: f64, from: u64, to: u64, alpha: f64) -> f64 {
    if to - from <= ZETA_STEP_LIMIT {
        (from..to).fold(z, |z, x| z - as_f64(x).powf(-alpha))
    } else {
        hurwitz_zeta(alpha, as_f64(to))
    }
}

/// `suffix[i] = sum(ln values[i..])`, with a trailing zero.
fn suffix_ln_sums(values: &[u64]) -> Vec<f64> {
    let mut suffix = vec![0.0; values.len() + 1];
    for i in (0..values.len()).rev() {
        suffix[i] = suffix[i + 1] + ln(values[i]);
    }
    suffix
}

fn ln(x: u64) -> f64 {
    as_f64(x).ln()
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(x: u64) -> f64 {
    x as f64
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64_usize(x: usize) -> f64 {
    x as f64
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn synthetic(alpha: f64, xmin: u64, n: usize, seed: u64) -> SizeSample {
        let model = PowerLawModel {
            xmin,
            alpha,
            sigma: 0.0,
            ks_distance: 0.0,
            n_tail: n,
            estimator: Estimator::Exact,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        SizeSample::from_integers(generate(&model, n, &mut rng)).unwrap()
    }

    #[test]
    fn recovers_known_exponent_and_cutoff() {
        let sample = synthetic(2.5, 10, 10_000, 7);
        let model = fit(&sample, &FitOptions::with_estimator(Estimator::Exact)).unwrap();

        assert!(
            (model.alpha - 2.5).abs() < 0.1,
            "alpha = {} (xmin = {})",
            model.alpha,
            model.xmin
        );
        assert!(
            (10..=40).contains(&model.xmin),
            "xmin = {} (alpha = {})",
            model.xmin,
            model.alpha
        );
        assert!((model.reported_alpha() - (model.alpha - 1.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_estimate_at_true_cutoff_is_tight() {
        let sample = synthetic(2.5, 10, 10_000, 11);
        let model = fit_with_xmin(&sample, 10, Estimator::Exact).unwrap();
        assert!((model.alpha - 2.5).abs() < 0.06, "alpha = {}", model.alpha);
        assert_eq!(model.n_tail, 10_000);
        assert!(model.ks_distance < 0.03, "D = {}", model.ks_distance);
    }

    #[test]
    fn approximate_estimator_is_close_to_exact_for_moderate_cutoff() {
        let sample = synthetic(2.5, 10, 10_000, 11);
        let exact = fit_with_xmin(&sample, 10, Estimator::Exact).unwrap();
        let approx = fit_with_xmin(&sample, 10, Estimator::Approximate).unwrap();
        assert!(
            (exact.alpha - approx.alpha).abs() < 0.05,
            "exact = {}, approximate = {}",
            exact.alpha,
            approx.alpha
        );
    }

    #[test]
    fn approximate_estimator_matches_closed_form() {
        let sample = SizeSample::from_integers([10, 20, 40]).unwrap();
        let model = fit_with_xmin(&sample, 10, Estimator::Approximate).unwrap();
        let denom: f64 = [10.0_f64, 20.0, 40.0].iter().map(|x| (x / 9.5).ln()).sum();
        let expected = 1.0 + 3.0 / denom;
        assert!((model.alpha - expected).abs() < 1e-12);
        assert!((model.sigma - (expected - 1.0) / 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn small_mixed_sample_fits_without_error() {
        let sample = SizeSample::from_integers([1, 1, 1, 2, 2, 3, 100, 150, 200]).unwrap();
        for estimator in [Estimator::Approximate, Estimator::Exact] {
            let model = fit(&sample, &FitOptions::with_estimator(estimator)).unwrap();
            assert!(sample.distinct().contains(&model.xmin), "xmin = {}", model.xmin);
            assert!(model.alpha > 1.0);
            assert!((0.0..=1.0).contains(&model.ks_distance));
            assert_eq!(model.n_tail, sample.tail(model.xmin).len());
        }
    }

    #[test]
    fn fewer_than_two_distinct_values_is_insufficient() {
        let single = SizeSample::from_integers([5, 5, 5]).unwrap();
        assert!(matches!(
            fit(&single, &FitOptions::default()),
            Err(AnalyticsError::InsufficientData {
                count: 3,
                distinct: 1
            })
        ));

        let empty = SizeSample::from_integers([]).unwrap();
        assert!(matches!(
            fit(&empty, &FitOptions::default()),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn cancelled_token_stops_the_search() {
        let sample = SizeSample::from_integers(1..=100).unwrap();
        let options = FitOptions::default();
        options.cancel.cancel();
        assert!(matches!(fit(&sample, &options), Err(AnalyticsError::Cancelled)));
    }

    #[test]
    fn fixed_cutoff_above_every_value_is_insufficient() {
        let sample = SizeSample::from_integers([1, 2, 3]).unwrap();
        assert!(matches!(
            fit_with_xmin(&sample, 4, Estimator::Approximate),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn generated_values_respect_cutoff_and_seed() {
        for estimator in [Estimator::Approximate, Estimator::Exact] {
            let model = PowerLawModel {
                xmin: 5,
                alpha: 2.2,
                sigma: 0.0,
                ks_distance: 0.0,
                n_tail: 0,
                estimator,
            };
            let a = generate(&model, 500, &mut ChaCha8Rng::seed_from_u64(3));
            let b = generate(&model, 500, &mut ChaCha8Rng::seed_from_u64(3));
            assert_eq!(a, b);
            assert!(a.iter().all(|&x| x >= 5));
            // P(X = xmin) is large for alpha = 2.2, so the cutoff shows up.
            assert!(a.contains(&5));
        }
    }

    #[test]
    fn ks_distance_of_single_value_tail() {
        // One distinct value: empirical CDF jumps 0 -> 1 at xmin while the
        // model only places P(X = xmin) there.
        let alpha = 2.0;
        let d = ks_distance(&[3, 3], alpha);
        let p_xmin = 3.0_f64.powf(-alpha) / hurwitz_zeta(alpha, 3.0);
        assert!((d - (1.0 - p_xmin)).abs() < 1e-12);
    }

    #[test]
    fn advancing_zeta_matches_direct_evaluation() {
        let alpha = 2.3;
        let z10 = hurwitz_zeta(alpha, 10.0);
        for to in [11, 25, 42, 500] {
            let stepped = advance_zeta(z10, 10, to, alpha);
            let direct = hurwitz_zeta(alpha, as_f64(to));
            assert!((stepped - direct).abs() < 1e-12, "to = {to}");
        }
    }
}
