//! Complementary cumulative distribution curves for plotting.

use natural_cities_analytics_models::{CcdfPoint, PowerLawModel};

use crate::SizeSample;
use crate::special::hurwitz_zeta;

/// Empirical `P(X >= v)` at every distinct value `v` of the sample, or of
/// its tail when `xmin` is given. Points are in ascending order of value.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn empirical_ccdf(sample: &SizeSample, xmin: Option<u64>) -> Vec<CcdfPoint> {
    let values = xmin.map_or_else(|| sample.values(), |xmin| sample.tail(xmin));
    let n = values.len() as f64;

    let mut points = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if i == 0 || values[i - 1] != v {
            points.push(CcdfPoint {
                value: v as f64,
                probability: (values.len() - i) as f64 / n,
            });
        }
    }
    points
}

/// Model `P(X >= v) = zeta(alpha, v) / zeta(alpha, xmin)` at each distinct
/// value `v >= xmin`, in ascending order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn model_ccdf(model: &PowerLawModel, values: &[u64]) -> Vec<CcdfPoint> {
    let mut values: Vec<u64> = values.iter().copied().filter(|&v| v >= model.xmin).collect();
    values.sort_unstable();
    values.dedup();

    let z_min = hurwitz_zeta(model.alpha, model.xmin as f64);
    values
        .into_iter()
        .map(|v| CcdfPoint {
            value: v as f64,
            probability: hurwitz_zeta(model.alpha, v as f64) / z_min,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use natural_cities_analytics_models::Estimator;

    use super::*;

    #[test]
    fn empirical_curve_starts_at_one_and_decreases() {
        let sample = SizeSample::from_integers([1, 1, 2, 4, 4, 4, 9]).unwrap();
        let curve = empirical_ccdf(&sample, None);

        let values: Vec<f64> = curve.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 4.0, 9.0]);

        let probabilities: Vec<f64> = curve.iter().map(|p| p.probability).collect();
        let expected = [1.0, 5.0 / 7.0, 4.0 / 7.0, 1.0 / 7.0];
        for (got, want) in probabilities.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn empirical_tail_curve_is_renormalized() {
        let sample = SizeSample::from_integers([1, 1, 2, 4, 4, 4, 9]).unwrap();
        let curve = empirical_ccdf(&sample, Some(4));
        assert_eq!(curve.len(), 2);
        assert!((curve[0].probability - 1.0).abs() < 1e-12);
        assert!((curve[1].probability - 0.25).abs() < 1e-12);
    }

    #[test]
    fn model_curve_skips_values_below_cutoff() {
        let model = PowerLawModel {
            xmin: 3,
            alpha: 2.0,
            sigma: 0.1,
            ks_distance: 0.05,
            n_tail: 10,
            estimator: Estimator::Exact,
        };
        let curve = model_ccdf(&model, &[10, 1, 3, 3, 5]);
        let values: Vec<f64> = curve.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 5.0, 10.0]);
        assert!((curve[0].probability - 1.0).abs() < 1e-12);
        assert!(curve.windows(2).all(|w| w[1].probability < w[0].probability));

        // P(X >= 4) = 1 - P(X = 3)
        let p4 = model_ccdf(&model, &[4])[0].probability;
        let p3 = 3.0_f64.powi(-2) / hurwitz_zeta(2.0, 3.0);
        assert!((p4 - (1.0 - p3)).abs() < 1e-12);
    }
}
