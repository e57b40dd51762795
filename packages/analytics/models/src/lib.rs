#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result records for city-size distribution analysis.
//!
//! Fixed-shape, immutable records produced by the power-law fitter, the
//! bootstrap tester, and the descriptive statistics step. Each record can
//! be flattened into `(field, value)` rows for the two-column CSV export.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How the power-law exponent is estimated for a given cutoff.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Estimator {
    /// Closed-form approximation `1 + n / sum(ln(x / (xmin - 1/2)))`.
    #[default]
    Approximate,
    /// Numerical maximisation of the discrete (Hurwitz zeta) likelihood.
    Exact,
}

/// A fitted discrete power law `p(x) = x^-alpha / zeta(alpha, xmin)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerLawModel {
    /// Smallest value for which the power law holds.
    pub xmin: u64,
    /// Maximum-likelihood scaling exponent (density convention, > 1).
    pub alpha: f64,
    /// Standard error of `alpha`: `(alpha - 1) / sqrt(n_tail)`.
    pub sigma: f64,
    /// Kolmogorov-Smirnov distance between the tail and the model.
    pub ks_distance: f64,
    /// Number of observations `>= xmin`.
    pub n_tail: usize,
    /// Estimator used for `alpha`.
    pub estimator: Estimator,
}

impl PowerLawModel {
    /// The exponent as reported downstream: `alpha - 1`, the exponent of
    /// the complementary cumulative distribution.
    #[must_use]
    pub fn reported_alpha(&self) -> f64 {
        self.alpha - 1.0
    }
}

/// Parameters of a lognormal fitted to the same tail as a power law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LognormalParameters {
    /// Mean of `ln x`.
    pub mu: f64,
    /// Standard deviation of `ln x`.
    pub sigma: f64,
}

/// Likelihood-ratio comparison of a power law against a lognormal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Normalized log-likelihood ratio; positive favors the power law.
    pub loglikelihood_ratio: f64,
    /// Two-sided significance of the sign of the ratio.
    pub p_value: f64,
    /// The fitted alternative.
    pub lognormal: LognormalParameters,
}

/// Outcome of the semi-parametric bootstrap goodness-of-fit test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResult {
    /// Fraction of synthetic samples that fit worse than the data.
    pub p_value: f64,
    /// Number of synthetic samples drawn.
    pub iterations: u64,
    /// Number of synthetic samples whose KS distance exceeded the data's.
    pub worse_fits: u64,
    /// Number of synthetic samples with fewer than two distinct values.
    /// They cannot be refitted and count as not worse.
    #[serde(default)]
    pub degenerate_fits: u64,
}

impl BootstrapResult {
    /// Builds a result from raw counts. The p-value is
    /// `worse_fits / iterations`, or `0` when no iterations ran.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(worse_fits: u64, iterations: u64) -> Self {
        let p_value = if iterations == 0 {
            0.0
        } else {
            worse_fits as f64 / iterations as f64
        };
        Self {
            p_value,
            iterations,
            worse_fits,
            degenerate_fits: 0,
        }
    }
}

/// Flat summary of a full power-law analysis of one size distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerLawSummary {
    /// Fitted cutoff.
    pub xmin: u64,
    /// Reported exponent (`alpha - 1`).
    pub alpha: f64,
    /// Standard error of the exponent.
    pub sigma: f64,
    /// Kolmogorov-Smirnov distance of the fit.
    pub ks_distance: f64,
    /// Bootstrap p-value.
    pub p_value: f64,
    /// Bootstrap iterations requested.
    pub test_iterations: u64,
    /// Significance of the lognormal comparison.
    pub p_lognormal: f64,
    /// Normalized log-likelihood ratio against the lognormal.
    pub r_lognormal: f64,
}

impl PowerLawSummary {
    /// Assembles a summary from its component results.
    #[must_use]
    pub fn new(
        model: &PowerLawModel,
        bootstrap: &BootstrapResult,
        comparison: &ComparisonResult,
    ) -> Self {
        Self {
            xmin: model.xmin,
            alpha: model.reported_alpha(),
            sigma: model.sigma,
            ks_distance: model.ks_distance,
            p_value: bootstrap.p_value,
            test_iterations: bootstrap.iterations,
            p_lognormal: comparison.p_value,
            r_lognormal: comparison.loglikelihood_ratio,
        }
    }

    /// Flattens the summary into `(field, value)` rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("xmin", self.xmin.to_string()),
            ("alpha", self.alpha.to_string()),
            ("sigma", self.sigma.to_string()),
            ("k-s distance", self.ks_distance.to_string()),
            ("p-value", self.p_value.to_string()),
            ("test iterations", self.test_iterations.to_string()),
            ("p-lognormal", self.p_lognormal.to_string()),
            ("r-lognormal", self.r_lognormal.to_string()),
        ]
    }
}

/// Descriptive statistics of a size variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveSummary {
    /// Name of the variable (e.g. `"POBTOT"`).
    pub variable: String,
    /// Number of elements.
    pub count: usize,
    /// Sum of all values.
    pub total: f64,
    /// Largest value.
    pub maximum: f64,
    /// Smallest value.
    pub minimum: f64,
    /// Mean, rounded to the nearest integer.
    pub mean: f64,
    /// Sample standard deviation (n - 1), rounded to the nearest integer.
    pub standard_deviation: f64,
    /// Total area in km², when the elements have geometry.
    pub area_km2: Option<f64>,
}

impl DescriptiveSummary {
    /// Flattens the summary into `(field, value)` rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::with_capacity(8);
        if let Some(area) = self.area_km2 {
            rows.push(("Area", area.to_string()));
        }
        rows.extend([
            ("Variable", self.variable.clone()),
            ("Number_Elements", self.count.to_string()),
            ("Total_Population", self.total.to_string()),
            ("Maximum", self.maximum.to_string()),
            ("Minimum", self.minimum.to_string()),
            ("Mean", self.mean.to_string()),
            ("Standard_Deviation", self.standard_deviation.to_string()),
        ]);
        rows
    }
}

/// One point of a complementary cumulative distribution curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcdfPoint {
    /// Value on the x axis.
    pub value: f64,
    /// `P(X >= value)`.
    pub probability: f64,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    fn model() -> PowerLawModel {
        PowerLawModel {
            xmin: 2500,
            alpha: 2.1,
            sigma: 0.05,
            ks_distance: 0.02,
            n_tail: 484,
            estimator: Estimator::Approximate,
        }
    }

    #[test]
    fn reported_alpha_is_offset_by_one() {
        assert!((model().reported_alpha() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn bootstrap_p_value() {
        let result = BootstrapResult::from_counts(3, 12);
        assert!((result.p_value - 0.25).abs() < 1e-12);
        assert_eq!(result.worse_fits, 3);
        assert_eq!(result.degenerate_fits, 0);

        let empty = BootstrapResult::from_counts(0, 0);
        assert!(empty.p_value.abs() < f64::EPSILON);
        assert_eq!(empty.iterations, 0);
    }

    #[test]
    fn summary_uses_reported_alpha() {
        let comparison = ComparisonResult {
            loglikelihood_ratio: 1.5,
            p_value: 0.13,
            lognormal: LognormalParameters {
                mu: 7.0,
                sigma: 1.2,
            },
        };
        let bootstrap = BootstrapResult::from_counts(1, 1);
        let summary = PowerLawSummary::new(&model(), &bootstrap, &comparison);

        assert_eq!(summary.xmin, 2500);
        assert!((summary.alpha - 1.1).abs() < 1e-12);
        assert!((summary.p_value - 1.0).abs() < 1e-12);

        let rows = summary.to_rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], ("xmin", "2500".to_string()));
        assert_eq!(rows[5], ("test iterations", "1".to_string()));
    }

    #[test]
    fn descriptive_rows_include_area_only_when_known() {
        let mut summary = DescriptiveSummary {
            variable: "POBTOT".to_string(),
            count: 3,
            total: 60.0,
            maximum: 30.0,
            minimum: 10.0,
            mean: 20.0,
            standard_deviation: 10.0,
            area_km2: None,
        };
        assert_eq!(summary.to_rows().len(), 7);
        assert_eq!(summary.to_rows()[0].0, "Variable");

        summary.area_km2 = Some(12.5);
        assert_eq!(summary.to_rows().len(), 8);
        assert_eq!(summary.to_rows()[0], ("Area", "12.5".to_string()));
    }

    #[test]
    fn estimator_parses_and_serializes_snake_case() {
        assert_eq!(Estimator::from_str("exact").unwrap(), Estimator::Exact);
        assert_eq!(Estimator::Approximate.to_string(), "approximate");
        assert_eq!(
            serde_json::to_string(&Estimator::Exact).unwrap(),
            "\"exact\""
        );
        assert_eq!(Estimator::default(), Estimator::Approximate);
    }
}
