//! Full power-law analysis of one size distribution.

use std::sync::Arc;

use natural_cities_analytics_models::{
    BootstrapResult, ComparisonResult, Estimator, PowerLawModel, PowerLawSummary,
};

use crate::bootstrap::{self, BootstrapOptions};
use crate::compare::compare_against_lognormal;
use crate::powerlaw::{self, FitOptions};
use crate::progress::{ProgressCallback, null_progress};
use crate::{AnalyticsError, CancellationToken, SizeSample};

/// Options for [`analyze`].
#[derive(Clone)]
pub struct AnalysisOptions {
    /// Exponent estimator.
    pub estimator: Estimator,
    /// Bootstrap iterations.
    pub iterations: u64,
    /// Bootstrap seed.
    pub seed: u64,
    /// Whether to run the bootstrap. When false the p-value is reported as
    /// 0 and `iterations` is still recorded in the summary.
    pub test: bool,
    /// Shared by the fit and the bootstrap.
    pub cancel: CancellationToken,
    /// Bootstrap progress.
    pub progress: Arc<dyn ProgressCallback>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            estimator: Estimator::default(),
            iterations: 1,
            seed: 42,
            test: true,
            cancel: CancellationToken::new(),
            progress: null_progress(),
        }
    }
}

/// Everything [`analyze`] computed.
#[derive(Debug, Clone)]
pub struct PowerLawAnalysis {
    /// The fitted model.
    pub model: PowerLawModel,
    /// Goodness-of-fit test.
    pub bootstrap: BootstrapResult,
    /// Comparison against the lognormal alternative.
    pub comparison: ComparisonResult,
    /// Flat summary for export.
    pub summary: PowerLawSummary,
}

/// Fits a power law to `sample`, tests it, and compares it against a
/// lognormal.
///
/// # Errors
///
/// Propagates any error from [`powerlaw::fit`], [`bootstrap::test`] or
/// [`compare_against_lognormal`].
pub fn analyze(
    sample: &SizeSample,
    options: &AnalysisOptions,
) -> Result<PowerLawAnalysis, AnalyticsError> {
    let model = powerlaw::fit(
        sample,
        &FitOptions {
            estimator: options.estimator,
            cancel: options.cancel.clone(),
        },
    )?;
    log::info!(
        "Power law: xmin={} alpha={:.4} sigma={:.4} D={:.4} ({} of {} values in the tail)",
        model.xmin,
        model.reported_alpha(),
        model.sigma,
        model.ks_distance,
        model.n_tail,
        sample.len()
    );

    let bootstrap = if options.test {
        bootstrap::test(
            sample,
            &model,
            &BootstrapOptions {
                iterations: options.iterations,
                seed: options.seed,
                cancel: options.cancel.clone(),
                progress: options.progress.clone(),
            },
        )?
    } else {
        BootstrapResult {
            p_value: 0.0,
            iterations: options.iterations,
            worse_fits: 0,
            degenerate_fits: 0,
        }
    };

    let comparison = compare_against_lognormal(sample, &model)?;
    log::info!(
        "Lognormal comparison: R={:.4} p={:.4}",
        comparison.loglikelihood_ratio,
        comparison.p_value
    );

    let summary = PowerLawSummary::new(&model, &bootstrap, &comparison);
    Ok(PowerLawAnalysis {
        model,
        bootstrap,
        comparison,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SizeSample {
        SizeSample::from_integers([1, 1, 1, 2, 2, 3, 5, 8, 13, 21, 40, 100, 150, 200, 1000]).unwrap()
    }

    #[test]
    fn untested_analysis_records_iterations_with_zero_p_value() {
        let options = AnalysisOptions {
            iterations: 25,
            test: false,
            ..AnalysisOptions::default()
        };
        let analysis = analyze(&sample(), &options).unwrap();
        assert_eq!(analysis.summary.test_iterations, 25);
        assert!(analysis.summary.p_value.abs() < f64::EPSILON);
        assert_eq!(analysis.summary.xmin, analysis.model.xmin);
        assert!((analysis.summary.alpha - (analysis.model.alpha - 1.0)).abs() < 1e-12);
        assert!(
            (analysis.summary.r_lognormal - analysis.comparison.loglikelihood_ratio).abs() < 1e-12
        );
    }

    #[test]
    fn tested_analysis_is_reproducible() {
        let options = AnalysisOptions {
            iterations: 8,
            seed: 3,
            ..AnalysisOptions::default()
        };
        let first = analyze(&sample(), &options).unwrap();
        let second = analyze(&sample(), &options).unwrap();
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.bootstrap.iterations, 8);
    }

    #[test]
    fn degenerate_sample_fails() {
        let sample = SizeSample::from_integers([7, 7]).unwrap();
        assert!(matches!(
            analyze(&sample, &AnalysisOptions::default()),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }
}
