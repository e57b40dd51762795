//! Semi-parametric bootstrap goodness-of-fit test.
//!
//! Each iteration builds a synthetic sample the size of the data: values
//! below `xmin` are resampled with replacement from the data, values above
//! it are drawn from the fitted power law. The synthetic sample is refitted
//! from scratch (including the cutoff search) and its KS distance compared
//! with the data's. The p-value is the fraction of synthetic fits that are
//! worse.

use std::sync::Arc;

use natural_cities_analytics_models::{BootstrapResult, PowerLawModel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::powerlaw::{self, FitOptions};
use crate::progress::{ProgressCallback, null_progress};
use crate::{AnalyticsError, CancellationToken, SizeSample};

/// Options for [`test`].
#[derive(Clone)]
pub struct BootstrapOptions {
    /// Number of synthetic samples to draw.
    pub iterations: u64,
    /// Seed shared by all iterations; iteration `i` uses stream `i`.
    pub seed: u64,
    /// Checked before every iteration and inside every refit.
    pub cancel: CancellationToken,
    /// Advanced once per finished iteration.
    pub progress: Arc<dyn ProgressCallback>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            seed: 42,
            cancel: CancellationToken::new(),
            progress: null_progress(),
        }
    }
}

/// Runs the bootstrap test of `model` against `sample`.
///
/// Iterations run on the rayon pool. Iteration `i` draws from a
/// [`ChaCha8Rng`] seeded with `options.seed` on stream `i`, so the result
/// does not depend on scheduling. Synthetic samples are refitted with the
/// model's own estimator.
///
/// With zero iterations nothing is simulated and the p-value is 0. A
/// synthetic sample with fewer than two distinct values cannot be refitted;
/// it counts as not worse and is tallied in
/// [`BootstrapResult::degenerate_fits`].
///
/// # Errors
///
/// * [`AnalyticsError::Cancelled`] if `options.cancel` fires.
/// * [`AnalyticsError::Bootstrap`] if a synthetic refit fails numerically.
pub fn test(
    sample: &SizeSample,
    model: &PowerLawModel,
    options: &BootstrapOptions,
) -> Result<BootstrapResult, AnalyticsError> {
    if options.iterations == 0 {
        return Ok(BootstrapResult::from_counts(0, 0));
    }

    let below = sample.below(model.xmin);
    let n_tail = sample.tail(model.xmin).len();
    let fit_options = FitOptions {
        estimator: model.estimator,
        cancel: options.cancel.clone(),
    };

    log::info!(
        "Bootstrapping {} synthetic samples ({} resampled below xmin={}, {} drawn from the model)",
        options.iterations,
        below.len(),
        model.xmin,
        n_tail
    );
    options.progress.set_total(options.iterations);

    let (worse_fits, degenerate_fits) = (0..options.iterations)
        .into_par_iter()
        .map(|iteration| {
            options.cancel.check()?;

            let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
            rng.set_stream(iteration);

            let mut synthetic = Vec::with_capacity(below.len() + n_tail);
            synthetic.extend((0..below.len()).map(|_| below[rng.gen_range(0..below.len())]));
            synthetic.extend(powerlaw::generate(model, n_tail, &mut rng));
            let synthetic = SizeSample::from_unsorted(synthetic);

            let outcome = match powerlaw::fit(&synthetic, &fit_options) {
                Ok(refit) => (u64::from(refit.ks_distance > model.ks_distance), 0),
                Err(AnalyticsError::InsufficientData { .. }) => (0, 1),
                Err(AnalyticsError::Cancelled) => return Err(AnalyticsError::Cancelled),
                Err(other) => {
                    return Err(AnalyticsError::Bootstrap {
                        iteration,
                        source: Box::new(other),
                    });
                }
            };

            options.progress.inc(1);
            Ok(outcome)
        })
        .try_reduce(|| (0, 0), |a, b| Ok((a.0 + b.0, a.1 + b.1)))?;

    if degenerate_fits > 0 {
        log::warn!(
            "{degenerate_fits}/{} synthetic samples had fewer than two distinct values and count as not worse",
            options.iterations
        );
    }

    let mut result = BootstrapResult::from_counts(worse_fits, options.iterations);
    result.degenerate_fits = degenerate_fits;
    options.progress.finish(format!("p = {:.4}", result.p_value));
    log::info!(
        "Bootstrap: {worse_fits}/{} synthetic fits worse than the data (p = {:.4})",
        options.iterations,
        result.p_value
    );

    Ok(result)
}
