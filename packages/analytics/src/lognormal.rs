//! Discrete lognormal alternative, truncated at the power-law cutoff.
//!
//! Integer `x` takes the lognormal mass of `[x - 1/2, x + 1/2)`, and the
//! distribution is renormalized over `x >= xmin`, so the likelihood is
//! directly comparable with the discrete power law on the same tail.

use natural_cities_analytics_models::LognormalParameters;

use crate::AnalyticsError;
use crate::optimize::{MinimizeOptions, nelder_mead};
use crate::special::{ln_normal_mass, ln_normal_pdf, ln_normal_sf};

/// Bins narrower than this in standard-normal units use the midpoint rule.
const MIDPOINT_WIDTH: f64 = 1e-3;

/// Maximum-likelihood fit of a discrete lognormal to `tail`, truncated
/// below at `xmin`.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if `tail` is empty.
/// * [`AnalyticsError::Numerical`] if the likelihood cannot be maximized.
pub fn fit(tail: &[u64], xmin: u64) -> Result<LognormalParameters, AnalyticsError> {
    if tail.is_empty() {
        return Err(AnalyticsError::InsufficientData {
            count: 0,
            distinct: 0,
        });
    }

    let logs: Vec<f64> = tail.iter().map(|&x| as_f64(x).ln()).collect();
    #[allow(clippy::cast_precision_loss)]
    let n = logs.len() as f64;
    let mean = logs.iter().sum::<f64>() / n;
    let sd = (logs.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n).sqrt();
    let start = [mean, if sd > 0.0 { sd.ln() } else { 0.0 }];

    let nll = |theta: &[f64]| {
        let params = LognormalParameters {
            mu: theta[0],
            sigma: theta[1].exp(),
        };
        let ln_norm = ln_normalizer(&params, xmin);
        let total: f64 = tail.iter().map(|&x| ln_pmf(&params, x, ln_norm)).sum();
        if total.is_finite() { -total } else { f64::INFINITY }
    };

    let options = MinimizeOptions {
        max_iter: 2000,
        f_tol: 1e-9,
        initial_step: 0.1,
    };
    let minimum = nelder_mead(nll, &start, &options).ok_or_else(|| AnalyticsError::Numerical {
        message: "lognormal likelihood is undefined everywhere".to_string(),
    })?;
    if !minimum.fun.is_finite() {
        return Err(AnalyticsError::Numerical {
            message: format!("lognormal likelihood did not reach a finite value (xmin={xmin})"),
        });
    }
    if !minimum.converged {
        log::debug!(
            "Lognormal fit stopped after {} iterations without converging",
            minimum.iterations
        );
    }

    Ok(LognormalParameters {
        mu: minimum.x[0],
        sigma: minimum.x[1].exp(),
    })
}

/// Log-probability of each tail observation under the truncated discrete
/// lognormal.
#[must_use]
pub fn log_likelihoods(params: &LognormalParameters, xmin: u64, tail: &[u64]) -> Vec<f64> {
    let ln_norm = ln_normalizer(params, xmin);
    tail.iter().map(|&x| ln_pmf(params, x, ln_norm)).collect()
}

/// `ln P(Y >= xmin - 1/2)` for the underlying continuous lognormal `Y`.
fn ln_normalizer(params: &LognormalParameters, xmin: u64) -> f64 {
    ln_normal_sf(((as_f64(xmin) - 0.5).ln() - params.mu) / params.sigma)
}

fn ln_pmf(params: &LognormalParameters, x: u64, ln_norm: f64) -> f64 {
    let x = as_f64(x);
    let lo = ((x - 0.5).ln() - params.mu) / params.sigma;
    let hi = ((x + 0.5).ln() - params.mu) / params.sigma;
    let width = hi - lo;

    let ln_mass = if width < MIDPOINT_WIDTH {
        ln_normal_pdf(0.5 * (lo + hi)) + width.ln()
    } else {
        ln_normal_mass(lo, hi)
    };

    ln_mass - ln_norm
}

#[allow(clippy::cast_precision_loss)]
const fn as_f64(x: u64) -> f64 {
    x as f64
}
