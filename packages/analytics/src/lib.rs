#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical analysis of city-size distributions.
//!
//! Follows the procedure of Clauset, Shalizi & Newman (2009) for discrete
//! data:
//!
//! * [`powerlaw::fit`] scans every candidate cutoff `xmin`, estimates the
//!   exponent of the tail above it, and keeps the cutoff whose fit has the
//!   smallest Kolmogorov-Smirnov distance.
//! * [`bootstrap::test`] draws semi-parametric synthetic samples from the
//!   fitted model, refits each one, and reports the fraction that fit
//!   worse than the data.
//! * [`compare::compare_against_lognormal`] runs a normalized
//!   log-likelihood-ratio test against a lognormal fitted to the same tail.
//!
//! [`analysis::analyze`] chains the three into a flat
//! [`PowerLawSummary`](natural_cities_analytics_models::PowerLawSummary).

pub mod analysis;
pub mod bootstrap;
pub mod cancel;
pub mod ccdf;
pub mod compare;
pub mod describe;
pub mod lognormal;
pub mod optimize;
pub mod powerlaw;
pub mod progress;
pub mod sample;
pub mod special;

use thiserror::Error;

pub use cancel::CancellationToken;
pub use sample::SizeSample;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The sample cannot support a fit (too few distinct values).
    #[error("Insufficient data: {count} values with {distinct} distinct, need at least 2 distinct")]
    InsufficientData {
        /// Number of observations.
        count: usize,
        /// Number of distinct observations.
        distinct: usize,
    },

    /// A value lies outside the positive support of the distribution.
    #[error("Invalid domain: {value} is not a positive finite size")]
    InvalidDomain {
        /// The offending value.
        value: f64,
    },

    /// The operation was cancelled through a [`CancellationToken`].
    #[error("Operation cancelled")]
    Cancelled,

    /// A numerical procedure failed to produce a finite result.
    #[error("Numerical error: {message}")]
    Numerical {
        /// Description of what went wrong.
        message: String,
    },

    /// Refitting a synthetic sample failed.
    #[error("Bootstrap iteration {iteration} failed: {source}")]
    Bootstrap {
        /// Zero-based iteration index.
        iteration: u64,
        /// Underlying failure.
        source: Box<Self>,
    },
}
