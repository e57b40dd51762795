//! Progress reporting for long computations.
//!
//! The bootstrap reports one unit per finished synthetic refit. The
//! command line renders progress with `indicatif`; library callers and
//! tests pass [`null_progress`].

use std::sync::Arc;

/// Receives progress updates.
///
/// Bootstrap updates arrive from `rayon` worker threads in no particular
/// order.
pub trait ProgressCallback: Send + Sync {
    /// Total units of work.
    fn set_total(&self, total: u64);

    /// `delta` more units finished.
    fn inc(&self, delta: u64);

    /// Replaces the status line.
    fn set_message(&self, msg: String);

    /// The work completed.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _: u64) {}

    fn inc(&self, _: u64) {}

    fn set_message(&self, _: String) {}

    fn finish(&self, _: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
