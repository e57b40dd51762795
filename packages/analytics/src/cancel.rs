//! Cooperative cancellation for long-running fits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::AnalyticsError;

/// A cloneable flag checked between cutoff candidates and between
/// bootstrap iterations. All clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns [`AnalyticsError::Cancelled`] once cancellation has been
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Cancelled`] if the token was cancelled.
    pub fn check(&self) -> Result<(), AnalyticsError> {
        if self.is_cancelled() {
            Err(AnalyticsError::Cancelled)
        } else {
            Ok(())
        }
    }
}
