#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the natural cities binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines do not tear progress bars, and [`IndicatifProgress`] renders
//! the analytics [`ProgressCallback`] as an `indicatif` bar.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use natural_cities_analytics::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Bar shown once the length of the work is known.
const COUNTED_TEMPLATE: &str = "{msg:>28} {wide_bar:.cyan/dim} {pos}/{len} {percent:>3}% [{eta}]";

/// Spinner shown while the length is still unknown.
const WAITING_TEMPLATE: &str = "{spinner:.cyan} {msg}";

/// Renders [`ProgressCallback`] updates on an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Switched to on `set_total()`.
    counted: ProgressStyle,
}

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).map_or_else(|_| fallback(), |s| s.progress_chars("=> "))
}

impl IndicatifProgress {
    /// Bootstrap iterations of one sample. Spins until the bootstrap
    /// reports how many iterations it will run.
    #[must_use]
    pub fn iterations_bar(multi: &MultiProgress, label: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner().with_message(label.to_string()));
        bar.set_style(style(WAITING_TEMPLATE, ProgressStyle::default_spinner));
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(Self {
            bar,
            counted: style(COUNTED_TEMPLATE, ProgressStyle::default_bar),
        })
    }

    /// Stages of a pipeline run.
    #[must_use]
    pub fn stages_bar(multi: &MultiProgress, label: &str, stages: u64) -> Arc<dyn ProgressCallback> {
        let counted = style(COUNTED_TEMPLATE, ProgressStyle::default_bar);
        let bar = multi.add(
            ProgressBar::new(stages)
                .with_style(counted.clone())
                .with_message(label.to_string()),
        );

        Arc::new(Self { bar, counted })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.disable_steady_tick();
        self.bar.set_style(self.counted.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (configured from `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A logger may already be installed (tests).
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
