#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `rc_scrape` binary.
//!
//! [`PageProgress`] renders scrape progress (track sites visited, vehicle
//! pages fetched) as an `indicatif` bar behind the [`ProgressCallback`]
//! trait. [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge` so log lines never tear a bar mid-redraw.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rc_scrape_sites::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// What a [`PageProgress`] bar counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Track sites visited for contact details.
    TrackSites,
    /// Vehicle pages visited for setup sheets.
    VehiclePages,
    /// Secondary pages of whatever a `run` scrapes.
    Any,
}

impl PageKind {
    /// Prefix shown in front of the bar.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::TrackSites => "Track sites",
            Self::VehiclePages => "Vehicle pages",
            Self::Any => "Pages",
        }
    }

    /// Unit printed after the `pos/len` counter.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::TrackSites => "tracks",
            Self::VehiclePages => "vehicles",
            Self::Any => "pages",
        }
    }
}

/// Template for a bar whose length is known; `{wide_msg}` is the track or
/// vehicle being fetched.
fn counted_template(kind: PageKind) -> String {
    format!(
        "{{prefix:.bold}} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {} {{elapsed:>4}} {{wide_msg:.dim}}",
        kind.unit()
    )
}

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct PageProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl PageProgress {
    /// Creates a bar that spins while the index or listing page loads, then
    /// counts the pages of `kind` as they are visited.
    #[must_use]
    pub fn pages_bar(multi: &MultiProgress, kind: PageKind) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(kind.heading());
        bar.set_message("reading listing");

        let bar_style = ProgressStyle::with_template(&counted_template(kind))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for PageProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
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

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// The level comes from `RUST_LOG`. Returns the [`MultiProgress`] that
/// every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when called twice (tests); keep the first logger.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counted_template_names_the_unit() {
        let template = counted_template(PageKind::VehiclePages);
        assert!(template.contains("{pos}/{len} vehicles"), "{template}");
        assert!(ProgressStyle::with_template(&template).is_ok());
    }

    #[test]
    fn bar_counts_visited_pages() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = PageProgress::pages_bar(&multi, PageKind::TrackSites);
        progress.set_total(3);
        progress.inc(1);
        progress.set_message("Alpha Raceway".to_owned());
        progress.inc(1);
        progress.finish("2 tracks".to_owned());
    }
}
