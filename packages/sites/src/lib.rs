#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Site-specific extractors.
//!
//! Each module pairs synchronous extractors, which turn a parsed
//! [`scraper::Html`] document into owned records, with an async entry point
//! that drives a [`PageFetcher`](rc_scrape_scraper::PageFetcher):
//!
//! - [`tracks`]: the LiveRC track listing, with pagination
//! - [`track_details`]: contact info and description from a track's own site
//! - [`setups`]: brand → vehicle → setup sheet trees from a setup index
//! - [`events`]: event listings, the AJAX listing fallback and entry lists
//!
//! Only the first page of a scrape can fail; every secondary page that cannot
//! be fetched degrades to empty fields and a `log::warn!`.

pub mod dates;
pub mod events;
pub mod progress;
pub mod setups;
pub mod track_details;
pub mod tracks;

pub use rc_scrape_scraper::{FetchError, ItemLimit, ScrapeError};
