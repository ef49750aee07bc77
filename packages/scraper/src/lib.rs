#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generic building blocks for heuristic HTML scrapers.
//!
//! Provides the [`fetch::PageFetcher`] abstraction with an HTTP and an
//! in-memory implementation, URL normalization ([`url`]), ordered fallback
//! chains for field extraction ([`strategy`]), pagination and deduplication
//! helpers ([`pagination`]), DOM text helpers ([`dom`]) and asset link
//! collection ([`assets`]).
//!
//! This crate knows nothing about any particular site. Site-specific rules
//! live in `rc_scrape_sites`.

pub mod assets;
pub mod dom;
pub mod fetch;
pub mod pagination;
pub mod strategy;
pub mod url;

/// Errors raised while retrieving a page.
///
/// Callers that fetch secondary pages catch these and degrade to empty
/// records; only the first page of a scrape surfaces them.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response (timeout, DNS, refused).
    #[error("request to {url} failed: {source}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The HTTP client could not be configured.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Errors returned by top-level scrape entry points.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The page that a scrape starts from could not be fetched.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The page was fetched but could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A JSON body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested scraping mode is not available.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

pub use fetch::{ClientConfig, FetchedPage, HttpFetcher, PageFetcher, StaticFetcher};
pub use pagination::{Harvest, ItemLimit, KeyFn, PageWalker};
pub use strategy::Cascade;
