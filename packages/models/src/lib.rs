#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types produced by the rc_scrape site scrapers.
//!
//! Every record serializes all of its fields, even when empty, so that
//! consumers always see a stable shape. Missing strings are `""` and missing
//! collections are `[]`; nothing is ever `null`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which family of records a scrape run produces.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScrapeKind {
    /// Track listing plus per-track detail pages.
    #[default]
    Tracks,
    /// Setup-sheet index: brands, vehicles and setup rows.
    Setups,
    /// Event listing for a single track site.
    Events,
}

// ── Tracks ───────────────────────────────────────────────────────────────

/// One row of the track listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRow {
    /// Display name of the track.
    pub name: String,
    /// Absolute URL of the track site.
    pub link: String,
    /// Short text shown under the name (usually the location).
    pub snippet: String,
}

/// A postal address split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal: String,
    pub country: String,
    /// The address lines as found on the page, minus a leading name line.
    pub raw_lines: Vec<String>,
}

/// Contact and description data read from a track's own site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDetails {
    pub name: String,
    pub address: Address,
    pub phone: String,
    pub website: String,
    pub email: String,
    pub description: String,
    /// `<root>/live/video/`
    pub video_feed: String,
    /// `<root>/live/scoring`
    pub scoring_feed: String,
}

/// A listing row enriched with its detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// Absolute URL of the track site. Never empty.
    pub link: String,
    pub snippet: String,
    pub address: Address,
    pub phone: String,
    pub website: String,
    pub email: String,
    pub description: String,
    pub video_feed: String,
    pub scoring_feed: String,
}

impl Track {
    /// Merges a listing row with the details scraped from its link.
    ///
    /// The listing name wins; the detail page name is only used when the
    /// listing row had none.
    #[must_use]
    pub fn from_parts(row: TrackRow, details: TrackDetails) -> Self {
        let name = if row.name.is_empty() {
            details.name
        } else {
            row.name
        };

        Self {
            name,
            link: row.link,
            snippet: row.snippet,
            address: details.address,
            phone: details.phone,
            website: details.website,
            email: details.email,
            description: details.description,
            video_feed: details.video_feed,
            scoring_feed: details.scoring_feed,
        }
    }
}

// ── Setup sheets ─────────────────────────────────────────────────────────

/// A car manufacturer listed in the setup-sheet index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    /// In-page anchor identifier, unique within the index.
    pub id: String,
    pub name: String,
    pub vehicles: Vec<Vehicle>,
}

/// A single model listed under a brand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    /// Category label the model was listed under (e.g. "1/10 Buggy").
    #[serde(rename = "type")]
    pub vehicle_type: String,
    /// The `href` attribute exactly as found.
    pub href: String,
    /// Absolute form of `href`.
    pub url: String,
    pub setups: Vec<Setup>,
    /// First PDF linked from the vehicle page.
    pub setup_url: String,
    pub setup_images: Vec<String>,
}

/// One row of a vehicle's setup table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
    pub date: String,
    pub driver: String,
    pub driver_url: String,
    pub vehicle: String,
    pub event: String,
    pub composition: String,
    pub traction: String,
    pub layout: String,
    pub source: String,
    /// First PDF linked from the driver page.
    pub setup_url: String,
    pub setup_images: Vec<String>,
}

// ── Events ───────────────────────────────────────────────────────────────

/// A race event on a track site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub link: String,
    /// ISO `YYYY-MM-DD`, or empty when the listing had no readable date.
    pub date: String,
    /// Absolute URL of the entry list page, or empty.
    pub entry_list: String,
    pub classes: Vec<EntryClass>,
}

impl Event {
    /// Iterates over every racer of every class.
    pub fn racers(&self) -> impl Iterator<Item = &Racer> {
        self.classes.iter().flat_map(|c| c.racers.iter())
    }
}

/// A racing class on an entry list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryClass {
    #[serde(rename = "class")]
    pub class_name: String,
    pub racers: Vec<Racer>,
}

/// A driver entered in a class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Racer {
    pub name: String,
    pub transponder: String,
    #[serde(rename = "class")]
    pub class_name: String,
}

/// Result of visiting a single event page and its entry list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntries {
    pub track_name: String,
    pub events: Vec<Event>,
    /// Every racer across all classes, in class order.
    pub racers: Vec<Racer>,
}

impl EventEntries {
    /// Wraps a single event, flattening its racers.
    #[must_use]
    pub fn from_event(event: Event) -> Self {
        let racers = event.racers().cloned().collect();
        Self {
            track_name: String::new(),
            events: vec![event],
            racers,
        }
    }
}

// ── Run envelopes ────────────────────────────────────────────────────────

/// The structure persisted for one scrape run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeEnvelope<T> {
    pub target_id: String,
    pub kind: ScrapeKind,
    pub base_url: String,
    /// Unix timestamp (seconds) at which the run started.
    pub scraped_at: i64,
    pub items_count: usize,
    pub items: Vec<T>,
}

impl<T> ScrapeEnvelope<T> {
    #[must_use]
    pub fn new(
        target_id: &str,
        kind: ScrapeKind,
        base_url: &str,
        scraped_at: i64,
        items: Vec<T>,
    ) -> Self {
        Self {
            target_id: target_id.to_owned(),
            kind,
            base_url: base_url.to_owned(),
            scraped_at,
            items_count: items.len(),
            items,
        }
    }
}

/// What the entry point reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HandlerResponse {
    Ok {
        target_id: String,
        /// Path of the written JSON file, empty if the write failed.
        file: String,
        items_count: usize,
        db_saved: bool,
    },
    Error {
        message: String,
    },
}

impl HandlerResponse {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}
