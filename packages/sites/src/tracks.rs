//! LiveRC track listing.
//!
//! The landing page is a DataTables table of tracks. Rows either carry a
//! `data-href` (clickable rows) or link the track site from their first
//! cell. The table is usually rendered in full, but when a pagination
//! control is present the extra pages are requested with both a `page=N`
//! and a `start=offset` query, whichever yields new rows first.

use std::sync::LazyLock;

use rc_scrape_models::{Track, TrackRow};
use rc_scrape_scraper::dom::{attr, selector, text_of};
use rc_scrape_scraper::pagination::{page_numbers, page_size};
use rc_scrape_scraper::url::{normalize, with_query};
use rc_scrape_scraper::{
    Cascade, FetchedPage, Harvest, ItemLimit, PageFetcher, PageWalker, ScrapeError,
};
use scraper::{ElementRef, Html, Selector};

use crate::progress::ProgressCallback;
use crate::track_details::scrape_track_details;

/// Default landing page.
pub const DEFAULT_BASE_URL: &str = "https://live.liverc.com/";

/// Default ceiling on listing pages.
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Rows per page when the page-size selector is missing.
const DEFAULT_PAGE_SIZE: u32 = 10;

static ROWS: LazyLock<Selector> =
    LazyLock::new(|| selector("tr.clickable-row, table.track_list tbody tr"));
static PAGINATION: LazyLock<Selector> =
    LazyLock::new(|| selector("#DataTables_Table_0_paginate, .dataTables_paginate"));
static PAGE_SIZE: LazyLock<Selector> =
    LazyLock::new(|| selector("select[name^='DataTables_Table_0_length']"));

/// Parameters for a track listing scrape.
pub struct TrackListConfig<'a> {
    /// Landing page URL.
    pub url: &'a str,
    /// Stop requesting pages once `max_pages × page_size` rows are held.
    pub max_pages: u32,
    /// Cap on returned rows.
    pub max_tracks: ItemLimit,
    /// Prefix for log messages.
    pub label: &'a str,
}

impl<'a> TrackListConfig<'a> {
    /// Listing of `url` with the default page ceiling and no row cap.
    #[must_use]
    pub const fn new(url: &'a str) -> Self {
        Self {
            url,
            max_pages: DEFAULT_MAX_PAGES,
            max_tracks: ItemLimit::UNLIMITED,
            label: "tracks",
        }
    }
}

fn row_link(row: &TrackRow) -> &str {
    &row.link
}

fn first_text(row: ElementRef<'_>, css: &str) -> Option<String> {
    row.select(&selector(css))
        .map(text_of)
        .find(|t| !t.is_empty())
}

fn name_cascade<'d>() -> Cascade<'d, ElementRef<'d>, String> {
    Cascade::<ElementRef<'d>, String>::new("track name")
        .then("anchor strong", |row| first_text(*row, "td a strong"))
        .then("anchor", |row| first_text(*row, "td a"))
        .then("strong", |row| first_text(*row, "strong"))
        .then("row text", |row| Some(text_of(*row)))
}

fn snippet_cascade<'d>() -> Cascade<'d, ElementRef<'d>, String> {
    Cascade::<ElementRef<'d>, String>::new("track snippet")
        .then("indented small", |row| first_text(*row, "td .indent small"))
        .then("second cell small", |row| {
            let cell = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| c.value().name() == "td")
                .nth(1)?;
            first_text(cell, "small")
        })
}

fn link_cascade<'d>() -> Cascade<'d, ElementRef<'d>, String> {
    Cascade::<ElementRef<'d>, String>::new("track link")
        .then("data-href", |row| attr(*row, "data-href").map(str::to_owned))
        .then("first anchor", |row| {
            row.select(&selector("td a, a"))
                .next()
                .and_then(|a| attr(a, "href"))
                .map(str::to_owned)
        })
}

/// Extracts track rows from a listing document.
///
/// Links are resolved against `base`. Rows without a name or a link are
/// skipped.
#[must_use]
pub fn extract_track_rows(doc: &Html, base: &str) -> Vec<TrackRow> {
    let names = name_cascade();
    let snippets = snippet_cascade();
    let links = link_cascade();

    doc.select(&ROWS)
        .filter_map(|row| {
            let link = normalize(&links.resolve_or_default(&row), base);
            let name = names.resolve_or_default(&row);
            if name.is_empty() || link.is_empty() {
                return None;
            }
            Some(TrackRow {
                name,
                link,
                snippet: snippets.resolve_or_default(&row),
            })
        })
        .collect()
}

/// What the first listing page tells us about the rest.
struct FirstPage {
    rows: Vec<TrackRow>,
    pages: Vec<u32>,
    page_size: u32,
}

fn read_first_page(page: &FetchedPage, base: &str) -> FirstPage {
    let doc = page.document();
    FirstPage {
        rows: extract_track_rows(&doc, base),
        pages: page_numbers(&doc, &PAGINATION),
        page_size: page_size(&doc, &PAGE_SIZE, DEFAULT_PAGE_SIZE),
    }
}

/// Scrapes the track listing at `config.url`.
///
/// Rows are deduplicated by link, keep their listing order, and are capped
/// at `config.max_tracks`.
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the landing page cannot be fetched.
/// Failures on later pages are logged and skipped.
pub async fn scrape_tracks<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &TrackListConfig<'_>,
) -> Result<Vec<TrackRow>, ScrapeError> {
    log::info!("{}: fetching {}", config.label, config.url);
    let landing = fetcher.fetch(config.url).await?;
    let first = read_first_page(&landing, config.url);

    let mut harvest = Harvest::new(config.max_tracks, row_link);
    harvest.absorb(first.rows);
    log::info!("{}: {} rows on the landing page", config.label, harvest.len());

    if !first.pages.is_empty() && !harvest.is_full() {
        let page_size = first.page_size;
        let ceiling = usize::try_from(u64::from(config.max_pages) * u64::from(page_size))
            .unwrap_or(usize::MAX);
        log::debug!(
            "{}: pagination offers pages {:?} (page size {page_size})",
            config.label,
            first.pages,
        );

        let walker = PageWalker::new(fetcher, config.label);
        walker
            .follow(
                &first.pages,
                &mut harvest,
                Some(ceiling),
                |page| {
                    let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
                    vec![
                        with_query(config.url, &format!("page={page}")),
                        with_query(config.url, &format!("start={offset}")),
                    ]
                },
                |fetched| extract_track_rows(&fetched.document(), config.url),
            )
            .await;
    }

    let rows = harvest.into_items();
    log::info!("{}: {} tracks", config.label, rows.len());
    Ok(rows)
}

/// Scrapes the listing, then visits every track site for its details.
///
/// A track whose site cannot be fetched keeps its listing fields and gets
/// empty details (feed URLs are still filled in).
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the landing page cannot be fetched.
pub async fn scrape_tracks_with_details<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &TrackListConfig<'_>,
    progress: &dyn ProgressCallback,
) -> Result<Vec<Track>, ScrapeError> {
    let rows = scrape_tracks(fetcher, config).await?;

    progress.set_total(rows.len() as u64);
    let mut tracks = Vec::with_capacity(rows.len());
    for row in rows {
        progress.set_message(row.name.clone());
        let details = scrape_track_details(fetcher, &row.link, config.label).await;
        tracks.push(Track::from_parts(row, details));
        progress.inc(1);
    }
    progress.finish(format!("{} tracks", tracks.len()));

    Ok(tracks)
}
