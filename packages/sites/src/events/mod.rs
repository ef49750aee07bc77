//! LiveRC event listings.
//!
//! A track's events page renders `table#events` with one row per event:
//! the first cell links the event, the second holds its date as visible
//! text plus an ISO copy in a `span.hidden`. Longer listings paginate with
//! `?page=N`. Sites that load the table from script are handled by
//! [`ajax`]; entry lists behind each event by [`entries`].

pub mod ajax;
pub mod entries;

use std::sync::LazyLock;

use chrono::NaiveDate;
use rc_scrape_models::Event;
use rc_scrape_scraper::dom::{attr, selector, text_of};
use rc_scrape_scraper::pagination::page_numbers;
use rc_scrape_scraper::url::{normalize, with_query_param};
use rc_scrape_scraper::{FetchedPage, Harvest, ItemLimit, PageFetcher, PageWalker, ScrapeError};
use scraper::{ElementRef, Html, Selector};

use crate::dates::{parse_cell_date, parse_iso_date, to_iso};

pub use ajax::{find_ajax_endpoint, scrape_events_via_ajax};
pub use entries::{extract_entry_list, scrape_entry_list, scrape_event_entries};

/// Default number of listing pages read.
pub const DEFAULT_MAX_PAGES: u32 = 1;

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table#events"));
static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tbody tr"));
static CELLS: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static HIDDEN_DATE: LazyLock<Selector> = LazyLock::new(|| selector("span.hidden"));
static PAGINATION: LazyLock<Selector> =
    LazyLock::new(|| selector(".pagination, .dataTables_paginate"));

/// Parameters for an events listing scrape.
pub struct EventsConfig<'a> {
    /// Events page URL.
    pub url: &'a str,
    /// Only keep events dated on or after this `YYYY-MM-DD` date.
    pub since: Option<&'a str>,
    /// Highest listing page followed.
    pub max_pages: u32,
    /// Prefix for log messages.
    pub label: &'a str,
}

impl<'a> EventsConfig<'a> {
    #[must_use]
    pub const fn new(url: &'a str) -> Self {
        Self {
            url,
            since: None,
            max_pages: DEFAULT_MAX_PAGES,
            label: "events",
        }
    }
}

pub(crate) fn event_link(event: &Event) -> &str {
    &event.link
}

/// Parses the `since` cutoff. An unreadable value disables filtering.
fn parse_since(since: Option<&str>, label: &str) -> Option<NaiveDate> {
    let raw = since.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    if parsed.is_none() {
        log::warn!("{label}: ignoring unreadable events_since '{raw}'");
    }
    parsed
}

fn cell_date(cell: ElementRef<'_>) -> Option<NaiveDate> {
    let hidden = cell
        .select(&HIDDEN_DATE)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());
    parse_cell_date(hidden.as_deref(), &text_of(cell))
}

fn event_from_row(row: ElementRef<'_>, base: &str) -> Option<Event> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    let anchor = cells.first()?.select(&LINKS).next()?;

    let title = text_of(anchor);
    let link = normalize(attr(anchor, "href")?, base);
    if title.is_empty() || link.is_empty() {
        return None;
    }

    Some(Event {
        title,
        link,
        date: to_iso(cells.get(1).and_then(|c| cell_date(*c))),
        ..Event::default()
    })
}

/// Reads the rows of `table#events`. Returns `None` if the page has no
/// such table.
#[must_use]
pub fn extract_events(doc: &Html, base: &str) -> Option<Vec<Event>> {
    let table = doc.select(&TABLE).next()?;
    Some(
        table
            .select(&ROWS)
            .filter_map(|row| event_from_row(row, base))
            .collect(),
    )
}

/// Keeps events dated on or after `since`. Undated events are dropped.
pub fn retain_since(events: &mut Vec<Event>, since: NaiveDate) {
    events.retain(|e| parse_iso_date(&e.date).is_some_and(|d| d >= since));
}

struct FirstPage {
    events: Option<Vec<Event>>,
    pages: Vec<u32>,
}

fn read_first_page(page: &FetchedPage, base: &str) -> FirstPage {
    let doc = page.document();
    FirstPage {
        events: extract_events(&doc, base),
        pages: page_numbers(&doc, &PAGINATION),
    }
}

/// An events listing before and after the `since` cutoff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventListing {
    /// Events kept after the cutoff.
    pub events: Vec<Event>,
    /// Distinct events read from `table#events` before the cutoff.
    pub rows_read: usize,
}

async fn read_listing<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &EventsConfig<'_>,
    since: Option<NaiveDate>,
) -> Result<EventListing, ScrapeError> {
    log::info!(
        "{}: fetching {} (since {})",
        config.label,
        config.url,
        since.map_or_else(|| "any date".to_owned(), |d| d.to_string()),
    );

    let landing = fetcher.fetch(config.url).await?;
    let first = read_first_page(&landing, config.url);
    let Some(first_events) = first.events else {
        log::debug!("{}: no table#events at {}", config.label, config.url);
        return Ok(EventListing::default());
    };

    let mut harvest = Harvest::new(ItemLimit::UNLIMITED, event_link);
    harvest.absorb(first_events);

    let pages: Vec<u32> = first
        .pages
        .into_iter()
        .filter(|&p| p <= config.max_pages)
        .collect();
    if pages.iter().any(|&p| p > 1) {
        PageWalker::new(fetcher, config.label)
            .follow(
                &pages,
                &mut harvest,
                None,
                |page| vec![with_query_param(config.url, "page", &page.to_string())],
                |fetched| extract_events(&fetched.document(), config.url).unwrap_or_default(),
            )
            .await;
    }

    let mut events = harvest.into_items();
    let rows_read = events.len();
    if let Some(since) = since {
        retain_since(&mut events, since);
        log::debug!(
            "{}: {} events before {since} or undated dropped",
            config.label,
            rows_read - events.len()
        );
    }

    log::info!("{}: {} events", config.label, events.len());
    Ok(EventListing { events, rows_read })
}

/// Scrapes an events listing.
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the first listing page cannot be
/// fetched. Later pages that fail are skipped.
pub async fn scrape_events<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &EventsConfig<'_>,
) -> Result<Vec<Event>, ScrapeError> {
    let since = parse_since(config.since, config.label);
    Ok(read_listing(fetcher, config, since).await?.events)
}

/// Scrapes an events listing, reading the script endpoint instead when the
/// page has no `table#events` rows at all.
///
/// A listing whose rows were all dropped by the `since` cutoff does not
/// fall back. Script results are held to the same cutoff, so with `since`
/// set their undated entries are dropped.
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the first listing page cannot be
/// fetched.
pub async fn scrape_events_or_ajax<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &EventsConfig<'_>,
) -> Result<Vec<Event>, ScrapeError> {
    let since = parse_since(config.since, config.label);
    let listing = read_listing(fetcher, config, since).await?;
    if listing.rows_read > 0 {
        return Ok(listing.events);
    }

    log::info!("{}: listing table empty, trying script endpoint", config.label);
    let mut events =
        scrape_events_via_ajax(fetcher, config.url, None, config.max_pages, config.label).await;
    if let Some(since) = since {
        retain_since(&mut events, since);
    }
    Ok(events)
}

/// Listing scrape for pages that only render their table in a browser.
///
/// # Errors
///
/// Always returns [`ScrapeError::Unsupported`]; script-driven pages are
/// not rendered.
pub fn scrape_events_with_browser(url: &str) -> Result<Vec<Event>, ScrapeError> {
    log::warn!("browser rendering requested for {url}");
    Err(ScrapeError::Unsupported(
        "JavaScript rendering is not implemented".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use rc_scrape_scraper::StaticFetcher;

    use super::*;

    const URL: &str = "https://track.liverc.com/events/";

    fn listing(rows: &[(&str, &str, &str)], pagination: &str) -> String {
        let body: String = rows
            .iter()
            .map(|(title, href, date)| {
                format!(
                    r#"<tr><td><a href="{href}">{title}</a></td><td>{date}</td>
                         <td>40</td><td>31</td></tr>"#
                )
            })
            .collect();
        format!(
            r#"<html><body><table id="events"><thead><tr><th>Event</th><th>Date</th></tr></thead>
               <tbody>{body}</tbody></table>{pagination}</body></html>"#
        )
    }

    #[test]
    fn reads_title_link_and_date() {
        let doc = Html::parse_document(&listing(
            &[
                (
                    "Winter Series Rd 1",
                    "/results/?p=view_event&id=1",
                    r#"<span class="hidden">2024-01-13 09:00:00</span>Jan 13, 2024"#,
                ),
                ("Summer Nats", "/results/?p=view_event&id=2", "July 4, 2023"),
                ("Club Race", "/results/?p=view_event&id=3", "soon"),
                ("", "/results/?p=view_event&id=4", "Jan 1, 2024"),
            ],
            "",
        ));
        let events = extract_events(&doc, URL).unwrap();

        let summary: Vec<(&str, &str, &str)> = events
            .iter()
            .map(|e| (e.title.as_str(), e.link.as_str(), e.date.as_str()))
            .collect();
        assert_eq!(
            summary,
            [
                (
                    "Winter Series Rd 1",
                    "https://track.liverc.com/results/?p=view_event&id=1",
                    "2024-01-13"
                ),
                (
                    "Summer Nats",
                    "https://track.liverc.com/results/?p=view_event&id=2",
                    "2023-07-04"
                ),
                (
                    "Club Race",
                    "https://track.liverc.com/results/?p=view_event&id=3",
                    ""
                ),
            ]
        );
    }

    #[test]
    fn page_without_events_table_is_none() {
        let doc = Html::parse_document("<table><tbody><tr><td><a href='x'>x</a></td></tr></tbody></table>");
        assert!(extract_events(&doc, URL).is_none());
    }

    #[tokio::test]
    async fn since_excludes_older_and_undated_events() {
        let fetcher = StaticFetcher::new().with_html(
            URL,
            &listing(
                &[
                    ("New Year", "/e/1", "Jan 1, 2024"),
                    ("Eve", "/e/2", r#"<span class="hidden">2023-12-31</span>Dec 31, 2023"#),
                    ("Undated", "/e/3", "TBD"),
                    ("Spring", "/e/4", "2024-03-02"),
                ],
                "",
            ),
        );
        let config = EventsConfig {
            since: Some("2024-01-01"),
            ..EventsConfig::new(URL)
        };
        let events = scrape_events(&fetcher, &config).await.unwrap();

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["New Year", "Spring"]);
    }

    #[tokio::test]
    async fn unreadable_since_disables_filtering() {
        let fetcher = StaticFetcher::new()
            .with_html(URL, &listing(&[("Undated", "/e/3", "TBD")], ""));
        let config = EventsConfig {
            since: Some("last tuesday"),
            ..EventsConfig::new(URL)
        };
        assert_eq!(scrape_events(&fetcher, &config).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn follows_pages_up_to_max_pages() {
        let pagination = r#"<ul class="pagination"><li><a href="?page=1">1</a></li>
                              <li><a href="?page=2">2</a></li><li><a href="?page=3">3</a></li></ul>"#;
        let fetcher = StaticFetcher::new()
            .with_html(URL, &listing(&[("A", "/e/1", "")], pagination))
            .with_html(
                "https://track.liverc.com/events/?page=2",
                &listing(&[("A", "/e/1", ""), ("B", "/e/2", "")], pagination),
            )
            .with_html(
                "https://track.liverc.com/events/?page=3",
                &listing(&[("C", "/e/3", "")], pagination),
            );
        let config = EventsConfig {
            max_pages: 2,
            ..EventsConfig::new(URL)
        };
        let events = scrape_events(&fetcher, &config).await.unwrap();

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
        assert!(
            !fetcher
                .requests()
                .contains(&"https://track.liverc.com/events/?page=3".to_owned())
        );
    }

    #[tokio::test]
    async fn missing_table_gives_no_events() {
        let fetcher = StaticFetcher::new().with_html(URL, "<p>Coming soon</p>");
        let events = scrape_events(&fetcher, &EventsConfig::new(URL)).await.unwrap();
        assert!(events.is_empty());
    }

    const SCRIPT: &str = r"<script>$('#events').DataTable({ ajax: '/events/data' });</script>";
    const DATA: &str = "https://track.liverc.com/events/data?page=1";
    const DATA_REPLY: &str = r#"[{"title": "Old Race", "link": "/e/1"}]"#;

    #[tokio::test]
    async fn rows_dropped_by_since_do_not_trigger_script_fallback() {
        let page = listing(&[("Summer", "/e/9", "2023-06-01")], SCRIPT);
        let fetcher = StaticFetcher::new()
            .with_html(URL, &page)
            .with_json(DATA, DATA_REPLY);
        let config = EventsConfig {
            since: Some("2024-01-01"),
            ..EventsConfig::new(URL)
        };

        let events = scrape_events_or_ajax(&fetcher, &config).await.unwrap();

        assert!(events.is_empty());
        assert!(!fetcher.requests().contains(&DATA.to_owned()));
    }

    #[tokio::test]
    async fn script_fallback_keeps_since_cutoff() {
        let fetcher = StaticFetcher::new()
            .with_html(URL, SCRIPT)
            .with_json(DATA, DATA_REPLY);

        let unfiltered = scrape_events_or_ajax(&fetcher, &EventsConfig::new(URL))
            .await
            .unwrap();
        assert_eq!(unfiltered.len(), 1);

        let config = EventsConfig {
            since: Some("2024-01-01"),
            ..EventsConfig::new(URL)
        };
        assert!(scrape_events_or_ajax(&fetcher, &config).await.unwrap().is_empty());
    }

    #[test]
    fn browser_rendering_is_unsupported() {
        let err = scrape_events_with_browser(URL).unwrap_err();
        assert!(matches!(err, ScrapeError::Unsupported(_)));
        assert_eq!(err.to_string(), "Unsupported: JavaScript rendering is not implemented");
    }
}
