//! Event listings loaded by script.
//!
//! Some events pages ship an empty shell and fetch the listing from an
//! endpoint named in an inline script (`ajax: '/events/list'`) or in a
//! `data-url` attribute. The endpoint is requested page by page and may
//! answer with JSON (an HTML fragment inside an object, or an array of
//! event objects) or with plain HTML.

use std::sync::LazyLock;

use rc_scrape_models::Event;
use rc_scrape_scraper::dom::{attr, selector, text_of};
use rc_scrape_scraper::url::{normalize, with_query_param};
use rc_scrape_scraper::{FetchedPage, Harvest, ItemLimit, PageFetcher};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use super::event_link;

static AJAX_SETTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ajax\s*[:=]\s*['"]([^'"]+)['"]"#).expect("valid regex")
});
static URL_SETTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\s*[:=]\s*['"]([^'"]+)['"]"#).expect("valid regex"));

static SCRIPTS: LazyLock<Selector> = LazyLock::new(|| selector("script"));
static DATA_SOURCES: LazyLock<Selector> =
    LazyLock::new(|| selector("[data-url], [data-href], [data-src]"));
static TABLE_ROWS: LazyLock<Selector> = LazyLock::new(|| selector("table#events tbody tr"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table#events"));
static CONTENT_LINKS: LazyLock<Selector> =
    LazyLock::new(|| selector("main a, #content a, .content a"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a"));

const DATA_ATTRS: &[&str] = &["data-url", "data-href", "data-src"];

/// Finds the listing endpoint named by `doc`, as written (unresolved).
///
/// Inline scripts are searched first: an `ajax` setting wins, else a `url`
/// setting whose value mentions "events". Failing that, the first element
/// with a `data-url`, `data-href` or `data-src` attribute is used.
#[must_use]
pub fn find_ajax_endpoint(doc: &Html) -> Option<String> {
    for script in doc.select(&SCRIPTS) {
        let source: String = script.text().collect();
        if let Some(caps) = AJAX_SETTING.captures(&source) {
            return Some(caps[1].to_owned());
        }
        if let Some(url) = URL_SETTING
            .captures_iter(&source)
            .map(|caps| caps[1].to_owned())
            .find(|url| url.contains("events"))
        {
            return Some(url);
        }
    }

    let el = doc.select(&DATA_SOURCES).next()?;
    DATA_ATTRS
        .iter()
        .find_map(|name| attr(el, name))
        .map(ToOwned::to_owned)
}

fn endpoint_in(body: &str) -> Option<String> {
    find_ajax_endpoint(&Html::parse_document(body))
}

fn linked_event(anchor: ElementRef<'_>, base: &str) -> Option<Event> {
    let title = text_of(anchor);
    let link = normalize(attr(anchor, "href")?, base);
    if title.is_empty() || link.is_empty() {
        return None;
    }
    Some(Event {
        title,
        link,
        ..Event::default()
    })
}

/// Reads events from an HTML listing: the first link of each
/// `table#events` row, or every link in the main content when there is no
/// such table.
#[must_use]
pub fn extract_listing_events(doc: &Html, base: &str) -> Vec<Event> {
    if doc.select(&TABLE).next().is_none() {
        return doc
            .select(&CONTENT_LINKS)
            .filter_map(|a| linked_event(a, base))
            .collect();
    }

    doc.select(&TABLE_ROWS)
        .filter_map(|row| row.select(&LINKS).next())
        .filter_map(|a| linked_event(a, base))
        .collect()
}

fn first_string<'v>(obj: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Reads events from a JSON listing response.
#[must_use]
pub fn events_from_json(value: &Value, base: &str) -> Vec<Event> {
    match value {
        Value::Object(obj) => obj
            .values()
            .filter_map(Value::as_str)
            .find(|s| s.contains("<table"))
            .map(|fragment| extract_listing_events(&Html::parse_fragment(fragment), base))
            .unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| {
                let title = first_string(obj, &["title", "name"])?;
                let link = normalize(first_string(obj, &["link", "url"])?, base);
                (!link.is_empty()).then(|| Event {
                    title: title.to_owned(),
                    link,
                    ..Event::default()
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn read_listing_page(page: &FetchedPage, base: &str) -> Result<Vec<Event>, serde_json::Error> {
    if page.is_json() {
        let value: Value = serde_json::from_str(&page.body)?;
        Ok(events_from_json(&value, base))
    } else {
        Ok(extract_listing_events(&page.document(), base))
    }
}

/// Scrapes an events listing through its script endpoint.
///
/// `first_page` is the already fetched HTML of `base_url`, if any. Pages
/// `1..=max_pages` of the endpoint are requested in order; the walk stops
/// at the first page that adds no new events or fails to load. Never
/// fails: problems are logged and whatever was collected is returned.
pub async fn scrape_events_via_ajax<F: PageFetcher + ?Sized>(
    fetcher: &F,
    base_url: &str,
    first_page: Option<&str>,
    max_pages: u32,
    label: &str,
) -> Vec<Event> {
    let endpoint = match first_page {
        Some(body) => endpoint_in(body),
        None => match fetcher.fetch(base_url).await {
            Ok(page) => endpoint_in(&page.body),
            Err(e) => {
                log::debug!("{label}: could not load {base_url}: {e}");
                return Vec::new();
            }
        },
    };
    let Some(endpoint) = endpoint.map(|e| normalize(&e, base_url)).filter(|e| !e.is_empty())
    else {
        log::debug!("{label}: no listing endpoint found on {base_url}");
        return Vec::new();
    };
    log::info!("{label}: listing endpoint {endpoint}");

    let mut harvest = Harvest::new(ItemLimit::UNLIMITED, event_link);
    for page in 1..=max_pages {
        let url = with_query_param(&endpoint, "page", &page.to_string());
        let fetched = match fetcher.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                log::debug!("{label}: stopping at page {page}: {e}");
                break;
            }
        };
        let events = match read_listing_page(&fetched, base_url) {
            Ok(events) => events,
            Err(e) => {
                log::debug!("{label}: stopping at page {page}, bad JSON: {e}");
                break;
            }
        };
        if harvest.absorb(events) == 0 {
            log::debug!("{label}: page {page} added nothing new");
            break;
        }
    }

    log::info!("{label}: {} events via endpoint", harvest.len());
    harvest.into_items()
}
