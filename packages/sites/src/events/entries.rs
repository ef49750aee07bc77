//! Entry lists: the racers registered for an event, by class.
//!
//! An entry list page holds one `.tab-pane` per class. Each pane names its
//! class in a `.class_header` or, failing that, through the nav pill that
//! targets the pane's id.

use std::sync::LazyLock;

use rc_scrape_models::{EntryClass, Event, EventEntries, Racer};
use rc_scrape_scraper::dom::{attr, selector, text_of};
use rc_scrape_scraper::url::normalize;
use rc_scrape_scraper::{Cascade, FetchedPage, PageFetcher, ScrapeError};
use scraper::{ElementRef, Html, Selector};

static PANES: LazyLock<Selector> = LazyLock::new(|| selector(".tab-pane"));
static CLASS_HEADER: LazyLock<Selector> = LazyLock::new(|| selector(".class_header"));
static NAV_PILLS: LazyLock<Selector> = LazyLock::new(|| selector(".nav-pills a[href]"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static BODY_ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tbody tr"));
static DATA_CELLS: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static ANY_CELLS: LazyLock<Selector> = LazyLock::new(|| selector("td, th"));
static ENTRY_ROW: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"tr.clickable-row[data-href*="view_entry_list"]"#));
static ENTRY_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"a[href*="view_entry_list"]"#));

#[derive(Clone, Copy)]
struct Pane<'d> {
    doc: &'d Html,
    pane: ElementRef<'d>,
}

fn class_name_cascade<'d>() -> Cascade<'d, Pane<'d>, String> {
    Cascade::<Pane<'d>, String>::new("class name")
        .then("header", |p| {
            p.pane
                .select(&CLASS_HEADER)
                .next()
                .map(text_of)
                .filter(|t| !t.is_empty())
        })
        .then("nav pill", |p| {
            let target = format!("#{}", p.pane.value().id()?);
            p.doc
                .select(&NAV_PILLS)
                .find(|a| attr(*a, "href") == Some(target.as_str()))
                .map(text_of)
        })
}

fn racer_from_row(row: ElementRef<'_>, class_name: &str) -> Option<Racer> {
    let tds: Vec<ElementRef<'_>> = row.select(&DATA_CELLS).collect();
    let (name, transponder) = if tds.len() >= 3 {
        (text_of(tds[1]), text_of(tds[2]))
    } else {
        let texts: Vec<String> = row.select(&ANY_CELLS).map(text_of).collect();
        if texts.len() < 2 {
            return None;
        }
        (texts[1].clone(), texts.get(2).cloned().unwrap_or_default())
    };

    Some(Racer {
        name,
        transponder,
        class_name: class_name.to_owned(),
    })
}

/// Reads every class of an entry list page. Panes without a table are
/// skipped.
#[must_use]
pub fn extract_entry_list(doc: &Html) -> Vec<EntryClass> {
    let names = class_name_cascade();

    doc.select(&PANES)
        .filter_map(|pane| {
            let table = pane.select(&TABLE).next()?;
            let class_name = names.resolve_or_default(&Pane { doc, pane });
            let racers = table
                .select(&BODY_ROWS)
                .filter_map(|row| racer_from_row(row, &class_name))
                .collect();
            Some(EntryClass { class_name, racers })
        })
        .collect()
}

/// The entry list link of an event page, as written.
#[must_use]
pub fn entry_list_href(doc: &Html) -> Option<String> {
    doc.select(&ENTRY_ROW)
        .find_map(|row| attr(row, "data-href"))
        .or_else(|| doc.select(&ENTRY_LINK).find_map(|a| attr(a, "href")))
        .map(ToOwned::to_owned)
}

fn read_entry_list(page: &FetchedPage) -> Vec<EntryClass> {
    extract_entry_list(&page.document())
}

fn read_entry_href(page: &FetchedPage) -> Option<String> {
    entry_list_href(&page.document())
}

/// Scrapes an entry list page.
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the page cannot be fetched.
pub async fn scrape_entry_list<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    label: &str,
) -> Result<Vec<EntryClass>, ScrapeError> {
    log::info!("{label}: entry list {url}");
    let page = fetcher.fetch(url).await?;
    let classes = read_entry_list(&page);
    log::info!("{label}: {} classes", classes.len());
    Ok(classes)
}

/// Visits an event page, follows its entry list link and collects the
/// racers.
///
/// An event page without an entry list link, or whose entry list cannot be
/// fetched, yields the event with no classes.
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the event page cannot be fetched.
pub async fn scrape_event_entries<F: PageFetcher + ?Sized>(
    fetcher: &F,
    title: &str,
    url: &str,
    label: &str,
) -> Result<EventEntries, ScrapeError> {
    log::info!("{label}: event {url}");
    let page = fetcher.fetch(url).await?;

    let mut event = Event {
        title: title.to_owned(),
        link: url.to_owned(),
        ..Event::default()
    };

    let Some(href) = read_entry_href(&page) else {
        log::warn!("{label}: no entry list link on {url}");
        return Ok(EventEntries::from_event(event));
    };

    event.entry_list = normalize(&href, url);
    match scrape_entry_list(fetcher, &event.entry_list, label).await {
        Ok(classes) => event.classes = classes,
        Err(e) => log::warn!("{label}: entry list for '{title}' skipped: {e}"),
    }

    let entries = EventEntries::from_event(event);
    log::info!("{label}: {} racers for '{title}'", entries.racers.len());
    Ok(entries)
}
