//! Pagination and result accumulation.
//!
//! [`Harvest`] accumulates items with first-seen deduplication by key and an
//! optional [`ItemLimit`]. [`PageWalker`] follows the page numbers offered by
//! a pagination control, trying a list of candidate URLs per page and
//! keeping the first one that contributes new items.

use std::collections::BTreeSet;

use scraper::{Html, Selector};

use crate::dom::{attr, selector, text_of};
use crate::fetch::{FetchedPage, PageFetcher};

/// An optional ceiling on the number of items a scrape returns.
///
/// Built from a signed value: negative or absent means unlimited, any
/// non-negative value (including zero) is a hard cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemLimit(Option<usize>);

impl ItemLimit {
    /// No ceiling.
    pub const UNLIMITED: Self = Self(None);

    /// Caps results at `n` items.
    #[must_use]
    pub const fn at_most(n: usize) -> Self {
        Self(Some(n))
    }

    /// Interprets a signed limit: negative or `None` is unlimited.
    #[must_use]
    pub fn from_signed(value: Option<i64>) -> Self {
        Self(value.and_then(|v| usize::try_from(v).ok()))
    }

    /// The ceiling, if any.
    #[must_use]
    pub const fn get(self) -> Option<usize> {
        self.0
    }

    /// Whether `count` items satisfy the ceiling.
    #[must_use]
    pub fn is_reached(self, count: usize) -> bool {
        self.0.is_some_and(|max| count >= max)
    }

    /// Truncates `items` to the ceiling.
    pub fn truncate<T>(self, items: &mut Vec<T>) {
        if let Some(max) = self.0 {
            items.truncate(max);
        }
    }
}

/// Extracts the key two items are considered duplicates by.
pub type KeyFn<T> = fn(&T) -> &str;

/// Ordered, deduplicated, optionally capped accumulation of items.
#[derive(Debug, Clone)]
pub struct Harvest<T> {
    items: Vec<T>,
    seen: BTreeSet<String>,
    limit: ItemLimit,
    key: KeyFn<T>,
}

impl<T> Harvest<T> {
    /// Creates an empty harvest deduplicating by `key`.
    #[must_use]
    pub const fn new(limit: ItemLimit, key: KeyFn<T>) -> Self {
        Self {
            items: Vec::new(),
            seen: BTreeSet::new(),
            limit,
            key,
        }
    }

    /// Adds `item` unless its key was seen before or the limit is reached.
    ///
    /// Returns whether the item was added.
    pub fn offer(&mut self, item: T) -> bool {
        if self.is_full() || !self.seen.insert((self.key)(&item).to_owned()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Offers every item in order, stopping once the limit is reached.
    ///
    /// Returns how many items were added.
    pub fn absorb(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        let mut added = 0;
        for item in items {
            if self.is_full() {
                break;
            }
            if self.offer(item) {
                added += 1;
            }
        }
        added
    }

    /// Whether the item limit has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.limit.is_reached(self.items.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the harvest, returning the items truncated to the limit.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        let mut items = self.items;
        self.limit.truncate(&mut items);
        items
    }
}

/// Sorted, deduplicated page numbers linked from the first element matching
/// `control`. Only anchors whose whole text is a number count.
#[must_use]
pub fn page_numbers(doc: &Html, control: &Selector) -> Vec<u32> {
    let anchors = selector("a");

    let Some(container) = doc.select(control).next() else {
        return Vec::new();
    };

    container
        .select(&anchors)
        .filter_map(|a| text_of(a).parse::<u32>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Page size advertised by a `<select>` matching `select`: the value of the
/// selected option, else of the first option, else `default`.
#[must_use]
pub fn page_size(doc: &Html, select: &Selector, default: u32) -> u32 {
    let selected = selector("option[selected]");
    let any = selector("option");

    doc.select(select)
        .next()
        .and_then(|sel| {
            sel.select(&selected)
                .next()
                .or_else(|| sel.select(&any).next())
        })
        .and_then(|opt| attr(opt, "value"))
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

/// Follows additional pages of a paginated listing.
pub struct PageWalker<'a, F: ?Sized> {
    fetcher: &'a F,
    label: &'a str,
}

impl<'a, F: PageFetcher + ?Sized> PageWalker<'a, F> {
    /// Creates a walker that logs under `label`.
    #[must_use]
    pub const fn new(fetcher: &'a F, label: &'a str) -> Self {
        Self { fetcher, label }
    }

    /// Visits every page number above 1 in `pages`.
    ///
    /// For each page, the URLs produced by `candidates` are fetched in order
    /// and the first one whose extracted items add something new to
    /// `harvest` wins; the remaining candidates for that page are skipped.
    /// Failed fetches are logged and skipped. Walking stops once the
    /// harvest is full or holds at least `ceiling` items.
    ///
    /// Returns the number of pages that contributed items.
    pub async fn follow<T, C, E>(
        &self,
        pages: &[u32],
        harvest: &mut Harvest<T>,
        ceiling: Option<usize>,
        candidates: C,
        extract: E,
    ) -> usize
    where
        C: Fn(u32) -> Vec<String>,
        E: Fn(&FetchedPage) -> Vec<T>,
    {
        let mut contributing = 0;

        for &page in pages {
            if page <= 1 {
                continue;
            }
            if harvest.is_full() || ceiling.is_some_and(|c| harvest.len() >= c) {
                log::debug!("{}: item ceiling reached before page {page}", self.label);
                break;
            }

            for candidate in candidates(page) {
                if harvest.is_full() {
                    break;
                }

                let fetched = match self.fetcher.fetch(&candidate).await {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        log::debug!("{}: page {page} candidate failed: {e}", self.label);
                        continue;
                    }
                };

                let added = harvest.absorb(extract(&fetched));
                if added > 0 {
                    log::info!(
                        "{}: page {page} added {added} items from {candidate}",
                        self.label,
                    );
                    contributing += 1;
                    break;
                }
                log::debug!("{}: {candidate} added nothing new", self.label);
            }
        }

        contributing
    }
}
