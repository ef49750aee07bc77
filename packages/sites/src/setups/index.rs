//! The alphabetical "Vehicle" index at the top of a setup page.
//!
//! The index is a block of in-page links (`href="#Associated"`, ...) and is
//! the canonical source of brand ids, names and ordering.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use rc_scrape_scraper::Cascade;
use rc_scrape_scraper::dom::{
    element_ancestors, elements_in_order, has_identifier_ignore_case, is_tag, selector, text_of,
};
use scraper::{ElementRef, Html, Selector};

/// Elements that can hold the index.
const BLOCK_TAGS: &[&str] = &["table", "div", "p", "td"];

static IN_PAGE_LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href^='#']"));

/// One brand listed in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Fragment identifier without the `#`.
    pub id: String,
    /// Link text.
    pub name: String,
}

fn has_in_page_links(el: ElementRef<'_>) -> bool {
    el.select(&IN_PAGE_LINKS).next().is_some()
}

fn is_block_with_links(el: ElementRef<'_>) -> bool {
    is_tag(el, BLOCK_TAGS) && has_in_page_links(el)
}

/// The first candidate that contains no other candidate, preferring tables.
fn innermost<'d>(candidates: &[ElementRef<'d>]) -> Option<ElementRef<'d>> {
    let tables: Vec<ElementRef<'d>> = candidates
        .iter()
        .copied()
        .filter(|c| is_tag(*c, &["table"]))
        .collect();
    let pool = if tables.is_empty() {
        candidates
    } else {
        tables.as_slice()
    };

    pool.iter().copied().find(|outer| {
        !pool
            .iter()
            .any(|inner| inner.id() != outer.id() && inner.ancestors().any(|a| a.id() == outer.id()))
    })
}

#[derive(Clone, Copy)]
struct IndexPage<'s, 'd> {
    elements: &'s [ElementRef<'d>],
}

fn block_cascade<'s, 'd: 's>() -> Cascade<'s, IndexPage<'s, 'd>, ElementRef<'d>> {
    Cascade::<IndexPage<'s, 'd>, ElementRef<'d>>::new("vehicle index")
        .then("identifier", |page| {
            let pos = page
                .elements
                .iter()
                .position(|el| has_identifier_ignore_case(*el, "Vehicle"))?;
            let marker = page.elements[pos];
            if has_in_page_links(marker) {
                return Some(marker);
            }
            element_ancestors(marker)
                .find(|a| is_tag(*a, &["table"]) && has_in_page_links(*a))
                .or_else(|| {
                    let following: Vec<ElementRef<'d>> = page.elements[pos + 1..]
                        .iter()
                        .copied()
                        .filter(|el| is_block_with_links(*el))
                        .collect();
                    innermost(&following)
                })
        })
        .then("vehicle setup text", |page| {
            let candidates: Vec<ElementRef<'d>> = page
                .elements
                .iter()
                .copied()
                .filter(|el| is_block_with_links(*el))
                .filter(|el| {
                    let text = text_of(*el).to_lowercase();
                    text.contains("vehicle") && text.contains("setup")
                })
                .collect();
            innermost(&candidates)
        })
        .then("first link block", |page| {
            let candidates: Vec<ElementRef<'d>> = page
                .elements
                .iter()
                .copied()
                .filter(|el| is_block_with_links(*el))
                .collect();
            innermost(&candidates)
        })
}

/// Locates the index block of `doc`.
#[must_use]
pub fn find_index_block(doc: &Html) -> Option<ElementRef<'_>> {
    let elements = elements_in_order(doc);
    block_cascade().resolve(&IndexPage {
        elements: &elements,
    })
}

/// In-page links of `block` as index entries, first occurrence of each id.
#[must_use]
pub fn entries_in(block: ElementRef<'_>) -> Vec<IndexEntry> {
    let mut seen = BTreeSet::new();
    block
        .select(&IN_PAGE_LINKS)
        .filter_map(|a| {
            let id = a.value().attr("href")?.trim().trim_start_matches('#').trim();
            if id.is_empty() || !seen.insert(id.to_owned()) {
                return None;
            }
            Some(IndexEntry {
                id: id.to_owned(),
                name: text_of(a),
            })
        })
        .collect()
}

/// The brands listed in the index of `doc`, in index order.
#[must_use]
pub fn index_entries(doc: &Html) -> Vec<IndexEntry> {
    find_index_block(doc).map(entries_in).unwrap_or_default()
}
