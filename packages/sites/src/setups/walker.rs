//! Vehicle collection over a brand's rows.
//!
//! Setup pages list each brand's models under category labels set in bold
//! or italics ("1/10 Electric Buggy", "1/8 Nitro Truggy"). [`VehicleWalker`]
//! visits the cells in document order, remembering the last label seen and
//! tagging every link that follows with it.

use std::collections::BTreeSet;

use rc_scrape_models::Vehicle;
use rc_scrape_scraper::dom::{attr, is_tag, text_of};
use rc_scrape_scraper::url::{is_navigational, normalize};
use scraper::ElementRef;

/// Tags whose text names a vehicle category.
pub const LABEL_TAGS: &[&str] = &["b", "strong", "em", "i"];

fn contains_link(el: ElementRef<'_>) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| d.value().name() == "a")
}

/// Collects a brand's vehicles while tracking the current category label.
#[derive(Debug)]
pub struct VehicleWalker<'b> {
    base: &'b str,
    current_type: String,
    vehicles: Vec<Vehicle>,
    seen: BTreeSet<String>,
}

impl<'b> VehicleWalker<'b> {
    /// Creates a walker resolving links against `base`.
    #[must_use]
    pub const fn new(base: &'b str) -> Self {
        Self {
            base,
            current_type: String::new(),
            vehicles: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    /// The most recently seen category label.
    #[must_use]
    pub fn current_type(&self) -> &str {
        &self.current_type
    }

    /// Visits the contents of `row`. Nested rows are skipped; they are
    /// visited on their own.
    pub fn visit_row(&mut self, row: ElementRef<'_>) {
        for child in row.children().filter_map(ElementRef::wrap) {
            self.visit(child);
        }
    }

    fn visit(&mut self, el: ElementRef<'_>) {
        match el.value().name() {
            "tr" => {}
            "a" => {
                let label = self.current_type.clone();
                self.record(el, label);
            }
            _ if is_tag(el, LABEL_TAGS) && !contains_link(el) => self.enter_label(el),
            _ => {
                for child in el.children().filter_map(ElementRef::wrap) {
                    self.visit(child);
                }
            }
        }
    }

    fn enter_label(&mut self, el: ElementRef<'_>) {
        let text = text_of(el);
        if !text.is_empty() {
            log::trace!("vehicle type label: {text}");
            self.current_type = text;
        }
    }

    /// Records `link` as a vehicle of type `vehicle_type`.
    ///
    /// Links without text, in-page and script links, and vehicles whose
    /// name or URL was already recorded are ignored. Returns whether the
    /// vehicle was added.
    pub fn record(&mut self, link: ElementRef<'_>, vehicle_type: String) -> bool {
        let Some(href) = attr(link, "href") else {
            return false;
        };
        if !is_navigational(href) {
            return false;
        }
        let name = text_of(link);
        if name.is_empty() {
            return false;
        }

        let url = normalize(href, self.base);
        let name_key = format!("name:{name}");
        let url_key = (!url.is_empty()).then(|| format!("url:{url}"));
        if self.seen.contains(&name_key) || url_key.as_ref().is_some_and(|k| self.seen.contains(k))
        {
            return false;
        }
        self.seen.insert(name_key);
        self.seen.extend(url_key);

        self.vehicles.push(Vehicle {
            name,
            vehicle_type,
            href: href.to_owned(),
            url,
            ..Vehicle::default()
        });
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// The vehicles collected, in first-seen order.
    #[must_use]
    pub fn finish(self) -> Vec<Vehicle> {
        self.vehicles
    }
}
