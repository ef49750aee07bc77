//! Brand → vehicle → setup trees from a setup-sheet index page.
//!
//! An index page opens with an alphabetical "Vehicle" index of in-page
//! links, one per brand. Further down, each brand's section starts at the
//! table row holding the brand's anchor and runs until the next brand's
//! row. Vehicle links inside a section lead to vehicle pages with a setups
//! table, and each setup row may link a driver page with its own sheet.
//!
//! Brands are assembled in three passes:
//!
//! 1. **Row ranges**: the rows between one brand row and the next are
//!    walked with a [`VehicleWalker`].
//! 2. **Forward scan**: a brand whose range produced nothing, whose anchor
//!    shares a row with another brand, or whose anchor is not inside a row
//!    at all is given the links that follow its anchor in document order,
//!    up to the next brand's anchor.
//! 3. **Enrichment**: vehicle pages and driver pages are fetched for
//!    setups and assets.

pub mod index;
pub mod sheet;
pub mod walker;

use std::sync::LazyLock;

use rc_scrape_models::{Brand, Vehicle};
use rc_scrape_scraper::assets::{PageAssets, extract_assets, is_pdf};
use rc_scrape_scraper::dom::{
    element_ancestors, elements_in_order, has_identifier, has_identifier_ignore_case, is_tag,
    lines_of, nearest_ancestor, non_empty, selector, text_of,
};
use rc_scrape_scraper::{Cascade, FetchedPage, PageFetcher, ScrapeError};
use scraper::{ElementRef, Html, Selector};

use crate::progress::ProgressCallback;
use index::{IndexEntry, index_entries};
use sheet::{VehicleSheet, extract_vehicle_sheet};
use walker::{LABEL_TAGS, VehicleWalker};

/// Default number of vehicle pages visited per brand.
pub const DEFAULT_MAX_VEHICLES_PER_BRAND: usize = 25;

/// Elements visited by the forward scan after a brand anchor.
const FORWARD_SCAN_LIMIT: usize = 400;

/// Ancestor levels searched for a label near a link found by the forward scan.
const LABEL_SEARCH_DEPTH: usize = 3;

/// Longest text line accepted as a brand name.
const MAX_NAME_LINE_CHARS: usize = 40;

static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static LARGE_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector("font[size], big, h1, h2, h3, h4"));
static EMPHASIS: LazyLock<Selector> = LazyLock::new(|| selector("b, strong, em"));

/// Parameters for a setup index scrape.
pub struct SetupsConfig<'a> {
    /// Index page URL.
    pub url: &'a str,
    /// Vehicles beyond this count keep empty setup fields.
    pub max_vehicles_per_brand: usize,
    /// Prefix for log messages.
    pub label: &'a str,
}

impl<'a> SetupsConfig<'a> {
    #[must_use]
    pub const fn new(url: &'a str) -> Self {
        Self {
            url,
            max_vehicles_per_brand: DEFAULT_MAX_VEHICLES_PER_BRAND,
            label: "setups",
        }
    }
}

/// A brand's anchor located in the document.
struct Anchored<'e, 'd> {
    entry: &'e IndexEntry,
    marker: Option<ElementRef<'d>>,
    row: Option<usize>,
}

fn containing_row(marker: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if marker.value().name() == "tr" {
        Some(marker)
    } else {
        nearest_ancestor(marker, "tr")
    }
}

/// Finds the anchor of brand `id` and the index of its row in `rows`.
///
/// Exact `id`/`name` matches are preferred; a case-insensitive match is
/// accepted when no exact match sits in a row.
fn locate<'d>(
    elements: &[ElementRef<'d>],
    rows: &[ElementRef<'d>],
    id: &str,
) -> (Option<ElementRef<'d>>, Option<usize>) {
    let exact = elements.iter().copied().filter(|el| has_identifier(*el, id));
    let loose = elements
        .iter()
        .copied()
        .filter(|el| has_identifier_ignore_case(*el, id));

    let in_row = exact.clone().chain(loose.clone()).find_map(|marker| {
        let row = containing_row(marker)?;
        let index = rows.iter().position(|r| r.id() == row.id())?;
        Some((marker, index))
    });

    match in_row {
        Some((marker, index)) => (Some(marker), Some(index)),
        None => (exact.chain(loose).next(), None),
    }
}

/// Sources for a brand's display name.
struct BrandSources<'e, 'd> {
    entry: &'e IndexEntry,
    cell: Option<ElementRef<'d>>,
}

fn is_large_text(el: ElementRef<'_>) -> bool {
    if el.value().name() != "font" {
        return true;
    }
    let size = el.value().attr("size").unwrap_or_default().trim();
    size.starts_with('+') || size.parse::<i32>().is_ok_and(|n| n >= 4)
}

fn looks_like_address(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.contains('@')
        || lower.contains("http")
        || lower.starts_with("tel")
        || line.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn brand_name_cascade<'e, 'd>() -> Cascade<'e, BrandSources<'e, 'd>, String>
where
    'd: 'e,
{
    Cascade::<BrandSources<'e, 'd>, String>::new("brand name")
        .then("index", |src| non_empty(src.entry.name.clone()))
        .then("large text", |src| {
            src.cell?
                .select(&LARGE_TEXT)
                .filter(|el| is_large_text(*el))
                .map(text_of)
                .find(|t| !t.is_empty())
        })
        .then("emphasis", |src| {
            src.cell?
                .select(&EMPHASIS)
                .map(text_of)
                .find(|t| !t.is_empty())
        })
        .then("short line", |src| {
            lines_of(src.cell?)
                .into_iter()
                .find(|l| l.chars().count() <= MAX_NAME_LINE_CHARS && !looks_like_address(l))
        })
        .then("id", |src| non_empty(src.entry.id.clone()))
}

fn brand_cell<'d>(marker: ElementRef<'d>) -> Option<ElementRef<'d>> {
    if is_tag(marker, &["td", "th"]) {
        return Some(marker);
    }
    element_ancestors(marker)
        .find(|a| is_tag(*a, &["td", "th"]))
        .or_else(|| containing_row(marker))
}

/// A label near `link`: the closest preceding bold or italic sibling of the
/// link or of one of its first few ancestors.
fn nearby_label(link: ElementRef<'_>) -> String {
    let mut node = Some(link);
    for _ in 0..LABEL_SEARCH_DEPTH {
        let Some(current) = node else {
            break;
        };
        let label = current
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sib| is_tag(*sib, LABEL_TAGS))
            .map(text_of)
            .find(|t| !t.is_empty());
        if let Some(label) = label {
            return label;
        }
        node = element_ancestors(current).next();
    }
    String::new()
}

/// Collects links that follow `marker` in document order, stopping at the
/// anchor of another brand.
///
/// Anchors are matched ignoring case, the same way [`locate`] accepts them.
fn forward_scan(
    elements: &[ElementRef<'_>],
    marker: ElementRef<'_>,
    own_id: &str,
    brand_ids: &[&str],
    walker: &mut VehicleWalker<'_>,
) {
    let Some(start) = elements.iter().position(|el| el.id() == marker.id()) else {
        return;
    };

    for el in elements[start + 1..].iter().take(FORWARD_SCAN_LIMIT) {
        if brand_ids
            .iter()
            .any(|id| *id != own_id && has_identifier_ignore_case(*el, id))
        {
            break;
        }
        if el.value().name() == "a" {
            walker.record(*el, nearby_label(*el));
        }
    }
}

/// Extracts brands and their vehicles from a setup index page.
///
/// Brands anchored in table rows come first, in document order, followed by
/// the remaining index entries in index order. Vehicle setups are left
/// empty; see [`scrape_setups`].
#[must_use]
pub fn extract_brands(doc: &Html, base: &str) -> Vec<Brand> {
    let entries = index_entries(doc);
    if entries.is_empty() {
        return Vec::new();
    }

    let elements = elements_in_order(doc);
    let rows: Vec<ElementRef<'_>> = doc.select(&ROWS).collect();
    let brand_ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();

    let (mut in_rows, loose): (Vec<Anchored<'_, '_>>, Vec<Anchored<'_, '_>>) = entries
        .iter()
        .map(|entry| {
            let (marker, row) = locate(&elements, &rows, &entry.id);
            Anchored { entry, marker, row }
        })
        .partition(|a| a.row.is_some());
    in_rows.sort_by_key(|a| a.row);

    let names = brand_name_cascade();
    let mut brands = Vec::with_capacity(entries.len());

    for (i, anchored) in in_rows.iter().chain(&loose).enumerate() {
        let mut walker = VehicleWalker::new(base);

        let shares_row = in_rows
            .iter()
            .filter(|other| other.row == anchored.row)
            .nth(1)
            .is_some();

        if let Some(start) = anchored.row.filter(|_| !shares_row) {
            let end = in_rows
                .get(i + 1)
                .and_then(|next| next.row)
                .unwrap_or(rows.len());
            for row in rows.get(start..end).unwrap_or_default() {
                walker.visit_row(*row);
            }
        }

        if walker.is_empty()
            && let Some(marker) = anchored.marker
        {
            forward_scan(&elements, marker, &anchored.entry.id, &brand_ids, &mut walker);
            if !walker.is_empty() {
                log::debug!(
                    "brand {}: {} vehicles from forward scan",
                    anchored.entry.id,
                    walker.len()
                );
            }
        }

        let name = names
            .resolve(&BrandSources {
                entry: anchored.entry,
                cell: anchored.marker.and_then(brand_cell),
            })
            .unwrap_or_default();

        brands.push(Brand {
            id: anchored.entry.id.clone(),
            name,
            vehicles: walker.finish(),
        });
    }

    brands
}

fn read_index(page: &FetchedPage) -> Vec<Brand> {
    extract_brands(&page.document(), &page.url)
}

fn read_sheet(page: &FetchedPage) -> VehicleSheet {
    extract_vehicle_sheet(&page.document(), &page.url)
}

fn read_assets(page: &FetchedPage) -> PageAssets {
    extract_assets(page.document().root_element(), &page.url)
}

/// Fetches a vehicle page and each driver page linked from its setups.
async fn enrich_vehicle<F: PageFetcher + ?Sized>(fetcher: &F, vehicle: &mut Vehicle, label: &str) {
    if vehicle.url.is_empty() {
        return;
    }
    if is_pdf(&vehicle.url) {
        vehicle.setup_url.clone_from(&vehicle.url);
        return;
    }

    let page = match fetcher.fetch(&vehicle.url).await {
        Ok(page) => page,
        Err(e) => {
            log::warn!("{label}: vehicle {} skipped: {e}", vehicle.name);
            return;
        }
    };
    let sheet = read_sheet(&page);
    vehicle.setups = sheet.setups;
    vehicle.setup_url = sheet.assets.pdf.unwrap_or_default();
    vehicle.setup_images = sheet.assets.images;

    for setup in &mut vehicle.setups {
        if setup.driver_url.is_empty() {
            continue;
        }
        match fetcher.fetch(&setup.driver_url).await {
            Ok(page) => {
                let assets = read_assets(&page);
                setup.setup_url = assets.pdf.unwrap_or_default();
                setup.setup_images = assets.images;
            }
            Err(e) => log::warn!("{label}: driver page for {} skipped: {e}", setup.driver),
        }
    }
}

/// Scrapes a setup index page into brands, vehicles and setups.
///
/// # Errors
///
/// Returns [`ScrapeError::Fetch`] if the index page cannot be fetched.
/// Vehicle and driver pages that fail are logged and left empty.
pub async fn scrape_setups<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &SetupsConfig<'_>,
    progress: &dyn ProgressCallback,
) -> Result<Vec<Brand>, ScrapeError> {
    log::info!("{}: fetching index {}", config.label, config.url);
    let page = fetcher.fetch(config.url).await?;
    let mut brands = read_index(&page);

    let vehicle_count: usize = brands.iter().map(|b| b.vehicles.len()).sum();
    log::info!(
        "{}: {} brands, {vehicle_count} vehicles",
        config.label,
        brands.len()
    );

    let to_visit: usize = brands
        .iter()
        .map(|b| b.vehicles.len().min(config.max_vehicles_per_brand))
        .sum();
    progress.set_total(to_visit as u64);

    for brand in &mut brands {
        if brand.vehicles.len() > config.max_vehicles_per_brand {
            log::debug!(
                "{}: {} has {} vehicles, visiting the first {}",
                config.label,
                brand.name,
                brand.vehicles.len(),
                config.max_vehicles_per_brand
            );
        }
        for vehicle in brand
            .vehicles
            .iter_mut()
            .take(config.max_vehicles_per_brand)
        {
            progress.set_message(format!("{} {}", brand.name, vehicle.name));
            enrich_vehicle(fetcher, vehicle, config.label).await;
            progress.inc(1);
        }
    }
    progress.finish(format!("{} brands", brands.len()));

    Ok(brands)
}

#[cfg(test)]
mod tests {
    use rc_scrape_scraper::StaticFetcher;

    use super::*;
    use crate::progress::NullProgress;

    const BASE: &str = "https://setups.test/index.html";

    const INDEX: &str = r##"<html><body>
        <a name="Vehicle"></a>
        <table><tr><td>
          <a href="#Associated">Associated</a> | <a href="#Xray">XRAY</a> |
          <a href="#Mugen">Mugen</a> | <a href="#Ghost">Ghost RC</a>
        </td></tr></table>
        <table>
          <tr><td><a name="Associated"></a><font size="5">Team Associated</font></td></tr>
          <tr><td><b>1/10 Buggy</b><br>
                  <a href="cars/b6.html">B6</a><br>
                  <a href="cars/b6.html">B6</a><br>
                  <a href="cars/b7.pdf">B7</a></td></tr>
          <tr><td><a name="xray"></a><b>XRAY Racing</b></td></tr>
          <tr><td><i>Touring</i> <a href="cars/t4.html">T4</a></td></tr>
        </table>
        <div><a name="Mugen"></a>
          <p><b>1/8 Buggy</b> <a href="cars/mbx8.html">MBX8</a></p>
        </div>
        </body></html>"##;

    #[test]
    fn assembles_brands_from_row_ranges() {
        let doc = Html::parse_document(INDEX);
        let brands = extract_brands(&doc, BASE);

        let ids: Vec<&str> = brands.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["Associated", "Xray", "Mugen", "Ghost"]);

        let associated = &brands[0];
        assert_eq!(associated.name, "Associated");
        let vehicles: Vec<(&str, &str)> = associated
            .vehicles
            .iter()
            .map(|v| (v.name.as_str(), v.vehicle_type.as_str()))
            .collect();
        assert_eq!(vehicles, [("B6", "1/10 Buggy"), ("B7", "1/10 Buggy")]);

        let xray = &brands[1];
        assert_eq!(xray.name, "XRAY");
        assert_eq!(xray.vehicles.len(), 1);
        assert_eq!(xray.vehicles[0].vehicle_type, "Touring");
        assert_eq!(xray.vehicles[0].url, "https://setups.test/cars/t4.html");
    }

    #[test]
    fn brand_outside_rows_uses_forward_scan() {
        let doc = Html::parse_document(INDEX);
        let brands = extract_brands(&doc, BASE);

        let mugen = &brands[2];
        assert_eq!(mugen.vehicles.len(), 1);
        assert_eq!(mugen.vehicles[0].name, "MBX8");
        assert_eq!(mugen.vehicles[0].vehicle_type, "1/8 Buggy");

        let ghost = &brands[3];
        assert_eq!(ghost.name, "Ghost RC");
        assert!(ghost.vehicles.is_empty());
    }

    #[test]
    fn empty_row_range_falls_back_to_forward_scan() {
        let doc = Html::parse_document(
            r##"<div><a href="#A">A</a> <a href="#B">B</a></div>
               <table><tr>
                 <td><a name="A"></a><b>Alpha</b> <a href="a1.html">A1</a></td>
                 <td><a name="B"></a><a href="b1.html">B1</a></td>
               </tr></table>"##,
        );
        let brands = extract_brands(&doc, BASE);

        assert_eq!(brands[0].vehicles.len(), 1);
        assert_eq!(brands[0].vehicles[0].name, "A1");
        assert_eq!(brands[0].vehicles[0].vehicle_type, "Alpha");
        assert_eq!(brands[1].vehicles[0].name, "B1");
    }

    #[test]
    fn forward_scan_stops_at_differently_cased_brand_anchor() {
        let doc = Html::parse_document(
            r##"<div><a href="#A">A</a> <a href="#B">B</a></div>
               <div><a name="A"></a><a href="a1.html">A1</a></div>
               <div><a name="b"></a><a href="b1.html">B1</a></div>"##,
        );
        let brands = extract_brands(&doc, BASE);

        let names = |i: usize| -> Vec<&str> {
            brands[i].vehicles.iter().map(|v| v.name.as_str()).collect()
        };
        assert_eq!(names(0), ["A1"]);
        assert_eq!(names(1), ["B1"]);
    }

    #[test]
    fn brand_name_falls_back_through_cell_text() {
        let entry = IndexEntry {
            id: "tamiya".to_owned(),
            name: String::new(),
        };
        for (html, expected) in [
            (r#"<td><font size="+1">Tamiya</font> <b>Bold</b></td>"#, "Tamiya"),
            (r#"<td><font size="2">tiny</font> <strong>Tamiya Inc</strong></td>"#, "Tamiya Inc"),
            ("<td>http://tamiya.com<br>Tamiya America<br>1 Main St</td>", "Tamiya America"),
            ("<td></td>", "tamiya"),
        ] {
            let doc = Html::parse_document(&format!("<table><tr>{html}</tr></table>"));
            let cell = doc.select(&selector("td")).next();
            let names = brand_name_cascade();
            let name = names.resolve(&BrandSources { entry: &entry, cell });
            assert_eq!(name.as_deref(), Some(expected), "{html}");
        }
    }

    #[test]
    fn page_without_index_has_no_brands() {
        let doc = Html::parse_document("<table><tr><td><a href='x.html'>x</a></td></tr></table>");
        assert!(extract_brands(&doc, BASE).is_empty());
    }

    #[tokio::test]
    async fn scrape_visits_vehicle_and_driver_pages() {
        let fetcher = StaticFetcher::new()
            .with_html(BASE, INDEX)
            .with_html(
                "https://setups.test/cars/b6.html",
                r#"<table>
                     <tr><th>Date</th><th>Driver</th><th>Vehicle</th><th>Event</th>
                         <th>Traction</th><th>Source</th></tr>
                     <tr><td>2024-02-02</td><td><a href="/drivers/1">Sam</a></td><td>B6.4</td>
                         <td>Nats</td><td>High</td><td>Forum</td></tr>
                   </table>
                   <a href="/sheets/b6.pdf">Kit setup</a><img src="b6.png">"#,
            )
            .with_html(
                "https://setups.test/drivers/1",
                r#"<a href="/sheets/sam-b6.pdf">Sheet</a><a href="/photos/sam.jpg">Photo</a>"#,
            );

        let config = SetupsConfig {
            max_vehicles_per_brand: 1,
            ..SetupsConfig::new(BASE)
        };
        let brands = scrape_setups(&fetcher, &config, &NullProgress).await.unwrap();

        let b6 = &brands[0].vehicles[0];
        assert_eq!(b6.setup_url, "https://setups.test/sheets/b6.pdf");
        assert_eq!(b6.setup_images, ["https://setups.test/cars/b6.png"]);
        assert_eq!(b6.setups.len(), 1);
        assert_eq!(b6.setups[0].driver, "Sam");
        assert_eq!(b6.setups[0].setup_url, "https://setups.test/sheets/sam-b6.pdf");
        assert_eq!(
            b6.setups[0].setup_images,
            ["https://setups.test/photos/sam.jpg"]
        );

        // Over the per-brand cap: not visited, fields stay empty.
        let b7 = &brands[0].vehicles[1];
        assert_eq!(b7.setup_url, "");
        assert!(b7.setups.is_empty());

        // T4 page is missing: degrades to empty fields.
        let t4 = &brands[1].vehicles[0];
        assert!(t4.setups.is_empty());
        assert_eq!(t4.setup_url, "");
    }

    #[tokio::test]
    async fn index_fetch_failure_is_an_error() {
        let fetcher = StaticFetcher::new();
        let err = scrape_setups(&fetcher, &SetupsConfig::new(BASE), &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch(_)));
    }
}
