//! A vehicle's page: its table of submitted setups and attached files.

use std::sync::LazyLock;

use rc_scrape_models::Setup;
use rc_scrape_scraper::assets::{PageAssets, extract_assets};
use rc_scrape_scraper::dom::{attr, nearest_ancestor, selector, text_of};
use rc_scrape_scraper::url::normalize;
use scraper::{ElementRef, Html, Selector};

static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tr"));

/// Setup table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Driver,
    Vehicle,
    Event,
    Composition,
    Layout,
    Traction,
    Source,
}

static FULL_LAYOUT: [Column; 8] = [
    Column::Date,
    Column::Driver,
    Column::Vehicle,
    Column::Event,
    Column::Composition,
    Column::Layout,
    Column::Traction,
    Column::Source,
];

static NO_LAYOUT: [Column; 7] = [
    Column::Date,
    Column::Driver,
    Column::Vehicle,
    Column::Event,
    Column::Composition,
    Column::Traction,
    Column::Source,
];

static NO_SURFACE: [Column; 6] = [
    Column::Date,
    Column::Driver,
    Column::Vehicle,
    Column::Event,
    Column::Traction,
    Column::Source,
];

/// Column order for a row with `cells` cells.
fn columns_for(cells: usize) -> &'static [Column] {
    match cells {
        8.. => &FULL_LAYOUT,
        7 => &NO_LAYOUT,
        6 => &NO_SURFACE,
        n => &FULL_LAYOUT[..n],
    }
}

/// Everything read from a vehicle page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleSheet {
    pub setups: Vec<Setup>,
    pub assets: PageAssets,
}

fn cells_of(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

fn is_setup_header(row: ElementRef<'_>) -> bool {
    if row.select(&ROWS).next().is_some() {
        return false;
    }
    let text = cells_of(row)
        .into_iter()
        .map(text_of)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    text.contains("driver") && (text.contains("traction") || text.contains("composition"))
}

fn setup_from_cells(cells: &[ElementRef<'_>], base: &str) -> Setup {
    let mut setup = Setup::default();
    for (cell, column) in cells.iter().zip(columns_for(cells.len())) {
        let text = text_of(*cell);
        match column {
            Column::Date => setup.date = text,
            Column::Driver => {
                setup.driver = text;
                setup.driver_url = cell
                    .select(&selector("a[href]"))
                    .next()
                    .and_then(|a| attr(a, "href"))
                    .map(|href| normalize(href, base))
                    .unwrap_or_default();
            }
            Column::Vehicle => setup.vehicle = text,
            Column::Event => setup.event = text,
            Column::Composition => setup.composition = text,
            Column::Layout => setup.layout = text,
            Column::Traction => setup.traction = text,
            Column::Source => setup.source = text,
        }
    }
    setup
}

/// Reads the setups table of a vehicle page.
///
/// The table is the one holding the first row whose headers mention
/// "driver" together with "traction" or "composition". Rows after that
/// header are read positionally; rows of nested tables and rows with no
/// text are skipped.
#[must_use]
pub fn extract_setup_rows(doc: &Html, base: &str) -> Vec<Setup> {
    let Some(header) = doc.select(&ROWS).find(|row| is_setup_header(*row)) else {
        return Vec::new();
    };
    let Some(table) = nearest_ancestor(header, "table") else {
        return Vec::new();
    };

    table
        .select(&ROWS)
        .skip_while(|row| row.id() != header.id())
        .skip(1)
        .filter(|row| nearest_ancestor(*row, "table").is_some_and(|t| t.id() == table.id()))
        .filter_map(|row| {
            let cells = cells_of(row);
            if cells.iter().all(|c| text_of(*c).is_empty()) {
                return None;
            }
            Some(setup_from_cells(&cells, base))
        })
        .collect()
}

/// Reads a vehicle page: setups table plus page-level assets.
#[must_use]
pub fn extract_vehicle_sheet(doc: &Html, base: &str) -> VehicleSheet {
    VehicleSheet {
        setups: extract_setup_rows(doc, base),
        assets: extract_assets(doc.root_element(), base),
    }
}
