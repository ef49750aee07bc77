//! Contact details and description from a track's own LiveRC site.
//!
//! Listings point at `<track>.liverc.com/live` or `/results`, but the About
//! panel with the address lives on the site root, so the root is tried first.

use std::sync::LazyLock;

use rc_scrape_models::{Address, TrackDetails};
use rc_scrape_scraper::dom::{attr, lines_of, non_empty, selector, text_of, text_without};
use rc_scrape_scraper::url::{normalize, site_root};
use rc_scrape_scraper::{Cascade, FetchedPage, PageFetcher};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static NO_SPAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"noSpam\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("valid regex")
});

static ABOUT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*about\b[\s:\-]*").expect("valid regex"));

static LIVE_SCORING_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[-|:]?\s*live\s+scoring\s*$").expect("valid regex"));

static STATE_POSTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^0-9]+)\s*([0-9-]*)").expect("valid regex"));

static PANELS: LazyLock<Selector> = LazyLock::new(|| selector("div.panel"));
static PANEL_HEADING: LazyLock<Selector> = LazyLock::new(|| selector(".panel-heading"));
static PANEL_BODY: LazyLock<Selector> = LazyLock::new(|| selector(".panel-body"));
static SMALL_ADDRESS: LazyLock<Selector> = LazyLock::new(|| selector("address.small"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a"));

/// Subtrees ignored when measuring description candidates.
const DESCRIPTION_NOISE: &[&str] = &["address", "img", "iframe"];

/// Description containers, in no particular priority; the longest wins.
const DESCRIPTION_CANDIDATES: &[&str] = &[
    ".panel-body .row .col-md-12",
    "#description",
    ".description",
    "article",
    "main",
];

/// The parts of a detail page the extraction cascades look at.
#[derive(Clone, Copy)]
struct DetailPage<'d> {
    doc: &'d Html,
    about: Option<ElementRef<'d>>,
}

impl<'d> DetailPage<'d> {
    fn new(doc: &'d Html) -> Self {
        let about = doc.select(&PANELS).find(|panel| {
            panel
                .select(&PANEL_HEADING)
                .next()
                .is_some_and(|h| text_of(h).to_lowercase().contains("about"))
        });
        Self { doc, about }
    }

    fn about_body(self) -> Option<ElementRef<'d>> {
        let panel = self.about?;
        Some(panel.select(&PANEL_BODY).next().unwrap_or(panel))
    }
}

fn address_cascade<'d>() -> Cascade<'d, DetailPage<'d>, ElementRef<'d>> {
    Cascade::<DetailPage<'d>, ElementRef<'d>>::new("address block")
        .then("about panel", |page| {
            page.about_body()?.select(&SMALL_ADDRESS).next()
        })
        .then("small address", |page| page.doc.select(&SMALL_ADDRESS).next())
        .then("any address", |page| {
            page.doc.select(&selector("address")).next()
        })
}

/// Context for the name cascade.
struct NameSources<'d> {
    page: DetailPage<'d>,
    address: Option<ElementRef<'d>>,
}

fn name_cascade<'d>() -> Cascade<'d, NameSources<'d>, String> {
    Cascade::<NameSources<'d>, String>::new("track name")
        .then("address heading", |src| {
            let block = src.address?;
            block
                .select(&selector("strong, b"))
                .map(text_of)
                .find(|t| !t.is_empty())
        })
        .then("about heading", |src| {
            let heading = src.page.about?.select(&PANEL_HEADING).next()?;
            non_empty(
                ABOUT_PREFIX
                    .replace(&text_of(heading), "")
                    .trim()
                    .to_owned(),
            )
        })
        .then("title", |src| {
            let title = src.page.doc.select(&selector("title")).next()?;
            non_empty(
                LIVE_SCORING_SUFFIX
                    .replace(&text_of(title), "")
                    .trim()
                    .to_owned(),
            )
        })
}

/// Splits address lines into their parts.
///
/// A first line that starts with `name` (case-insensitive) is dropped. The
/// rest map positionally: street, `city, STATE ZIP`, country.
#[must_use]
pub fn parse_address(lines: &[String], name: &str) -> Address {
    let name = name.trim().to_lowercase();
    let lines: Vec<String> = match lines.split_first() {
        Some((first, rest)) if !name.is_empty() && first.to_lowercase().starts_with(&name) => {
            rest.to_vec()
        }
        _ => lines.to_vec(),
    };

    let mut address = Address {
        street: lines.first().cloned().unwrap_or_default(),
        country: lines.get(2).cloned().unwrap_or_default(),
        ..Address::default()
    };

    if let Some(line) = lines.get(1) {
        let parts: Vec<&str> = line
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [city, rest, ..] => {
                (*city).clone_into(&mut address.city);
                match STATE_POSTAL.captures(rest) {
                    Some(caps) => {
                        address.state = caps[1].trim().to_owned();
                        address.postal = caps[2].trim().to_owned();
                    }
                    None => (*rest).clone_into(&mut address.state),
                }
            }
            _ => address.city = line.trim().to_owned(),
        }
    }

    address.raw_lines = lines;
    address
}

/// Decodes `noSpam('user','domain')` into `user@domain`.
#[must_use]
pub fn decode_no_spam(text: &str) -> Option<String> {
    let caps = NO_SPAM.captures(text)?;
    Some(format!("{}@{}", &caps[1], &caps[2]))
}

fn email_in(scope: ElementRef<'_>) -> Option<String> {
    let anchors: Vec<ElementRef<'_>> = scope.select(&ANCHORS).collect();

    let obfuscated = anchors.iter().find_map(|a| {
        ["href", "onclick"]
            .into_iter()
            .filter_map(|name| a.value().attr(name))
            .find_map(decode_no_spam)
    });

    obfuscated.or_else(|| {
        anchors.iter().find_map(|a| {
            let href = attr(*a, "href")?;
            let (scheme, rest) = href.split_once(':')?;
            if !scheme.eq_ignore_ascii_case("mailto") {
                return None;
            }
            let address = rest.split('?').next().unwrap_or(rest).trim();
            non_empty(address.to_owned())
        })
    })
}

fn phone_in(block: ElementRef<'_>) -> Option<String> {
    let tel = block.select(&selector("a[href^='tel:']")).next()?;
    non_empty(text_of(tel)).or_else(|| {
        attr(tel, "href")
            .and_then(|h| h.strip_prefix("tel:"))
            .map(|h| h.trim().to_owned())
    })
}

fn website_in(block: ElementRef<'_>, base: &str) -> Option<String> {
    block
        .select(&ANCHORS)
        .filter_map(|a| attr(a, "href"))
        .find(|href| href.to_ascii_lowercase().starts_with("http"))
        .map(|href| normalize(href, base))
}

fn description_of(page: DetailPage<'_>) -> String {
    let mut candidates: Vec<ElementRef<'_>> = DESCRIPTION_CANDIDATES
        .iter()
        .flat_map(|css| page.doc.select(&selector(css)).collect::<Vec<_>>())
        .collect();
    candidates.extend(page.about_body());

    candidates
        .into_iter()
        .map(|el| text_without(el, DESCRIPTION_NOISE))
        .max_by_key(|text| text.chars().count())
        .unwrap_or_default()
}

/// Feed URLs derived from a site root.
#[must_use]
pub fn feed_urls(root: &str) -> (String, String) {
    (format!("{root}/live/video/"), format!("{root}/live/scoring"))
}

/// Extracts track details from a parsed detail page.
///
/// `base` resolves relative links; `root` is the site root the feed URLs
/// are built on.
#[must_use]
pub fn extract_track_details(doc: &Html, base: &str, root: &str) -> TrackDetails {
    let page = DetailPage::new(doc);
    let address = address_cascade().resolve(&page);
    let name = name_cascade().resolve_or_default(&NameSources { page, address });
    let (video_feed, scoring_feed) = feed_urls(root);

    let mut details = TrackDetails {
        name,
        description: description_of(page),
        video_feed,
        scoring_feed,
        ..TrackDetails::default()
    };

    if let Some(block) = address {
        details.address = parse_address(&lines_of(block), &details.name);
        details.phone = phone_in(block).unwrap_or_default();
        details.website = website_in(block, base).unwrap_or_default();
        details.email = email_in(block).unwrap_or_default();
    }
    if details.email.is_empty() {
        details.email = email_in(doc.root_element()).unwrap_or_default();
    }

    details
}

fn read_details(page: &FetchedPage, root: &str) -> TrackDetails {
    extract_track_details(&page.document(), &page.url, root)
}

/// Fetches and extracts the details of the track at `url`.
///
/// The site root is fetched first, then `url` itself. If neither can be
/// fetched the result has empty fields apart from the feed URLs.
pub async fn scrape_track_details<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    label: &str,
) -> TrackDetails {
    let root = site_root(url);

    let mut candidates = vec![root.as_str()];
    if url != root {
        candidates.push(url);
    }

    for candidate in candidates {
        match fetcher.fetch(candidate).await {
            Ok(page) => {
                log::debug!("{label}: details from {candidate}");
                return read_details(&page, &root);
            }
            Err(e) => log::debug!("{label}: {e}"),
        }
    }

    log::warn!("{label}: no detail page reachable for {url}");
    let (video_feed, scoring_feed) = feed_urls(&root);
    TrackDetails {
        video_feed,
        scoring_feed,
        ..TrackDetails::default()
    }
}

#[cfg(test)]
mod tests {
    use rc_scrape_scraper::StaticFetcher;

    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn splits_street_city_state_postal_country() {
        let address = parse_address(
            &lines(&["123 Main St", "Springfield, IL 62704", "USA"]),
            "Springfield Raceway",
        );
        assert_eq!(address.street, "123 Main St");
        assert_eq!(address.city, "Springfield");
        assert_eq!(address.state, "IL");
        assert_eq!(address.postal, "62704");
        assert_eq!(address.country, "USA");
        assert_eq!(address.raw_lines.len(), 3);
    }

    #[test]
    fn drops_leading_name_line() {
        let address = parse_address(
            &lines(&["THE DIRT PIT RC", "9 Hill Rd", "Austin, TX 78701-1234"]),
            "The Dirt Pit",
        );
        assert_eq!(address.street, "9 Hill Rd");
        assert_eq!(address.state, "TX");
        assert_eq!(address.postal, "78701-1234");
        assert_eq!(address.country, "");
        assert_eq!(address.raw_lines, lines(&["9 Hill Rd", "Austin, TX 78701-1234"]));
    }

    #[test]
    fn city_line_without_comma_is_the_city() {
        let address = parse_address(&lines(&["1 Rd", "Leeds"]), "");
        assert_eq!(address.city, "Leeds");
        assert_eq!(address.state, "");
    }

    #[test]
    fn extra_commas_split_into_separate_parts() {
        let address = parse_address(&lines(&["1 Rd", "Springfield, IL, 62704"]), "");
        assert_eq!(address.city, "Springfield");
        assert_eq!(address.state, "IL");
        assert_eq!(address.postal, "");
    }

    #[test]
    fn unmatched_state_text_is_kept_as_state() {
        let address = parse_address(&lines(&["1 Rd", "Springfield, 62704"]), "");
        assert_eq!(address.city, "Springfield");
        assert_eq!(address.state, "62704");
        assert_eq!(address.postal, "");
    }

    #[test]
    fn decodes_no_spam_from_onclick() {
        let doc = Html::parse_document(
            r##"<address class="small"><strong>T</strong><br>
               <a href="#" onclick="javascript:noSpam('info','example.com')">Email us</a>
               </address>"##,
        );
        let details = extract_track_details(&doc, "https://t.liverc.com/", "https://t.liverc.com");
        assert_eq!(details.email, "info@example.com");
    }

    #[test]
    fn decodes_no_spam_from_href_before_mailto() {
        assert_eq!(
            decode_no_spam("javascript:noSpam(\"a\", \"b.org\")").as_deref(),
            Some("a@b.org")
        );
        let doc = Html::parse_document(
            r#"<address><a href="mailto:x@y.z?subject=hi">x</a>
               <a href="javascript:noSpam('info','example.com')">e</a></address>"#,
        );
        let details = extract_track_details(&doc, "https://t.test/", "https://t.test");
        assert_eq!(details.email, "info@example.com");
    }

    #[test]
    fn mailto_fallback_strips_query() {
        let doc = Html::parse_document(
            r#"<address><a href="mailto:x@y.z?subject=hi">x</a></address>"#,
        );
        let details = extract_track_details(&doc, "https://t.test/", "https://t.test");
        assert_eq!(details.email, "x@y.z");
    }

    #[test]
    fn reads_full_about_panel() {
        let doc = Html::parse_document(
            r#"<html><head><title>Ignored - Live Scoring</title></head><body>
               <div class="panel"><div class="panel-heading">News</div>
                 <div class="panel-body">short</div></div>
               <div class="panel"><div class="panel-heading">About Mudville RC</div>
                 <div class="panel-body"><div class="row"><div class="col-md-12">
                   <address class="small">
                     <strong>Mudville RC</strong><br>
                     500 Track Ln<br>Mudville, OH 44444<br>USA<br>
                     <a href="tel:+15550001111">(555) 000-1111</a><br>
                     <a href="https://mudvillerc.com">mudvillerc.com</a>
                   </address>
                   <p>Mudville RC runs off-road club racing every Saturday night.</p>
                   <img src="track.jpg">
                 </div></div></div></div>
               </body></html>"#,
        );
        let details =
            extract_track_details(&doc, "https://mudville.liverc.com/", "https://mudville.liverc.com");

        assert_eq!(details.name, "Mudville RC");
        assert_eq!(details.address.street, "500 Track Ln");
        assert_eq!(details.address.city, "Mudville");
        assert_eq!(details.address.state, "OH");
        assert_eq!(details.address.postal, "44444");
        assert_eq!(details.phone, "(555) 000-1111");
        assert_eq!(details.website, "https://mudvillerc.com");
        assert_eq!(
            details.description,
            "Mudville RC runs off-road club racing every Saturday night."
        );
    }

    #[test]
    fn name_falls_back_to_about_heading_then_title() {
        let doc = Html::parse_document(
            r#"<div class="panel"><div class="panel-heading">ABOUT: Rock Creek</div>
               <div class="panel-body">x</div></div>"#,
        );
        let details = extract_track_details(&doc, "https://r.test/", "https://r.test");
        assert_eq!(details.name, "Rock Creek");

        let doc = Html::parse_document(
            "<html><head><title>Rock Creek | Live Scoring</title></head><body></body></html>",
        );
        let details = extract_track_details(&doc, "https://r.test/", "https://r.test");
        assert_eq!(details.name, "Rock Creek");
    }

    #[tokio::test]
    async fn falls_back_to_original_url_when_root_fails() {
        let fetcher = StaticFetcher::new().with_html(
            "https://t.liverc.com/live",
            "<title>Tee Track Live Scoring</title>",
        );
        let details = scrape_track_details(&fetcher, "https://t.liverc.com/live", "test").await;

        assert_eq!(details.name, "Tee Track");
        assert_eq!(
            fetcher.requests(),
            ["https://t.liverc.com", "https://t.liverc.com/live"]
        );
    }

    #[tokio::test]
    async fn unreachable_site_still_gets_feed_urls() {
        let fetcher = StaticFetcher::new();
        let details = scrape_track_details(&fetcher, "https://t.liverc.com/results/", "test").await;

        assert_eq!(details.name, "");
        assert_eq!(details.address, Address::default());
        assert_eq!(details.video_feed, "https://t.liverc.com/live/video/");
        assert_eq!(details.scoring_feed, "https://t.liverc.com/live/scoring");
    }
}
