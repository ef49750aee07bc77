//! Document and image links attached to a page.

use scraper::ElementRef;

use crate::dom::{attr, selector};
use crate::url::{lower_path, normalize};

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

/// Assets found under an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAssets {
    /// First linked PDF, absolute.
    pub pdf: Option<String>,
    /// Linked and embedded images, absolute, first-seen order, no duplicates.
    pub images: Vec<String>,
}

/// Whether `url` points at a PDF file.
#[must_use]
pub fn is_pdf(url: &str) -> bool {
    lower_path(url).ends_with(".pdf")
}

/// Whether `url` points at an image file.
#[must_use]
pub fn is_image(url: &str) -> bool {
    let path = lower_path(url);
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Collects the first PDF link and every image under `root`.
///
/// Images come from anchors pointing at an image file and from `img`
/// sources, in document order.
#[must_use]
pub fn extract_assets(root: ElementRef<'_>, base: &str) -> PageAssets {
    let mut assets = PageAssets::default();

    for el in root.select(&selector("a[href], img[src]")) {
        let raw = if el.value().name() == "img" {
            attr(el, "src")
        } else {
            attr(el, "href")
        };
        let Some(url) = raw.map(|r| normalize(r, base)).filter(|u| !u.is_empty()) else {
            continue;
        };

        if el.value().name() == "img" || is_image(&url) {
            if !assets.images.contains(&url) {
                assets.images.push(url);
            }
        } else if assets.pdf.is_none() && is_pdf(&url) {
            assets.pdf = Some(url);
        }
    }

    assets
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn collects_first_pdf_and_unique_images_in_order() {
        let doc = Html::parse_document(
            r#"<div>
                 <a href="/sheets/b6.pdf">Sheet</a>
                 <a href="/sheets/other.PDF">Other</a>
                 <a href="photo.JPG">Photo</a>
                 <img src="/img/car.png">
                 <img src="photo.JPG">
                 <a href="/page.html">Page</a>
               </div>"#,
        );
        let assets = extract_assets(doc.root_element(), "https://setups.test/cars/");

        assert_eq!(
            assets.pdf.as_deref(),
            Some("https://setups.test/sheets/b6.pdf")
        );
        assert_eq!(
            assets.images,
            [
                "https://setups.test/cars/photo.JPG",
                "https://setups.test/img/car.png",
            ]
        );
    }

    #[test]
    fn page_without_assets_is_empty() {
        let doc = Html::parse_document("<p><a href='/x'>x</a></p>");
        assert_eq!(
            extract_assets(doc.root_element(), "https://setups.test/"),
            PageAssets::default()
        );
    }

    #[test]
    fn extension_checks_ignore_query_strings() {
        assert!(is_pdf("https://a.test/sheet.pdf?download=1"));
        assert!(is_image("https://a.test/car.webp#top"));
        assert!(!is_image("https://a.test/car.html"));
    }
}
