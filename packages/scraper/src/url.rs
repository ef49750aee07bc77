//! URL normalization.
//!
//! Every URL stored in a record goes through [`normalize`], so records only
//! ever contain absolute URLs or empty strings.

use ::url::Url;

/// Path suffixes that mark a listing section rather than the site root.
const SECTION_SUFFIXES: &[&str] = &["/live", "/results"];

/// Resolves `href` against `base` into an absolute URL.
///
/// - empty input gives `""`
/// - `//host/path` is treated as `https://host/path`
/// - an href that already parses as an absolute URL is returned unchanged
/// - anything else is joined onto `base`; if that fails the result is `""`
///
/// Idempotent: `normalize(&normalize(h, b), b) == normalize(h, b)`.
#[must_use]
pub fn normalize(href: &str, base: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }

    if href.starts_with("//") {
        return Url::parse(&format!("https:{href}"))
            .map(String::from)
            .unwrap_or_default();
    }

    if Url::parse(href).is_ok() {
        return href.to_owned();
    }

    Url::parse(base.trim())
        .and_then(|b| b.join(href))
        .map(String::from)
        .unwrap_or_default()
}

/// Replaces the whole query string of `url`.
#[must_use]
pub fn with_query(url: &str, query: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(Some(query));
            parsed.into()
        }
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            format!("{path}?{query}")
        }
    }
}

/// Sets a single query parameter, keeping the others in place.
#[must_use]
pub fn with_query_param(url: &str, key: &str, value: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return with_query(url, &format!("{key}={value}"));
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);

    parsed.into()
}

/// Derives the site root of a track URL.
///
/// Trailing `/live` and `/results` path segments are stripped
/// (case-insensitive), as are the query and fragment. The result never ends
/// with a slash, so feed paths can be appended directly.
#[must_use]
pub fn site_root(url: &str) -> String {
    let (origin, path) = match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => {
            (parsed.origin().ascii_serialization(), parsed.path().to_owned())
        }
        _ => {
            let trimmed = url.split(['?', '#']).next().unwrap_or(url);
            (String::new(), trimmed.to_owned())
        }
    };

    let mut path = path.trim_end_matches('/').to_owned();
    loop {
        let lower = path.to_ascii_lowercase();
        let Some(suffix) = SECTION_SUFFIXES.iter().find(|s| lower.ends_with(*s)) else {
            break;
        };
        path.truncate(path.len() - suffix.len());
        path = path.trim_end_matches('/').to_owned();
    }

    format!("{origin}{path}")
}

/// Whether `href` points into the current page or runs script.
#[must_use]
pub fn is_navigational(href: &str) -> bool {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    !(href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:"))
}

/// Lowercased path of `url` without query or fragment.
#[must_use]
pub fn lower_path(url: &str) -> String {
    Url::parse(url).map_or_else(
        |_| {
            url.split(['?', '#'])
                .next()
                .unwrap_or(url)
                .to_ascii_lowercase()
        },
        |parsed| parsed.path().to_ascii_lowercase(),
    )
}
