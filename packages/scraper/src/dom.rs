//! Text and traversal helpers over [`scraper`] documents.

use scraper::{ElementRef, Html, Selector};

/// Tags whose contents never count as visible prose.
pub const NON_PROSE_TAGS: &[&str] = &["script", "style", "noscript"];

/// Parses a CSS selector that is known to be valid.
///
/// # Panics
///
/// Panics if `css` is not a valid selector. Only call this with literals.
#[must_use]
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid CSS selector '{css}': {e}"))
}

/// Text of `el` with each text node trimmed and the pieces joined by a
/// single space.
#[must_use]
pub fn text_of(el: ElementRef<'_>) -> String {
    text_with(el, " ")
}

/// Text of `el` with each text node trimmed and joined by `sep`.
#[must_use]
pub fn text_with(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// The trimmed, non-empty text nodes of `el`, one per line.
#[must_use]
pub fn lines_of(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Text of `el` ignoring every subtree rooted at one of `skip` (tag names),
/// with whitespace collapsed.
#[must_use]
pub fn text_without(el: ElementRef<'_>, skip: &[&str]) -> String {
    let mut pieces = Vec::new();
    collect_text(el, skip, &mut pieces);
    pieces.join(" ")
}

fn collect_text<'a>(el: ElementRef<'a>, skip: &[&str], out: &mut Vec<&'a str>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.extend(text.split_whitespace());
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if !skip.contains(&name) && !NON_PROSE_TAGS.contains(&name) {
                collect_text(child_el, skip, out);
            }
        }
    }
}

/// Trimmed value of attribute `name`, if present and non-empty.
#[must_use]
pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Whether `el` is one of the given tag names.
#[must_use]
pub fn is_tag(el: ElementRef<'_>, names: &[&str]) -> bool {
    names.contains(&el.value().name())
}

/// Ancestors of `el` that are elements, nearest first.
pub fn element_ancestors<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.ancestors().filter_map(ElementRef::wrap)
}

/// The nearest ancestor of `el` with tag `name`, excluding `el` itself.
#[must_use]
pub fn nearest_ancestor<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element_ancestors(el).find(|a| a.value().name() == name)
}

/// Every element of the document in document order.
#[must_use]
pub fn elements_in_order(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

/// Whether `el` carries `id` or `name` equal to `ident`.
#[must_use]
pub fn has_identifier(el: ElementRef<'_>, ident: &str) -> bool {
    let v = el.value();
    v.id() == Some(ident) || v.attr("name") == Some(ident)
}

/// Case-insensitive variant of [`has_identifier`].
#[must_use]
pub fn has_identifier_ignore_case(el: ElementRef<'_>, ident: &str) -> bool {
    let v = el.value();
    [v.id(), v.attr("name")]
        .into_iter()
        .flatten()
        .any(|value| value.trim().eq_ignore_ascii_case(ident))
}

/// Returns `Some(s)` unless `s` is empty.
#[must_use]
pub fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
