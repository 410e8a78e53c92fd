// Anchor resolution and de-duplication

use crate::artifact::LinkRecord;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// False for empty, fragment-only and `javascript:` targets.
pub fn is_navigable_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    !href
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

/// Resolves `href` against `base`, dropping any fragment.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    if !is_navigable_href(href) {
        return None;
    }
    let mut resolved = base.join(href.trim()).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

/// Scheme, host and port must all match.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Ordered, de-duplicated links of `document`. The first anchor for a URL supplies its text.
pub fn extract_links(document: &Html, base: &Url) -> Vec<LinkRecord> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(base, href) else {
            continue;
        };
        let url = resolved.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }
        debug!("Found link: {}", url);
        links.push(LinkRecord {
            path: resolved.path().to_string(),
            text: element.text().collect::<String>().trim().to_string(),
            url,
        });
    }

    links
}

pub fn extract_links_from_markup(markup: &str, base: &Url) -> Vec<LinkRecord> {
    extract_links(&Html::parse_document(markup), base)
}

/// Keeps links whose origin matches `origin`, preserving order.
pub fn filter_same_origin(links: &[LinkRecord], origin: &Url) -> Vec<LinkRecord> {
    links
        .iter()
        .filter(|link| {
            Url::parse(&link.url)
                .map(|u| same_origin(&u, origin))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
