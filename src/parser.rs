//! HTML link extraction
//!
//! Pure collaborator for the crawl engine: given a page body and the URL it
//! was fetched from, return the outgoing links and the document title. Links
//! are normalized and de-duplicated within the page, in document order.
//! Malformed input yields an empty result rather than an error.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::url_norm;

/// Extract outgoing links and the title from an HTML document.
///
/// Anchors (`a[href]`) plus alternate/canonical `link` elements are
/// considered. A `<base href>` element, when present, overrides the
/// resolution base.
pub fn extract_links(html: &str, base_url: &str) -> (Vec<String>, Option<String>) {
    let Ok(page_base) = Url::parse(base_url) else {
        return (Vec::new(), None);
    };

    let document = Html::parse_document(html);

    let base_selector = Selector::parse("base[href]").unwrap();
    let base = document
        .select(&base_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_base.join(href).ok())
        .unwrap_or(page_base);

    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |href: &str| {
        if let Some(normalized) = url_norm::normalize(href, &base) {
            if seen.insert(normalized.clone()) {
                links.push(normalized);
            }
        }
    };

    let anchor_selector = Selector::parse("a[href]").unwrap();
    for element in document.select(&anchor_selector) {
        if let Some(href) = element.value().attr("href") {
            push(href);
        }
    }

    // Alternate and canonical link elements point at crawlable pages too.
    let link_selector = Selector::parse("link[href]").unwrap();
    for element in document.select(&link_selector) {
        let rel = element.value().attr("rel").unwrap_or_default();
        if rel == "alternate" || rel == "canonical" {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    let title_selector = Selector::parse("title").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    (links, title)
}
