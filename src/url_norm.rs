//! URL normalization and host helpers used throughout the crawler

use url::Url;

/// Query parameters dropped during normalization. Keys are case-sensitive.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
];

/// Normalize a discovered reference against the page it appeared on.
///
/// Returns `None` for empty references, in-page anchors, synthetic schemes
/// (`javascript:`, `mailto:`, `tel:`), and anything that fails to resolve.
/// Otherwise resolves relative references, strips the fragment, and removes
/// tracking query parameters while preserving the order of the rest.
pub fn normalize(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    strip_tracking_params(&mut resolved);

    Some(resolved.to_string())
}

fn strip_tracking_params(url: &mut Url) {
    let Some(query) = url.query() else { return };
    if query.is_empty() {
        url.set_query(None);
        return;
    }

    let pairs: Vec<(String, Option<String>)> = query
        .split('&')
        .map(|piece| match piece.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (piece.to_string(), None),
        })
        .collect();

    // Leave untouched queries alone so already-normalized URLs round-trip.
    if !pairs.iter().any(|(key, _)| TRACKING_PARAMS.contains(&key.as_str())) {
        return;
    }

    let kept: Vec<String> = pairs
        .into_iter()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_str()))
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={value}"),
            None => key,
        })
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&kept.join("&")));
    }
}

/// Extract the host portion of a URL string.
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Return the root domain using a last-two-label heuristic.
pub fn root_domain(hostname: &str) -> String {
    let parts: Vec<&str> = hostname.split('.').collect();
    if parts.len() >= 2 {
        format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
    } else {
        hostname.to_string()
    }
}

/// Normalize CLI input by adding https:// when no scheme is provided.
pub fn normalize_start_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    format!("https://{trimmed}")
}
