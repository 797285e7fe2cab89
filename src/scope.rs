//! Crawl-scope predicate for discovered links

use url::Url;

/// Decide whether a normalized link may enter the frontier.
///
/// Only http(s) URLs qualify. Unless `allow_external` is set, the link's host
/// must equal the host of the page it was discovered on, or be a subdomain of
/// it.
pub fn in_scope(candidate: &Url, base: &Url, allow_external: bool) -> bool {
    if !matches!(candidate.scheme(), "http" | "https") {
        return false;
    }
    if allow_external {
        return true;
    }

    match (candidate.host_str(), base.host_str()) {
        (Some(candidate_host), Some(base_host)) => {
            candidate_host == base_host
                || candidate_host.ends_with(&format!(".{base_host}"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn same_host_is_in_scope() {
        assert!(in_scope(
            &url("http://t/b"),
            &url("http://t/a"),
            false
        ));
    }

    #[test]
    fn subdomains_are_in_scope() {
        assert!(in_scope(
            &url("https://docs.test.local/x"),
            &url("https://test.local/"),
            false
        ));
        // Parent of the base host is out of scope, not a subdomain of it.
        assert!(!in_scope(
            &url("https://test.local/x"),
            &url("https://docs.test.local/"),
            false
        ));
    }

    #[test]
    fn foreign_hosts_are_rejected_unless_external_allowed() {
        let base = url("http://t/a");
        let foreign = url("http://other/x");
        assert!(!in_scope(&foreign, &base, false));
        assert!(in_scope(&foreign, &base, true));
    }

    #[test]
    fn suffix_match_requires_label_boundary() {
        assert!(!in_scope(
            &url("https://eviltest.local/"),
            &url("https://test.local/"),
            false
        ));
    }

    #[test]
    fn non_http_schemes_are_rejected_even_externally() {
        let base = url("http://t/a");
        assert!(!in_scope(&url("ftp://t/file"), &base, false));
        assert!(!in_scope(&url("ftp://t/file"), &base, true));
    }
}
