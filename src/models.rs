use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A URL waiting in the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlItem {
    /// Absolute, normalized URL.
    pub url: String,
    /// Distance from the seed set; seeds are depth 0.
    pub depth: u32,
    /// Page the URL was discovered on, if any.
    pub parent_url: Option<String>,
}

impl UrlItem {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            parent_url: None,
        }
    }

    pub fn child(url: impl Into<String>, depth: u32, parent_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            parent_url: Some(parent_url.into()),
        }
    }
}

/// One record per attempted URL, appended to `sitemap.jsonl`.
///
/// `status_code` is 0 when no response was received, and `error` is omitted
/// from the serialized form when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub depth: u32,
    pub status_code: u16,
    pub content_length: u64,
    pub title: String,
    pub link_count: usize,
    pub crawled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl PageResult {
    /// Start a record for an attempt; fields fill in as processing proceeds.
    pub fn started(item: &UrlItem) -> Self {
        Self {
            url: item.url.clone(),
            depth: item.depth,
            status_code: 0,
            content_length: 0,
            title: String::new(),
            link_count: 0,
            crawled_at: Utc::now(),
            error: String::new(),
        }
    }
}

/// Final output of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub discovered: u64,
    pub processed: u64,
    pub errors: u64,
}

impl CrawlSummary {
    /// Success rate reported at the end of a crawl: `(processed - errors) / processed`.
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        (self.processed as f64 - self.errors as f64) / self.processed as f64
    }
}

impl std::fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "discovered: {} | processed: {} | errors: {}",
            self.discovered, self.processed, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_omitted_when_empty() {
        let mut result = PageResult::started(&UrlItem::seed("https://test.local/"));
        result.status_code = 200;

        let line = serde_json::to_string(&result).unwrap();
        assert!(!line.contains("\"error\""));

        result.error = "non-200 status: 404".to_string();
        let line = serde_json::to_string(&result).unwrap();
        assert!(line.contains("\"error\":\"non-200 status: 404\""));
    }

    #[test]
    fn crawled_at_serializes_as_rfc3339() {
        let result = PageResult::started(&UrlItem::seed("https://test.local/"));
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
        let stamp = value["crawled_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn success_rate_follows_reported_formula() {
        let summary = CrawlSummary {
            discovered: 10,
            processed: 8,
            errors: 2,
        };
        assert!((summary.success_rate() - 0.75).abs() < f64::EPSILON);

        let empty = CrawlSummary {
            discovered: 0,
            processed: 0,
            errors: 0,
        };
        assert_eq!(empty.success_rate(), 0.0);
    }
}
