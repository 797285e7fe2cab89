//! Per-origin robots.txt cache with an allow-on-failure policy

use dashmap::DashMap;
use robotstxt::DefaultMatcher;
use url::Url;

use crate::network::HttpClient;

/// Cached exclusion policy for one origin.
enum RobotsPolicy {
    /// Fetch failed or returned 4xx; everything is allowed.
    AllowAll,
    /// Raw robots.txt body, matched per query.
    Rules(String),
}

/// Lazily populated robots.txt cache, keyed by origin (`scheme://host`).
///
/// Entries are write-once for the process lifetime; a concurrent duplicate
/// fetch may happen on first contact with an origin, but only one policy is
/// kept. A 5xx answer allows the current request without caching, so the
/// origin is retried later.
pub struct RobotsGate {
    http: HttpClient,
    agent: String,
    cache: DashMap<String, RobotsPolicy>,
}

impl RobotsGate {
    pub fn new(http: HttpClient, agent: impl Into<String>) -> Self {
        Self {
            http,
            agent: agent.into(),
            cache: DashMap::new(),
        }
    }

    /// Whether the crawl may fetch `url`, fetching and caching the origin's
    /// policy on first contact.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();

        if let Some(policy) = self.cache.get(&origin) {
            return self.verdict(&policy, url);
        }

        let robots_url = format!("{origin}/robots.txt");
        let policy = match self.http.fetch_text(&robots_url).await {
            Ok(response) if (200..300).contains(&response.status) => {
                RobotsPolicy::Rules(response.body)
            }
            Ok(response) if (500..600).contains(&response.status) => {
                // Transient server trouble: allow now, ask again next time.
                tracing::debug!(origin = %origin, status = response.status, "robots.txt unavailable, allowing");
                return true;
            }
            Ok(_) => RobotsPolicy::AllowAll,
            Err(e) => {
                tracing::debug!(origin = %origin, error = %e, "robots.txt fetch failed, allowing");
                RobotsPolicy::AllowAll
            }
        };

        // First writer wins under concurrent fetches of the same origin.
        let entry = self.cache.entry(origin).or_insert(policy);
        self.verdict(&entry, url)
    }

    fn verdict(&self, policy: &RobotsPolicy, url: &Url) -> bool {
        match policy {
            RobotsPolicy::AllowAll => true,
            RobotsPolicy::Rules(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, &self.agent, url.as_str())
            }
        }
    }
}
