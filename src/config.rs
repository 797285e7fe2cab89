use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Crawler configuration, persisted to `<data-dir>/config.json` at crawl start.
///
/// The serialized field names and the nanosecond `Timeout` encoding are part of
/// the on-disk contract; `resume` reads the same file back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CrawlerConfig {
    #[serde(rename = "StartURL")]
    pub start_url: String,
    pub workers: usize,
    #[serde(with = "duration_nanos")]
    pub timeout: Duration,
    pub data_dir: PathBuf,
    pub seeding_strategy: String,
    pub ignore_robots: bool,
    pub max_retries: u32,
    pub crawl_external_links: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: String::new(),
            workers: 256,
            timeout: Duration::from_secs(20),
            data_dir: PathBuf::from("./data"),
            seeding_strategy: "all".to_string(),
            ignore_robots: false,
            max_retries: 3,
            crawl_external_links: false,
        }
    }
}

impl CrawlerConfig {
    /// Minimum wall-clock time between two dequeues for the same host.
    pub const POLITENESS_INTERVAL: Duration = Duration::from_millis(100);
    /// Sleep before re-checking an empty frontier; two consecutive empty
    /// observations this far apart end the crawl.
    pub const DRAIN_GRACE: Duration = Duration::from_secs(1);
    /// Sleep after a full ring revolution found no eligible host.
    pub const NEXT_POLL_BACKOFF: Duration = Duration::from_millis(100);
    /// Cadence of the progress reporter.
    pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

    /// Expected URL cardinality for the frontier's membership set.
    pub const SEEN_CAPACITY: usize = 100_000_000;
    /// Target false-positive rate for the membership set.
    pub const SEEN_FP_RATE: f64 = 0.01;

    pub const POOL_IDLE_PER_HOST: usize = 10;
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    pub const MAX_WORKERS: usize = 1000;
    pub const MAX_RETRIES_LIMIT: u32 = 10;

    /// Identifying user agent sent with every request.
    pub const USER_AGENT: &'static str = "GoGoGoBot/1.0 (+https://crawlmap.dev)";
    /// Product token matched against robots.txt groups.
    pub const ROBOTS_AGENT: &'static str = "GoGoGoBot";

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_url.is_empty() {
            return Err(ConfigError::MissingStartUrl);
        }
        if self.workers == 0 || self.workers > Self::MAX_WORKERS {
            return Err(ConfigError::WorkersOutOfRange(self.workers));
        }
        if self.max_retries > Self::MAX_RETRIES_LIMIT {
            return Err(ConfigError::RetriesOutOfRange(self.max_retries));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Seeding strategies to run, in declared order. `all` expands to every
    /// strategy; comma-separated values mix and match.
    pub fn seeding_strategies(&self) -> Vec<&str> {
        if self.seeding_strategy == "none" {
            return Vec::new();
        }
        if self.seeding_strategy == "all" {
            return vec!["sitemap", "ct", "commoncrawl"];
        }
        self.seeding_strategy
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("start URL is required")]
    MissingStartUrl,
    #[error("workers must be between 1 and 1000, got {0}")]
    WorkersOutOfRange(usize),
    #[error("max retries must be between 0 and 10, got {0}")]
    RetriesOutOfRange(u32),
    #[error("request timeout must be non-zero")]
    ZeroTimeout,
}

/// `Duration` as integer nanoseconds, the encoding `config.json` uses.
mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (value.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
