//! Crawl engine: frontier scheduling, worker pool, retry loop, and shutdown.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backoff::BackoffPolicy;
use crate::common_crawl_seeder::CommonCrawlSeeder;
use crate::config::{ConfigError, CrawlerConfig};
use crate::ct_log_seeder::CtLogSeeder;
use crate::frontier::{Frontier, FrontierError};
use crate::models::{CrawlSummary, PageResult, UrlItem};
use crate::network::{FetchError, HttpClient};
use crate::parser;
use crate::retry::RetryController;
use crate::robots::RobotsGate;
use crate::scope;
use crate::seeder::Seeder;
use crate::sitemap_seeder::SitemapSeeder;
use crate::stats::CrawlStats;
use crate::storage::{Storage, StorageError};
use crate::url_norm;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid start URL {url:?}: {source}")]
    InvalidStartUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("http client: {0}")]
    Client(#[from] FetchError),

    #[error("frontier: {0}")]
    Frontier(#[from] FrontierError),
}

/// The crawl engine. Owns the frontier, robots cache, retry controller,
/// result sink, and HTTP client; workers receive clones that share them
/// through `Arc`s.
#[derive(Clone)]
pub struct Crawler {
    config: CrawlerConfig,
    base: Url,
    frontier: Arc<Frontier>,
    robots: Arc<RobotsGate>,
    retries: Arc<RetryController>,
    storage: Arc<Storage>,
    http: HttpClient,
    stats: Arc<CrawlStats>,
    permits: Arc<Semaphore>,
    token: CancellationToken,
}

impl Crawler {
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        config.validate()?;

        let base = Url::parse(&config.start_url).map_err(|source| CrawlError::InvalidStartUrl {
            url: config.start_url.clone(),
            source,
        })?;

        let storage = Arc::new(Storage::open(&config.data_dir)?);
        let http = HttpClient::new(CrawlerConfig::USER_AGENT, config.timeout)?;
        let frontier = Arc::new(Frontier::new(
            CrawlerConfig::SEEN_CAPACITY,
            CrawlerConfig::SEEN_FP_RATE,
            CrawlerConfig::POLITENESS_INTERVAL,
        )?);
        let robots = Arc::new(RobotsGate::new(
            http.clone(),
            CrawlerConfig::ROBOTS_AGENT,
        ));
        let permits = Arc::new(Semaphore::new(config.workers));

        Ok(Self {
            config,
            base,
            frontier,
            robots,
            retries: Arc::new(RetryController::default()),
            storage,
            http,
            stats: Arc::new(CrawlStats::default()),
            permits,
            token: CancellationToken::new(),
        })
    }

    /// Restore a crawler from a persisted configuration. Frontier state is
    /// not persisted, so this re-runs seeding against the saved settings and
    /// continues appending to the existing result file.
    pub fn resume(data_dir: &std::path::Path) -> Result<Self, CrawlError> {
        let config = Storage::load_config(data_dir)?;
        let crawler = Self::new(config)?;
        for item in crawler.storage.load_pending_urls()? {
            crawler.frontier.add(item);
        }
        Ok(crawler)
    }

    /// Replace the retry controller's backoff policy. Intended for tests that
    /// need sub-second retries.
    pub fn with_backoff_policy(mut self, policy: BackoffPolicy) -> Self {
        self.retries = Arc::new(RetryController::new(policy));
        self
    }

    /// Token that cancels the crawl; in-flight workers stop at their next
    /// suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the crawl to completion and return the final counters.
    pub async fn crawl(&self) -> Result<CrawlSummary, CrawlError> {
        self.storage.save_config(&self.config)?;

        tracing::info!(
            start_url = %self.config.start_url,
            workers = self.config.workers,
            "crawl starting"
        );

        self.frontier.add(UrlItem::seed(self.config.start_url.clone()));
        self.run_seeding().await;
        tracing::info!(pending = self.frontier.size(), "initial frontier ready");

        let reporter = self.spawn_reporter();
        let mut workers = JoinSet::new();

        loop {
            // Reap finished workers so the join set stays bounded.
            while workers.try_join_next().is_some() {}

            if self.token.is_cancelled() {
                tracing::info!("cancellation requested, stopping scheduler");
                break;
            }

            // Drained only when the frontier stays empty across a grace
            // window; in-flight workers may still queue new URLs.
            if self.frontier.is_empty() {
                if !self.pause(CrawlerConfig::DRAIN_GRACE).await {
                    break;
                }
                if self.frontier.is_empty() {
                    tracing::info!("frontier exhausted, finishing");
                    break;
                }
            }

            let Some(item) = self.frontier.next() else {
                // Full revolution found no host past its politeness window.
                if !self.pause(CrawlerConfig::NEXT_POLL_BACKOFF).await {
                    break;
                }
                continue;
            };

            let permit = tokio::select! {
                _ = self.token.cancelled() => break,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let worker = self.clone();
            workers.spawn(async move {
                let _permit = permit;
                worker.process_guarded(item).await;
            });
        }

        while workers.join_next().await.is_some() {}
        reporter.abort();

        self.storage.close()?;

        let snapshot = self.stats.snapshot();
        let summary = snapshot.into_summary(self.frontier.stats().discovered);

        tracing::info!(
            discovered = summary.discovered,
            processed = summary.processed,
            errors = summary.errors,
            success_rate = %format!("{:.1}%", summary.success_rate() * 100.0),
            "crawl finished"
        );
        if snapshot.panics > 0 {
            tracing::warn!(count = snapshot.panics, "worker panics were recovered");
        }

        Ok(summary)
    }

    /// Run the configured seeding strategies in declared order. Failures are
    /// logged and non-fatal.
    async fn run_seeding(&self) {
        for strategy in self.config.seeding_strategies() {
            let seeder: Box<dyn Seeder> = match strategy {
                "sitemap" => Box::new(SitemapSeeder::new(self.http.clone())),
                "ct" => Box::new(CtLogSeeder::new(self.http.clone())),
                "commoncrawl" => Box::new(CommonCrawlSeeder::new(self.http.clone())),
                other => {
                    tracing::warn!(strategy = other, "unknown seeding strategy, skipping");
                    continue;
                }
            };

            tracing::info!(strategy = seeder.name(), "running seeding strategy");
            match seeder.seed(&self.config.start_url).await {
                Ok(urls) => {
                    let mut added = 0usize;
                    for url in urls {
                        if self.enqueue_seed(&url) {
                            added += 1;
                        }
                    }
                    tracing::info!(strategy = seeder.name(), added, "seeding strategy finished");
                }
                Err(e) => {
                    tracing::warn!(strategy = seeder.name(), error = %e, "seeding strategy failed");
                }
            }
        }
    }

    /// Normalize and scope-filter one seeded URL, then queue it at depth 0.
    fn enqueue_seed(&self, raw: &str) -> bool {
        let Some(normalized) = url_norm::normalize(raw, &self.base) else {
            return false;
        };
        let Ok(candidate) = Url::parse(&normalized) else {
            return false;
        };
        if !scope::in_scope(&candidate, &self.base, self.config.crawl_external_links) {
            return false;
        }
        self.frontier.add(UrlItem::seed(normalized))
    }

    fn spawn_reporter(&self) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(&self.stats);
        let frontier = Arc::clone(&self.frontier);
        let token = self.token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CrawlerConfig::PROGRESS_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let snapshot = stats.snapshot();
                        tracing::info!(
                            discovered = snapshot.discovered,
                            processed = snapshot.processed,
                            errors = snapshot.errors,
                            pending = frontier.size(),
                            "crawl progress"
                        );
                    }
                }
            }
        })
    }

    /// Sleep unless cancelled first; returns false on cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Fault-isolation boundary around `process_url`. A panicking worker
    /// still produces a PageResult, keeps the counters consistent, and never
    /// takes the engine down; the semaphore permit is released by the caller
    /// on every path.
    async fn process_guarded(&self, item: UrlItem) {
        let record = PageResult::started(&item);
        let outcome = AssertUnwindSafe(self.process_url(item)).catch_unwind().await;

        if let Err(panic) = outcome {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());

            tracing::error!(url = %record.url, detail = %detail, "worker panicked");

            let mut result = record;
            result.error = format!("panic during processing: {detail}");
            if let Err(e) = self.storage.append_result(&result) {
                tracing::error!(error = %e, "failed to record panic result");
            }
            self.stats.record_error();
            self.stats.record_panic();
            self.frontier.mark_processed();
        }
    }

    /// Crawl a single URL: robots gate, fetch with retries, parse, and feed
    /// surviving links back into the frontier. Emits exactly one PageResult.
    async fn process_url(&self, item: UrlItem) {
        let mut result = PageResult::started(&item);

        let Ok(page_url) = Url::parse(&item.url) else {
            // The frontier only queues parseable URLs; treat this as a build failure.
            result.error = format!("request creation failed: unparseable URL {}", item.url);
            self.finish_error(result);
            return;
        };

        if !self.config.ignore_robots && !self.robots.is_allowed(&page_url).await {
            result.error = "blocked by robots.txt".to_string();
            self.finish_error(result);
            return;
        }

        let host = page_url.host_str().unwrap_or_default().to_string();

        let response = match self.fetch_with_retries(&item.url, &host).await {
            FetchOutcome::Response(response) => response,
            FetchOutcome::Failed(error) => {
                result.error = format!("request failed: {error}");
                self.finish_error(result);
                return;
            }
            FetchOutcome::Cancelled => {
                result.error = "request creation failed: crawl cancelled".to_string();
                self.finish_error(result);
                return;
            }
        };

        let status = response.status().as_u16();
        result.status_code = status;

        if !(200..300).contains(&status) {
            result.error = format!("non-200 status: {status}");
            self.finish_error(result);
            return;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                result.error = format!("body read failed: {e}");
                self.finish_error(result);
                return;
            }
        };
        result.content_length = body.len() as u64;

        if content_type.contains("text/html") {
            let html = String::from_utf8_lossy(&body);
            let (links, title) = parser::extract_links(&html, &item.url);
            result.title = title.unwrap_or_default();
            result.link_count = links.len();

            for link in links {
                let Ok(candidate) = Url::parse(&link) else {
                    continue;
                };
                if !scope::in_scope(&candidate, &page_url, self.config.crawl_external_links) {
                    continue;
                }
                if self
                    .frontier
                    .add(UrlItem::child(link, item.depth + 1, item.url.clone()))
                {
                    self.stats.record_discovered();
                }
            }
        }

        tracing::debug!(
            url = %result.url,
            status,
            links = result.link_count,
            "page crawled"
        );

        if let Err(e) = self.storage.append_result(&result) {
            tracing::error!(url = %result.url, error = %e, "failed to append result");
        }
        self.stats.record_processed();
        self.frontier.mark_processed();
    }

    /// Fetch with the per-host retry loop: transport errors and retryable
    /// statuses back off and retry up to the configured limit; anything else
    /// is returned as-is for the caller to classify.
    async fn fetch_with_retries(&self, url: &str, host: &str) -> FetchOutcome {
        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                if let Some(remaining) = self.retries.in_backoff(host) {
                    if !self.pause(remaining).await {
                        return FetchOutcome::Cancelled;
                    }
                }
            }

            let sent = tokio::select! {
                _ = self.token.cancelled() => return FetchOutcome::Cancelled,
                sent = self.http.get(url) => sent,
            };

            match sent {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if (200..300).contains(&status) {
                        self.retries.record_success(host);
                        return FetchOutcome::Response(response);
                    }

                    if self.retries.should_retry(status, false) {
                        self.retries.record_failure(host, status);
                        if attempt < max_retries {
                            let delay = self.retries.backoff(host, attempt);
                            tracing::debug!(url, status, attempt, ?delay, "retrying after status");
                            if !self.pause(delay).await {
                                return FetchOutcome::Cancelled;
                            }
                            attempt += 1;
                            continue;
                        }
                    }

                    // Terminal non-success; the caller records the status.
                    return FetchOutcome::Response(response);
                }
                Err(error) => {
                    self.retries.record_failure(host, 0);
                    if attempt < max_retries {
                        let delay = self.retries.backoff(host, attempt);
                        tracing::debug!(url, %error, attempt, ?delay, "retrying after network error");
                        if !self.pause(delay).await {
                            return FetchOutcome::Cancelled;
                        }
                        attempt += 1;
                        continue;
                    }
                    return FetchOutcome::Failed(error);
                }
            }
        }
    }

    fn finish_error(&self, result: PageResult) {
        tracing::debug!(url = %result.url, error = %result.error, "page failed");
        if let Err(e) = self.storage.append_result(&result) {
            tracing::error!(url = %result.url, error = %e, "failed to append result");
        }
        self.stats.record_error();
        self.frontier.mark_processed();
    }
}

enum FetchOutcome {
    Response(reqwest::Response),
    Failed(FetchError),
    Cancelled,
}
