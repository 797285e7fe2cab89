//! Deduplicating, per-host fair URL queue with politeness delays

use bloomfilter::Bloom;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::models::UrlItem;
use crate::url_norm;

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("membership set: {0}")]
    MembershipSet(String),
}

/// Per-host FIFO with the politeness window tracked at dequeue time.
struct HostQueue {
    items: VecDeque<UrlItem>,
    last_dequeue: Option<Instant>,
}

impl HostQueue {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            last_dequeue: None,
        }
    }
}

struct FrontierInner {
    queues: HashMap<String, HostQueue>,
    /// Hosts in insertion order; `cursor` rotates through them.
    hosts: Vec<String>,
    cursor: usize,
    seen: Bloom<String>,
    discovered: u64,
    processed: u64,
}

/// The frontier owns one FIFO per host, a host ring for round-robin
/// scheduling, and the approximate membership set used for deduplication.
///
/// A URL the membership set reports as present is never queued again; the set
/// is one-way, so a false positive silently drops one URL. The politeness
/// interval is measured between dequeues for a host, rate-limiting request
/// start times regardless of response latency.
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    politeness: Duration,
}

impl Frontier {
    pub fn new(
        expected_urls: usize,
        fp_rate: f64,
        politeness: Duration,
    ) -> Result<Self, FrontierError> {
        let seen = Bloom::new_for_fp_rate(expected_urls, fp_rate)
            .map_err(|e| FrontierError::MembershipSet(e.to_string()))?;

        Ok(Self {
            inner: Mutex::new(FrontierInner {
                queues: HashMap::new(),
                hosts: Vec::new(),
                cursor: 0,
                seen,
                discovered: 0,
                processed: 0,
            }),
            politeness,
        })
    }

    /// Queue a URL unless it has been seen before. Returns whether the item
    /// was accepted. A URL whose host cannot be parsed is recorded as seen
    /// but never queued, so it is not retried.
    pub fn add(&self, item: UrlItem) -> bool {
        let mut guard = self.inner.lock();
        let FrontierInner {
            queues,
            hosts,
            seen,
            discovered,
            ..
        } = &mut *guard;

        if seen.check_and_set(&item.url) {
            return false;
        }
        *discovered += 1;

        let Some(host) = url_norm::extract_host(&item.url) else {
            return false;
        };

        let queue = queues.entry(host.clone()).or_insert_with(|| {
            hosts.push(host);
            HostQueue::new()
        });
        queue.items.push_back(item);
        true
    }

    /// Pop the next eligible URL, advancing the host cursor at most one full
    /// revolution. Returns `None` when no host is both non-empty and past its
    /// politeness window; callers should back off briefly before retrying.
    pub fn next(&self) -> Option<UrlItem> {
        let mut guard = self.inner.lock();
        let FrontierInner {
            queues,
            hosts,
            cursor,
            ..
        } = &mut *guard;

        let host_count = hosts.len();
        if host_count == 0 {
            return None;
        }

        let now = Instant::now();
        for _ in 0..host_count {
            *cursor = (*cursor + 1) % host_count;
            let host = &hosts[*cursor];
            let Some(queue) = queues.get_mut(host) else {
                continue;
            };

            if let Some(last) = queue.last_dequeue {
                if now.duration_since(last) < self.politeness {
                    continue;
                }
            }

            if let Some(item) = queue.items.pop_front() {
                queue.last_dequeue = Some(now);
                return Some(item);
            }
        }

        None
    }

    pub fn mark_processed(&self) {
        self.inner.lock().processed += 1;
    }

    /// Queued URLs, not counting items in flight.
    pub fn size(&self) -> usize {
        self.inner
            .lock()
            .queues
            .values()
            .map(|q| q.items.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queues.values().all(|q| q.items.is_empty())
    }

    pub fn stats(&self) -> FrontierStats {
        let inner = self.inner.lock();
        FrontierStats {
            discovered: inner.discovered,
            processed: inner.processed,
            pending: inner.queues.values().map(|q| q.items.len()).sum(),
            hosts: inner.hosts.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrontierStats {
    pub discovered: u64,
    pub processed: u64,
    pub pending: usize,
    pub hosts: usize,
}

impl std::fmt::Display for FrontierStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frontier: {} discovered, {} processed, {} pending across {} hosts",
            self.discovered, self.processed, self.pending, self.hosts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn frontier(politeness: Duration) -> Frontier {
        Frontier::new(10_000, 0.01, politeness).unwrap()
    }

    #[test]
    fn add_deduplicates_by_url() {
        let frontier = frontier(Duration::ZERO);
        assert!(frontier.add(UrlItem::seed("http://t/a")));
        assert!(!frontier.add(UrlItem::seed("http://t/a")));
        assert!(frontier.add(UrlItem::seed("http://t/b")));

        assert_eq!(frontier.size(), 2);
        assert_eq!(frontier.stats().discovered, 2);
    }

    #[test]
    fn unparseable_host_is_consumed_without_queueing() {
        let frontier = frontier(Duration::ZERO);
        assert!(!frontier.add(UrlItem::seed("not a url")));
        assert!(frontier.is_empty());
        // Still counted as seen: a second add is a dedup hit.
        assert!(!frontier.add(UrlItem::seed("not a url")));
    }

    #[test]
    fn per_host_order_is_fifo() {
        let frontier = frontier(Duration::ZERO);
        for path in ["a", "b", "c", "d"] {
            frontier.add(UrlItem::seed(format!("http://t/{path}")));
        }

        let mut popped = Vec::new();
        while let Some(item) = frontier.next() {
            popped.push(item.url);
        }
        assert_eq!(
            popped,
            vec!["http://t/a", "http://t/b", "http://t/c", "http://t/d"]
        );
    }

    #[test]
    fn politeness_blocks_consecutive_dequeues_from_one_host() {
        let politeness = Duration::from_millis(50);
        let frontier = frontier(politeness);
        frontier.add(UrlItem::seed("http://t/a"));
        frontier.add(UrlItem::seed("http://t/b"));

        let first = Instant::now();
        assert!(frontier.next().is_some());
        // Within the window the only host is ineligible.
        assert!(frontier.next().is_none());

        std::thread::sleep(politeness + Duration::from_millis(10));
        assert!(frontier.next().is_some());
        assert!(first.elapsed() >= politeness);
    }

    #[test]
    fn hosts_are_scheduled_round_robin() {
        let frontier = frontier(Duration::ZERO);
        for host in ["one", "two", "three"] {
            frontier.add(UrlItem::seed(format!("http://{host}/x")));
            frontier.add(UrlItem::seed(format!("http://{host}/y")));
        }

        // Between two dequeues from the same host, every other host with
        // items gets a turn.
        let mut first_cycle = HashSet::new();
        for _ in 0..3 {
            let item = frontier.next().unwrap();
            first_cycle.insert(url_norm::extract_host(&item.url).unwrap());
        }
        assert_eq!(first_cycle.len(), 3);

        let mut second_cycle = HashSet::new();
        for _ in 0..3 {
            let item = frontier.next().unwrap();
            second_cycle.insert(url_norm::extract_host(&item.url).unwrap());
        }
        assert_eq!(second_cycle.len(), 3);
        assert!(frontier.next().is_none());
    }

    #[test]
    fn empty_revolution_returns_none_without_losing_items() {
        let politeness = Duration::from_millis(200);
        let frontier = frontier(politeness);
        frontier.add(UrlItem::seed("http://t/a"));
        frontier.add(UrlItem::seed("http://t/b"));

        assert!(frontier.next().is_some());
        assert!(frontier.next().is_none());
        assert_eq!(frontier.size(), 1);
    }

    #[test]
    fn counters_track_processing() {
        let frontier = frontier(Duration::ZERO);
        frontier.add(UrlItem::seed("http://t/a"));
        frontier.add(UrlItem::seed("http://t/b"));

        frontier.next().unwrap();
        frontier.mark_processed();

        let stats = frontier.stats();
        assert_eq!(stats.discovered, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.pending, 1);
    }

    #[test]
    fn distinct_queued_urls_never_exceed_distinct_adds() {
        let frontier = frontier(Duration::ZERO);
        let mut distinct = HashSet::new();
        for i in 0..500 {
            let url = format!("http://h{}.t/p{}", i % 7, i % 40);
            distinct.insert(url.clone());
            frontier.add(UrlItem::seed(url));
        }

        let mut drained = 0;
        while frontier.next().is_some() {
            drained += 1;
        }
        assert!(drained <= distinct.len());
    }
}
