//! Atomic crawl counters shared between workers and the progress reporter

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::CrawlSummary;

/// Engine-side counters. Workers bump these without touching the frontier
/// lock, so the reporter can read them at any time.
#[derive(Debug, Default)]
pub struct CrawlStats {
    /// Links accepted into the frontier by workers (seeds are counted by the
    /// frontier itself).
    pub discovered: AtomicU64,
    /// URLs that completed without error.
    pub processed: AtomicU64,
    /// URLs that ended in any failure, robots blocks included.
    pub errors: AtomicU64,
    /// Worker faults recovered by the panic boundary.
    pub panics: AtomicU64,
}

impl CrawlStats {
    pub fn record_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            discovered: self.discovered.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub discovered: u64,
    pub processed: u64,
    pub errors: u64,
    pub panics: u64,
}

impl StatsSnapshot {
    /// Final summary, with the discovered total taken from the frontier's
    /// authoritative counter (seeds plus unique worker adds).
    pub fn into_summary(self, frontier_discovered: u64) -> CrawlSummary {
        CrawlSummary {
            discovered: frontier_discovered,
            processed: self.processed,
            errors: self.errors,
        }
    }
}
