//! Per-host retry state and backoff decisions

use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::backoff::BackoffPolicy;

/// Statuses that warrant another attempt; every other non-2xx is terminal.
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

#[derive(Debug, Default)]
struct HostRetryState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    backoff_until: Option<Instant>,
}

/// Tracks consecutive failures per host and hands out backoff delays.
///
/// State is keyed by host and lives for the process lifetime; all methods are
/// atomic under the host's own lock, so unrelated hosts never wait on each
/// other.
pub struct RetryController {
    policy: BackoffPolicy,
    hosts: DashMap<String, Mutex<HostRetryState>>,
}

impl RetryController {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            hosts: DashMap::new(),
        }
    }

    /// Whether an attempt should be retried: any transport error is, plus the
    /// retryable status set. Other 4xx are terminal.
    pub fn should_retry(&self, status: u16, had_error: bool) -> bool {
        had_error || RETRYABLE_STATUSES.contains(&status)
    }

    /// Delay before the given attempt: the remainder of an active backoff
    /// window if one exists, otherwise a fresh exponential delay.
    pub fn backoff(&self, host: &str, attempt: u32) -> Duration {
        let state = self.hosts.entry(host.to_string()).or_default();
        let guard = state.lock();
        if let Some(until) = guard.backoff_until {
            let now = Instant::now();
            if now < until {
                return until - now;
            }
        }
        self.policy.delay(attempt)
    }

    /// Record a failed attempt and open a backoff window. Rate limiting (429)
    /// doubles the window.
    pub fn record_failure(&self, host: &str, status: u16) {
        let state = self.hosts.entry(host.to_string()).or_default();
        let mut guard = state.lock();
        guard.consecutive_failures += 1;
        guard.last_failure = Some(Instant::now());

        let mut window = self.policy.delay(guard.consecutive_failures);
        if status == 429 {
            window *= 2;
        }
        guard.backoff_until = Some(Instant::now() + window);
    }

    /// Reset the host after a successful request.
    pub fn record_success(&self, host: &str) {
        let state = self.hosts.entry(host.to_string()).or_default();
        let mut guard = state.lock();
        guard.consecutive_failures = 0;
        guard.backoff_until = None;
    }

    /// Remaining backoff window for the host, if any.
    pub fn in_backoff(&self, host: &str) -> Option<Duration> {
        let state = self.hosts.get(host)?;
        let guard = state.lock();
        let until = guard.backoff_until?;
        let now = Instant::now();
        if now < until {
            Some(until - now)
        } else {
            None
        }
    }

    #[cfg(test)]
    fn consecutive_failures(&self, host: &str) -> u32 {
        self.hosts
            .get(host)
            .map(|s| s.lock().consecutive_failures)
            .unwrap_or(0)
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RetryController {
        RetryController::new(
            BackoffPolicy {
                initial: Duration::from_millis(10),
                max: Duration::from_millis(500),
                factor: 2.0,
                jitter: 0.0,
            },
        )
    }

    #[test]
    fn retry_decision_matches_status_set() {
        let controller = controller();
        for status in [429, 500, 502, 503, 504] {
            assert!(controller.should_retry(status, false), "status {status}");
        }
        for status in [200, 201, 301, 400, 401, 403, 404, 410, 501] {
            assert!(!controller.should_retry(status, false), "status {status}");
        }
        // Transport errors always retry, whatever the status slot holds.
        assert!(controller.should_retry(0, true));
        assert!(controller.should_retry(404, true));
    }

    #[test]
    fn failures_accumulate_and_success_resets() {
        let controller = controller();
        controller.record_failure("t", 500);
        controller.record_failure("t", 500);
        assert_eq!(controller.consecutive_failures("t"), 2);
        assert!(controller.in_backoff("t").is_some());

        controller.record_success("t");
        assert_eq!(controller.consecutive_failures("t"), 0);
        assert!(controller.in_backoff("t").is_none());
    }

    #[test]
    fn rate_limit_doubles_the_window() {
        let controller = controller();
        controller.record_failure("plain", 500);
        controller.record_failure("limited", 429);

        // One failure each: base window 20ms, doubled to 40ms for the 429.
        let plain = controller.in_backoff("plain").unwrap();
        let limited = controller.in_backoff("limited").unwrap();
        assert!(limited > plain);
        assert!(limited <= Duration::from_millis(40));
    }

    #[test]
    fn backoff_returns_remaining_window_when_active() {
        let controller = controller();
        controller.record_failure("t", 503);

        let remaining = controller.backoff("t", 0);
        assert!(remaining <= Duration::from_millis(20));
        assert!(remaining > Duration::ZERO);
    }

    #[test]
    fn hosts_are_isolated() {
        let controller = controller();
        controller.record_failure("a", 500);
        assert!(controller.in_backoff("a").is_some());
        assert!(controller.in_backoff("b").is_none());
        assert_eq!(controller.consecutive_failures("b"), 0);
    }
}
