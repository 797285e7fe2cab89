use rand::Rng;
use std::time::Duration;

/// Exponential backoff with a hard cap and symmetric jitter.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
    /// Jitter fraction; 0.2 draws uniformly from ±20% of the base delay.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Exponential component before jitter: `min(max, initial * factor^attempt)`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = self.factor.powi(attempt.min(32) as i32);
        self.initial.mul_f64(exponent).min(self.max)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let scale = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        base.mul_f64(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially() {
        let policy = BackoffPolicy::default().without_jitter();
        assert_eq!(policy.base_delay(0), Duration::from_secs(1));
        assert_eq!(policy.base_delay(1), Duration::from_secs(2));
        assert_eq!(policy.base_delay(2), Duration::from_secs(4));
        assert_eq!(policy.base_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn saturates_at_max() {
        let policy = BackoffPolicy::default().without_jitter();
        assert_eq!(policy.base_delay(10), Duration::from_secs(30));
        assert_eq!(policy.base_delay(100), Duration::from_secs(30));
    }

    #[test]
    fn base_delay_is_non_decreasing() {
        let policy = BackoffPolicy::default().without_jitter();
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = policy.base_delay(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = BackoffPolicy {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: 0.2,
        };
        for _ in 0..200 {
            let delay = policy.delay(0);
            assert!(delay >= Duration::from_millis(80));
            assert!(delay <= Duration::from_millis(120));
        }
    }
}
