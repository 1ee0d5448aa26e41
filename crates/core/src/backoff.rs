//! Exponential-backoff retry policy.
//!
//! Shared by the oracle mirror (remote source retries) and the
//! readiness gate. Callers track the current delay themselves and step
//! it forward with [`next_delay`].

use std::time::Duration;

/// Tunable parameters for an exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and policy.
///
/// The result is clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let policy = RetryPolicy::default();
        let d = next_delay(Duration::from_secs(1), &policy);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &policy);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn custom_multiplier() {
        let policy = RetryPolicy {
            multiplier: 3.0,
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &policy);
        assert_eq!(d, Duration::from_secs(6));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &policy);
        }
    }
}
