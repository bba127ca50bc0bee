//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciles. Delays grow along the Fibonacci
//! sequence, more slowly than exponential backoff, so a parent whose Images
//! cannot be written yet is retried often at first without hammering the API
//! server later.
//!
//! Sequence for min = 5s, max = 300s: 5s, 5s, 10s, 15s, 25s, 40s, ... 300s (max).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous delay
    prev: Duration,
    /// Current delay
    current: Duration,
    /// Maximum delay
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given bounds
    ///
    /// `min` is used for the first two delays; the sequence is capped at `max`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }
}

/// Per-key retry state for the dispatcher's error policy.
///
/// Each reconcile key gets its own backoff sequence, dropped on the key's
/// next successful reconcile.
#[derive(Debug)]
pub struct RetryTracker {
    min: Duration,
    max: Duration,
    states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl RetryTracker {
    /// Create a tracker whose sequences run from `min` to `max`
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `key` after another failure
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(self.min, self.max))
            .next_backoff()
    }

    /// Forget the failures of `key`
    pub fn reset(&self, key: &str) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of keys currently backing off
    pub fn tracked(&self) -> usize {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(secs(5), secs(300));

        assert_eq!(backoff.next_backoff(), secs(5));
        assert_eq!(backoff.next_backoff(), secs(5));
        assert_eq!(backoff.next_backoff(), secs(10));
        assert_eq!(backoff.next_backoff(), secs(15));
        assert_eq!(backoff.next_backoff(), secs(25));
        assert_eq!(backoff.next_backoff(), secs(40));
        assert_eq!(backoff.next_backoff(), secs(65));
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(secs(1), secs(10));

        let delays: Vec<Duration> = (0..9).map(|_| backoff.next_backoff()).collect();
        assert_eq!(
            delays,
            [1, 1, 2, 3, 5, 8, 10, 10, 10].map(secs).to_vec()
        );
    }

    #[test]
    fn test_retry_tracker_is_per_key() {
        let tracker = RetryTracker::new(secs(1), secs(10));

        assert_eq!(tracker.next_delay("bar/foo"), secs(1));
        assert_eq!(tracker.next_delay("bar/foo"), secs(1));
        assert_eq!(tracker.next_delay("bar/foo"), secs(2));
        assert_eq!(tracker.next_delay("bar/baz"), secs(1));
        assert_eq!(tracker.tracked(), 2);
    }

    #[test]
    fn test_retry_tracker_reset_restarts_sequence() {
        let tracker = RetryTracker::new(secs(1), secs(10));

        tracker.next_delay("bar/foo");
        tracker.next_delay("bar/foo");
        tracker.next_delay("bar/foo");
        tracker.reset("bar/foo");

        assert_eq!(tracker.tracked(), 0);
        assert_eq!(tracker.next_delay("bar/foo"), secs(1));
    }
}
