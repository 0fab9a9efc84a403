//! # Exponential Backoff
//!
//! Provides the exponential backoff used for retries across the controller:
//! certificate issuance retries and per-key requeue delays in the work queue.
//!
//! Each call to `next_backoff()` returns the current delay and multiplies it
//! for the next call, capped at the configured maximum.
//!
//! ## Usage
//!
//! ```rust
//! use ingress_tls_controller::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_secs(30), Duration::from_secs(300), 2.0);
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(30));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(60));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(120));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(240));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(300));
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Exponential backoff calculator
///
/// Generates delays `initial, initial * m, initial * m^2, ...` capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay (for reset)
    initial: Duration,
    /// Delay returned by the next call
    current: Duration,
    /// Ceiling for every delay
    max: Duration,
    /// Growth factor applied after each call
    multiplier: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff
    ///
    /// # Arguments
    ///
    /// * `initial` - First delay returned
    /// * `max` - Ceiling applied to every delay
    /// * `multiplier` - Growth factor, values below 1.0 are treated as 1.0
    ///
    /// # Example
    ///
    /// ```
    /// use ingress_tls_controller::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let backoff = ExponentialBackoff::new(Duration::from_secs(600), Duration::from_secs(86_400), 2.0);
    /// ```
    #[must_use]
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            initial: initial.min(max),
            current: initial.min(max),
            max,
            multiplier,
        }
    }

    /// Get the next delay and advance the sequence
    ///
    /// # Example
    ///
    /// ```
    /// use ingress_tls_controller::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 3.0);
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(3));
    /// ```
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);

        result
    }

    /// Reset the backoff to the initial delay
    ///
    /// # Example
    ///
    /// ```
    /// use ingress_tls_controller::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(Duration::from_secs(10), Duration::from_secs(60), 2.0);
    /// backoff.next_backoff();
    /// backoff.next_backoff();
    /// backoff.reset();
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
    /// ```
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Backoff state tracked for a single key
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
    pub last_failure: Option<Instant>,
}

impl BackoffState {
    #[must_use]
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self {
            backoff,
            error_count: 0,
            last_failure: None,
        }
    }

    /// Record a failure and return the delay before the next attempt
    pub fn increment_error(&mut self) -> Duration {
        self.error_count = self.error_count.saturating_add(1);
        self.last_failure = Some(Instant::now());
        self.backoff.next_backoff()
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.last_failure = None;
        self.backoff.reset();
    }
}

/// Per-key exponential failure rate limiter
///
/// Every key starts at `base` and doubles (by `multiplier`) on each
/// failure up to `max`, until it is forgotten after a success.
#[derive(Debug)]
pub struct ItemExponentialRateLimiter<K> {
    base: Duration,
    max: Duration,
    multiplier: f64,
    states: HashMap<K, BackoffState>,
}

impl<K: Clone + Eq + Hash> ItemExponentialRateLimiter<K> {
    #[must_use]
    pub fn new(base: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            base,
            max,
            multiplier,
            states: HashMap::new(),
        }
    }

    /// Delay before `key` may be retried, advancing its backoff
    pub fn when(&mut self, key: &K) -> Duration {
        let (base, max, multiplier) = (self.base, self.max, self.multiplier);
        self.states
            .entry(key.clone())
            .or_insert_with(|| BackoffState::new(ExponentialBackoff::new(base, max, multiplier)))
            .increment_error()
    }

    /// Drop the failure history of `key`
    pub fn forget(&mut self, key: &K) {
        self.states.remove(key);
    }

    /// Number of failures recorded for `key` since it was last forgotten
    #[must_use]
    pub fn num_requeues(&self, key: &K) -> u32 {
        self.states.get(key).map_or(0, |state| state.error_count)
    }
}
