//! # Work Queue
//!
//! Rate-limited, deduplicating queue of keys to reconcile.
//!
//! - A key is queued at most once; adding it again while queued is a no-op
//! - A key handed to a worker is never handed out again until `done`;
//!   adds in the meantime mark it dirty and re-queue it on `done`
//! - `add_after` coalesces pending delayed adds to the earliest deadline
//! - `add_rate_limited` delays a key by its per-key exponential backoff
//! - After `shutdown` no key is accepted or handed out

use crate::config::duration::MAX_DURATION;
use crate::controller::backoff::ItemExponentialRateLimiter;
use crate::observability::metrics;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
struct QueueState<K> {
    queue: VecDeque<K>,
    dirty: HashSet<K>,
    processing: HashSet<K>,
    waiting: HashMap<K, Instant>,
    shutting_down: bool,
}

#[derive(Debug)]
struct Inner<K> {
    name: String,
    state: Mutex<QueueState<K>>,
    limiter: Mutex<ItemExponentialRateLimiter<K>>,
    notify: Notify,
    shutdown: CancellationToken,
}

/// Handle to a shared work queue; clones refer to the same queue
#[derive(Debug)]
pub struct WorkQueue<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Display + Debug + Send + Sync + 'static,
{
    /// Create a queue whose rate limiter starts at `base_delay` and grows by
    /// `multiplier` per failure up to `max_delay`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    waiting: HashMap::new(),
                    shutting_down: false,
                }),
                limiter: Mutex::new(ItemExponentialRateLimiter::new(
                    base_delay, max_delay, multiplier,
                )),
                notify: Notify::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn state(&self) -> MutexGuard<'_, QueueState<K>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn limiter(&self) -> MutexGuard<'_, ItemExponentialRateLimiter<K>> {
        self.inner
            .limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `key` for processing
    pub fn add(&self, key: K) {
        let mut state = self.state();
        if state.shutting_down {
            debug!("Queue {} is shutting down, dropping {}", self.inner.name, key);
            return;
        }
        if state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        metrics::increment_queue_adds();
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        metrics::set_queue_depth(state.queue.len());
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Queue `key` once `delay` has elapsed
    ///
    /// A pending delayed add for the same key is replaced only if this one
    /// fires earlier. Delays are capped at `MAX_DURATION`.
    pub fn add_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let deadline = Instant::now() + delay.min(MAX_DURATION);
        {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            if let Some(existing) = state.waiting.get(&key) {
                if *existing <= deadline {
                    return;
                }
            }
            state.waiting.insert(key.clone(), deadline);
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => queue.fire(key, deadline),
                () = queue.inner.shutdown.cancelled() => {}
            }
        });
    }

    fn fire(&self, key: K, deadline: Instant) {
        let due = {
            let mut state = self.state();
            if state.waiting.get(&key) == Some(&deadline) {
                state.waiting.remove(&key);
                true
            } else {
                false
            }
        };
        if due {
            self.add(key);
        }
    }

    /// Queue `key` after its per-key backoff delay
    pub fn add_rate_limited(&self, key: K) {
        let delay = self.limiter().when(&key);
        debug!(
            "Queue {}: requeuing {} in {:?}",
            self.inner.name, key, delay
        );
        metrics::increment_requeues();
        self.add_after(key, delay);
    }

    /// Clear the failure history of `key`
    pub fn forget(&self, key: &K) {
        self.limiter().forget(key);
    }

    /// Failures recorded for `key` since it was last forgotten
    #[must_use]
    pub fn num_requeues(&self, key: &K) -> u32 {
        self.limiter().num_requeues(key)
    }

    /// Wait for the next key; `None` once the queue is shut down
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let mut state = self.state();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    metrics::set_queue_depth(state.queue.len());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Mark `key` as finished, re-queuing it if it was added meanwhile
    pub fn done(&self, key: &K) {
        let mut state = self.state();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            metrics::set_queue_depth(state.queue.len());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Number of keys waiting to be handed out
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Stop accepting keys, drop pending delayed adds and wake all waiters
    pub fn shutdown(&self) {
        {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
            state.waiting.clear();
        }
        debug!("Queue {} shutting down", self.inner.name);
        self.inner.shutdown.cancel();
        self.inner.notify.notify_waiters();
    }
}
