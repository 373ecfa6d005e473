//! Bounded, priority-ordered queue shared between producers and workers.
//!
//! The queue holds [`SortKey`]s, not job payloads: producers offer keys for
//! jobs they discovered in storage, workers block in [`JobQueue::shift`]
//! until a key at an acceptable priority is available, then fetch the full
//! row behind it. One mutex guards all state and one condition variable
//! provides wake-ups, so the entire public surface is serialized.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::core::error::CoreError;
use crate::core::sort_key::SortKey;

/// State behind the queue's single lock.
struct QueueState {
    /// Always sorted ascending by `(priority, run_at_ms, id)`.
    keys: VecDeque<SortKey>,
    stopped: bool,
}

/// Concurrent bounded priority queue of [`SortKey`]s.
///
/// Capacity is fixed at construction. When a push overflows it, entries are
/// evicted from the low-priority end (numerically largest tuples) and their
/// ids are returned so the caller can release any external resources held
/// for them, such as advisory row locks.
pub struct JobQueue {
    max_size: usize,
    state: Mutex<QueueState>,
    wake: Condvar,
}

impl JobQueue {
    /// Create a queue holding at most `max_size` keys.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if `max_size` is zero.
    pub fn new(max_size: usize) -> Result<Self, CoreError> {
        if max_size == 0 {
            return Err(CoreError::InvalidConfig(
                "max_size must be greater than 0".into(),
            ));
        }
        Ok(Self {
            max_size,
            state: Mutex::new(QueueState {
                keys: VecDeque::with_capacity(max_size.min(1024)),
                stopped: false,
            }),
            wake: Condvar::new(),
        })
    }

    /// Insert one or more keys at their sorted positions and return the ids
    /// evicted to stay within capacity, in eviction order (largest tuple
    /// first).
    ///
    /// Every thread blocked in [`JobQueue::shift`] is woken. The wake is a
    /// broadcast with whole-queue granularity, not targeted at the waiter
    /// whose threshold the new key satisfies, so woken threads re-check
    /// their predicate and may re-block.
    pub fn push(&self, keys: impl IntoIterator<Item = SortKey>) -> Vec<i64> {
        let mut state = self.state.lock();
        for key in keys {
            let at = state.keys.partition_point(|queued| queued.sorts_before(&key));
            state.keys.insert(at, key);
        }
        self.wake.notify_all();

        let mut evicted = Vec::new();
        while state.keys.len() > self.max_size {
            if let Some(dropped) = state.keys.pop_back() {
                evicted.push(dropped.id);
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted overflow keys");
        }
        evicted
    }

    /// Block until a key with `priority <= max_priority` is at the front,
    /// then remove and return it. Returns `None` once the queue is stopped,
    /// immediately and permanently. Pass `i32::MAX` for no threshold.
    ///
    /// Safe under spurious wakes: the predicate is re-evaluated on every
    /// wake, never the reason for waking.
    pub fn shift(&self, max_priority: i32) -> Option<SortKey> {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return None;
            }
            match state.keys.front() {
                Some(front) if front.priority <= max_priority => return state.keys.pop_front(),
                _ => self.wake.wait(&mut state),
            }
        }
    }

    /// Fast admission test: would `key` survive being pushed?
    ///
    /// True if free capacity exists, or if `key` outranks the current
    /// lowest-ranked entry (so something else would be evicted instead).
    /// False means pushing `key` would evict it immediately; the producer
    /// should skip fetching its row and let storage retry it later.
    #[must_use]
    pub fn accepts(&self, key: &SortKey) -> bool {
        let state = self.state.lock();
        state.keys.len() < self.max_size
            || state.keys.back().is_some_and(|last| key.sorts_before(last))
    }

    /// Remaining capacity. Non-negative at rest; a push may exceed capacity
    /// transiently but trims before releasing the lock, so callers never
    /// observe a negative value.
    #[must_use]
    pub fn space(&self) -> i64 {
        let state = self.state.lock();
        let capacity = i64::try_from(self.max_size).unwrap_or(i64::MAX);
        let used = i64::try_from(state.keys.len()).unwrap_or(i64::MAX);
        capacity - used
    }

    /// Number of keys currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    /// True when no keys are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().keys.is_empty()
    }

    /// Capacity fixed at construction.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Defensive copy of the queued keys in sorted order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SortKey> {
        self.state.lock().keys.iter().copied().collect()
    }

    /// Stop the queue: every pending and future [`JobQueue::shift`] call
    /// returns `None` without blocking. Idempotent.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        drop(state);
        self.wake.notify_all();
        info!("job queue stopping");
    }

    /// True once [`JobQueue::stop`] has been called.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.state.lock().stopped
    }

    /// Evict everything, returning ids under the same contract as the push
    /// eviction return (largest tuple first).
    pub fn clear(&self) -> Vec<i64> {
        let mut state = self.state.lock();
        let mut evicted = Vec::with_capacity(state.keys.len());
        while let Some(dropped) = state.keys.pop_back() {
            evicted.push(dropped.id);
        }
        evicted
    }
}
