//! Single-threaded timer queue
//!
//! Timers carry a typed payload instead of a callback. The owner pops due
//! timers in deadline order and decides what each one means, which keeps all
//! state transitions on the caller's thread.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Cancellable reference to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A timer popped from the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub handle: TimerHandle,
    pub deadline: Instant,
    pub payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    /// Ordered by deadline, then by scheduling order for equal deadlines
    entries: BTreeMap<(Instant, u64), T>,
    deadlines: HashMap<u64, Instant>,
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, deadline: Instant, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Schedule `delay` after `now`; `None` if that deadline is not representable
    pub fn schedule_after(
        &mut self,
        now: Instant,
        delay: Duration,
        payload: T,
    ) -> Option<TimerHandle> {
        let deadline = now.checked_add(delay)?;
        Some(self.schedule(deadline, payload))
    }

    /// Cancel a pending timer. Cancelling an unknown or already fired timer is a no-op.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let deadline = self.deadlines.remove(&handle.0)?;
        self.entries.remove(&(deadline, handle.0))
    }

    /// Drop every pending timer at once
    pub fn clear(&mut self) {
        self.entries.clear();
        self.deadlines.clear();
    }

    #[must_use]
    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    #[must_use]
    pub fn deadline(&self, handle: TimerHandle) -> Option<Instant> {
        self.deadlines.get(&handle.0).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<Fired<T>> {
        let (deadline, id) = *self.entries.keys().next()?;
        if deadline > now {
            return None;
        }
        let payload = self.entries.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some(Fired {
            handle: TimerHandle(id),
            deadline,
            payload,
        })
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
