//! Single-threaded deferred-callback queue
//!
//! All periodic work in a lock session is a one-shot entry in this queue,
//! re-armed explicitly by whoever handles it. Time is logical: the queue only
//! moves forward when the driver advances it, which keeps tests deterministic.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Cancellation handle for a scheduled entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

pub struct EventQueue<E> {
    now: Duration,
    next_id: u64,
    // Keyed by (deadline, id) so equal deadlines pop in scheduling order
    pending: BTreeMap<(Duration, u64), E>,
    deadlines: HashMap<u64, Duration>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Logical time since the queue was created
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `event` to fire `delay` from now
    pub fn schedule(&mut self, delay: Duration, event: E) -> TaskToken {
        self.next_id += 1;
        let id = self.next_id;
        let deadline = self.now + delay;
        self.pending.insert((deadline, id), event);
        self.deadlines.insert(id, deadline);
        TaskToken(id)
    }

    /// Cancel a pending entry. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, token: TaskToken) -> bool {
        match self.deadlines.remove(&token.0) {
            Some(deadline) => self.pending.remove(&(deadline, token.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, token: TaskToken) -> bool {
        self.deadlines.contains_key(&token.0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deadline of the earliest pending entry
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest entry due at or before `until`
    ///
    /// The clock moves to that entry's deadline, so anything the handler
    /// schedules is relative to the moment the entry fired.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TaskToken, E)> {
        let (&(deadline, id), _) = self.pending.iter().next()?;
        if deadline > until {
            return None;
        }
        let event = self.pending.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        Some((TaskToken(id), event))
    }

    /// Move the clock to `until` once every due entry has been popped
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Drop every pending entry
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadlines.clear();
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
