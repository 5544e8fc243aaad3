//! Cancellable delayed tasks driven by the host event loop.
//!
//! Nothing here spawns threads or timers: the embedding loop calls
//! `Editor::tick` and the scheduler hands back whatever came due.
use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Hand-driven clock for hosts that own their own time source, and for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.set(self.now.get().saturating_add(delta_ms));
    }

    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledTask<K> {
    key: K,
    due_at: u64,
    sequence: u64,
}

/// At most one pending task per key; scheduling an existing key replaces it.
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    tasks: Vec<ScheduledTask<K>>,
    sequence: u64,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            sequence: 0,
        }
    }
}

impl<K: Clone + PartialEq + std::fmt::Debug> Scheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: K, now_ms: u64, delay_ms: u64) -> u64 {
        let due_at = now_ms.saturating_add(delay_ms);
        self.sequence = self.sequence.wrapping_add(1);
        let sequence = self.sequence;
        if let Some(task) = self.tasks.iter_mut().find(|task| task.key == key) {
            tracing::trace!(?key, due_at, "rescheduled pending task");
            task.due_at = due_at;
            task.sequence = sequence;
        } else {
            self.tasks.push(ScheduledTask {
                key,
                due_at,
                sequence,
            });
        }
        due_at
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.key != key);
        before != self.tasks.len()
    }

    pub fn due_at(&self, key: &K) -> Option<u64> {
        self.tasks
            .iter()
            .find(|task| &task.key == key)
            .map(|task| task.due_at)
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.due_at(key).is_some()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.tasks.iter().map(|task| task.due_at).min()
    }

    /// Removes and returns every task due at `now_ms`, earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<K> {
        let mut due = Vec::new();
        self.tasks.retain(|task| {
            if task.due_at <= now_ms {
                due.push(task.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|task| (task.due_at, task.sequence));
        due.into_iter().map(|task| task.key).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
