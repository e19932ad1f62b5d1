//! Scheduled-task queue on a simulated clock
//!
//! Every timed mutation of the world (bot steering, decay, hazard spawning,
//! respawns and expiries) is an entry here. Tasks due at the same instant
//! run in the order they were scheduled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::game::state::{HazardId, PlayerId};

/// Work the world performs when a scheduled entry comes due
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Steer and move every bot once
    BotTick,
    /// Apply size decay to oversized players
    Decay,
    /// Create a new hazard zone
    SpawnHazard,
    /// Replace one consumed pickup
    RespawnPickup,
    /// Remove a hazard zone at the end of its lifetime
    ExpireHazard(HazardId),
    /// Recreate a bot removed by a hazard zone
    RespawnBot(PlayerId),
}

impl Task {
    /// Recurring tasks belong to the world itself rather than to one entity
    #[inline]
    pub fn is_recurring(&self) -> bool {
        matches!(self, Task::BotTick | Task::Decay | Task::SpawnHazard)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    due: Duration,
    seq: u64,
    every: Option<Duration>,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

/// Min-queue of tasks ordered by (due time, scheduling order)
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn push(&mut self, due: Duration, every: Option<Duration>, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry {
            due,
            seq,
            every,
            task,
        }));
    }

    /// Run `task` once at `now + delay`
    ///
    /// A due time past `Duration::MAX` saturates, so the task never fires.
    pub fn schedule_once(&mut self, now: Duration, delay: Duration, task: Task) {
        self.push(now.saturating_add(delay), None, task);
    }

    /// Run `task` at `now + every`, then every `every` after that
    ///
    /// A zero interval would never let the clock catch up; it is rejected.
    pub fn schedule_repeating(&mut self, now: Duration, every: Duration, task: Task) -> bool {
        if every.is_zero() {
            return false;
        }
        self.push(now.saturating_add(every), Some(every), task);
        true
    }

    /// Next task due at or before `now`, re-arming it if it repeats
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Task)> {
        if self.queue.peek().map_or(true, |Reverse(e)| e.due > now) {
            return None;
        }
        let Reverse(entry) = self.queue.pop()?;
        // A repeat that would overflow the clock is dropped
        if let Some(next) = entry.every.and_then(|every| entry.due.checked_add(every)) {
            self.push(next, entry.every, entry.task.clone());
        }
        Some((entry.due, entry.task))
    }

    /// Drop every pending entry whose task matches `predicate`
    pub fn cancel_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Task) -> bool,
    {
        let before = self.queue.len();
        self.queue.retain(|Reverse(entry)| !predicate(&entry.task));
        before - self.queue.len()
    }

    /// Drop everything
    pub fn cancel_all(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        count
    }

    pub fn count_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&Task) -> bool,
    {
        self.queue.iter().filter(|Reverse(e)| predicate(&e.task)).count()
    }
}
