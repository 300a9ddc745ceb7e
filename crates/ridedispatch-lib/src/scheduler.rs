//! Virtual clock for deferred dispatch work.
//!
//! Matching latency and the automatic `matched → in-progress` step are not
//! run on timers. They are queued here and executed by the engine when the
//! caller advances the clock, so every mutation happens on the caller's
//! thread.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::ledger::RideId;

/// Deferred transition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Look for a driver for a pending ride.
    MatchDriver,
    /// Move a matched ride to in-progress.
    BeginTrip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub due_ms: u64,
    pub ride_id: RideId,
    pub kind: TaskKind,
    seq: u64,
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap pops the earliest task; equal due
        // times run in scheduling order.
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_seq: u64,
    tasks: BinaryHeap<ScheduledTask>,
}

impl Scheduler {
    /// Scheduler whose clock starts at `now_ms`.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms,
            ..Self::default()
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule_after(&mut self, delay_ms: u64, ride_id: RideId, kind: TaskKind) {
        let task = ScheduledTask {
            due_ms: self.now_ms.saturating_add(delay_ms),
            ride_id,
            kind,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tasks.push(task);
    }

    /// Pop the earliest task due at or before `until_ms`, moving the clock
    /// to its due time.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<ScheduledTask> {
        if self.tasks.peek()?.due_ms > until_ms {
            return None;
        }
        let task = self.tasks.pop()?;
        self.now_ms = self.now_ms.max(task.due_ms);
        Some(task)
    }

    /// Move the clock forward; it never runs backwards.
    pub fn advance_to(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    pub fn next_due(&self) -> Option<u64> {
        self.tasks.peek().map(|task| task.due_ms)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when every queued task is of `kind` (vacuously true when empty).
    pub fn only_kind(&self, kind: TaskKind) -> bool {
        self.tasks.iter().all(|task| task.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
