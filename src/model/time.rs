/// This module handles all time-related operations for the simulation
///
/// Key concepts:
/// - SimulationTime: a logical clock counter measured in whole seconds
/// - Scheduled: a pending resumption of one process at a specific time
/// - Scheduler: priority queue that resumes processes in time order
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Represents a point in simulated time
///
/// Haul cycles last minutes to hours, so seconds give enough resolution
/// while keeping ordering exact (no float comparison in the heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimulationTime(pub u64);

impl SimulationTime {
    pub const ZERO: SimulationTime = SimulationTime(0);

    /// Create a new time point
    pub fn new(seconds: u64) -> Self {
        SimulationTime(seconds)
    }

    /// Build a time point from fractional hours, rounded to the nearest second
    pub fn from_hours(hours: f64) -> Self {
        SimulationTime(hours_to_secs(hours))
    }

    /// Get the raw time value
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_hours(&self) -> f64 {
        self.0 as f64 / SECONDS_PER_HOUR
    }

    /// Calculate duration between two times
    /// Example: time_later - time_earlier = duration
    pub fn duration_until(&self, other: SimulationTime) -> u64 {
        other.0.saturating_sub(self.0)
    }

    /// Add time to this time point
    /// Example: time_now + 30 seconds = loading_end_time
    pub fn add_secs(&self, secs: u64) -> SimulationTime {
        SimulationTime(self.0.saturating_add(secs))
    }
}

/// Convert a duration in hours to whole seconds
///
/// Negative and NaN inputs clamp to zero; the engine never waits backwards.
/// Infinite or oversized inputs saturate at `u64::MAX`.
pub fn hours_to_secs(hours: f64) -> u64 {
    if hours.is_nan() || hours <= 0.0 {
        0
    } else {
        (hours * SECONDS_PER_HOUR).round() as u64
    }
}

/// A process resumption waiting in the queue
///
/// `seq` is the insertion counter; it breaks ties between resumptions
/// scheduled for the same instant so they run in FIFO order.
#[derive(Debug, Clone)]
pub struct Scheduled<U> {
    /// WHEN this unit resumes
    pub time: SimulationTime,
    seq: u64,
    /// WHICH unit resumes
    pub unit: U,
}

impl<U> PartialEq for Scheduled<U> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<U> Eq for Scheduled<U> {}

impl<U> PartialOrd for Scheduled<U> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed comparison turns BinaryHeap into a MIN-HEAP:
/// earliest time pops first, then lowest insertion sequence.
impl<U> Ord for Scheduled<U> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The discrete-event core
///
/// Think of this as a calendar:
/// - now: what time is it in the simulation?
/// - queue: which process resumes next, and when?
///
/// Only one unit is ever resumed at a time. "Concurrency" between trucks is
/// the interleaving of their resumptions on this single queue.
#[derive(Debug)]
pub struct Scheduler<U> {
    now: SimulationTime,
    queue: BinaryHeap<Scheduled<U>>,
    next_seq: u64,
}

impl<U> Scheduler<U> {
    /// Create a new scheduler starting at time 0
    pub fn new() -> Self {
        Scheduler {
            now: SimulationTime::ZERO,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// The current simulation time
    pub fn now(&self) -> SimulationTime {
        self.now
    }

    /// Resume `unit` after `delay_secs` have elapsed
    pub fn schedule(&mut self, delay_secs: u64, unit: U) {
        let time = self.now.add_secs(delay_secs);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { time, seq, unit });
    }

    /// Resume `unit` at the current instant, after everything already
    /// queued for this instant
    pub fn schedule_immediate(&mut self, unit: U) {
        self.schedule(0, unit);
    }

    /// Check if there are more resumptions to process
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next resumption WITHOUT removing it
    pub fn peek_time(&self) -> Option<SimulationTime> {
        self.queue.peek().map(|entry| entry.time)
    }

    /// Pop the next resumption and move the clock forward to it
    pub fn step(&mut self) -> Option<Scheduled<U>> {
        let entry = self.queue.pop()?;
        self.now = entry.time;
        Some(entry)
    }

    /// Run every resumption scheduled at or before `target`
    ///
    /// The callback receives the scheduler so a resumed unit can schedule
    /// its own next resumption (or wake others). Once the queue holds
    /// nothing due by `target` the clock is moved to `target`; whatever is
    /// still queued stays abandoned in place until the next call.
    /// Returns the number of resumptions processed.
    pub fn advance_until(
        &mut self,
        target: SimulationTime,
        mut resume: impl FnMut(&mut Self, U),
    ) -> usize {
        let mut resumed = 0;
        while self.peek_time().is_some_and(|time| time <= target) {
            let Some(entry) = self.step() else { break };
            resume(self, entry.unit);
            resumed += 1;
        }
        if self.now < target {
            self.now = target;
        }
        resumed
    }

    /// Drop every pending resumption and rewind the clock to zero
    pub fn reset(&mut self) {
        self.queue.clear();
        self.now = SimulationTime::ZERO;
        self.next_seq = 0;
    }
}

impl<U> Default for Scheduler<U> {
    fn default() -> Self {
        Scheduler::new()
    }
}
