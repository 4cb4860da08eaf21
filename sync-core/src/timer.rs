//! Elapsed-time and interval-crossing state machine.
//!
//! Elapsed time is `accumulated + (now - segment_start)` while running and
//! `accumulated` while stopped, so pausing and resuming never loses or
//! double-counts time. Ticks only sample the clock; a late or coalesced tick
//! produces the same elapsed time as an on-time one.
//!
//! ```text
//! Stopped --start--> Running --stop--> Stopped
//!    ^                                   |
//!    +--------------reset----------------+   (elapsed and crossings zeroed)
//! ```

use std::time::{Duration, Instant};

/// One interval boundary being passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    /// Number of interval boundaries passed since the run started.
    pub count: u64,
    /// Elapsed time when the crossing was detected.
    pub elapsed: Duration,
    /// Interval length in minutes at the time of detection.
    pub interval_minutes: u32,
}

/// Timer state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerState {
    /// Time banked from completed run segments.
    accumulated: Duration,
    /// Start of the current run segment, if running.
    segment_start: Option<Instant>,
    /// Highest boundary index that already produced a crossing.
    last_crossed: u64,
}

/// Index of the last interval boundary at or before `elapsed`.
///
/// Returns `None` for a non-positive interval so callers never divide by zero.
pub fn crossing_index(elapsed: Duration, interval_minutes: i64) -> Option<u64> {
    if interval_minutes <= 0 {
        return None;
    }
    let interval_secs = (interval_minutes as u64).checked_mul(60)?;
    Some(elapsed.as_secs() / interval_secs)
}

impl TimerState {
    /// Create a stopped timer with nothing elapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run segment is in progress.
    pub fn is_running(&self) -> bool {
        self.segment_start.is_some()
    }

    /// Boundary index of the most recent crossing.
    pub fn last_crossed(&self) -> u64 {
        self.last_crossed
    }

    /// Elapsed time as of `now`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.segment_start {
            Some(start) => self.accumulated + now.saturating_duration_since(start),
            None => self.accumulated,
        }
    }

    /// Begin a run segment. Returns `false` if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.segment_start = Some(now);
        true
    }

    /// End the run segment, banking its time. Returns `false` if already stopped.
    pub fn stop(&mut self, now: Instant) -> bool {
        match self.segment_start.take() {
            Some(start) => {
                self.accumulated += now.saturating_duration_since(start);
                true
            }
            None => false,
        }
    }

    /// Stop and zero everything, including the crossing counter.
    pub fn reset(&mut self, now: Instant) {
        self.stop(now);
        self.accumulated = Duration::ZERO;
        self.last_crossed = 0;
    }

    /// Sample the clock and report a new crossing, if any.
    ///
    /// `interval_minutes` is read fresh for every tick, so a changed interval
    /// applies immediately. The crossing count is the boundary index since
    /// the run began, not the number of boundaries passed since the last
    /// tick; a tick that skips several boundaries reports only the latest.
    pub fn tick(&mut self, now: Instant, interval_minutes: i64) -> Option<Crossing> {
        if !self.is_running() {
            return None;
        }
        let elapsed = self.elapsed(now);
        let index = crossing_index(elapsed, interval_minutes)?;
        if index > self.last_crossed && index > 0 {
            self.last_crossed = index;
            Some(Crossing {
                count: index,
                elapsed,
                interval_minutes: interval_minutes as u32,
            })
        } else {
            None
        }
    }
}
