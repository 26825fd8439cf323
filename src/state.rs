//! Circuit breaker state machine implementation.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Circuit is closed and calls are allowed.
    Closed,

    /// Circuit is open and calls are rejected without touching the target.
    Open,

    /// Circuit is letting probes through to test recovery.
    HalfOpen,
}

impl State {
    /// Stable lowercase name, used for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure and success counts accumulated in the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Failures reported since the last reset.
    pub failures: u64,

    /// Successes reported since the last reset.
    pub successes: u64,
}

impl Counts {
    /// Ratio of successes to failures.
    ///
    /// Returns `None` when nothing has been recorded. Successes with zero failures
    /// yield `f64::INFINITY`, which satisfies any threshold.
    pub fn success_ratio(&self) -> Option<f64> {
        match (self.successes, self.failures) {
            (0, 0) => None,
            (_, 0) => Some(f64::INFINITY),
            (successes, failures) => Some(successes as f64 / failures as f64),
        }
    }

    /// Total number of recorded outcomes.
    pub fn total(&self) -> u64 {
        self.failures.saturating_add(self.successes)
    }
}

/// Point-in-time view of a breaker, taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Current state.
    pub state: State,

    /// Counters of the current window.
    pub counts: Counts,

    /// When the current counting window began.
    pub window_started_at: Instant,

    /// When the breaker entered its current state.
    pub entered_at: Instant,

    /// Most recent failure report, if any.
    pub last_failure_at: Option<Instant>,

    /// Most recent success report, if any.
    pub last_success_at: Option<Instant>,
}

/// A state change applied under the lock, replayed to hooks and sinks after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: State,
    pub(crate) to: State,
    pub(crate) counts: Counts,
}

/// The single guarded record behind a breaker: mode, counters and timestamps.
#[derive(Debug)]
pub(crate) struct StateRecord {
    state: State,
    counts: Counts,
    window_started_at: Instant,
    entered_at: Instant,
    last_failure_at: Option<Instant>,
    last_success_at: Option<Instant>,
}

impl StateRecord {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            state: State::Closed,
            counts: Counts::default(),
            window_started_at: now,
            entered_at: now,
            last_failure_at: None,
            last_success_at: None,
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn counts(&self) -> Counts {
        self.counts
    }

    pub(crate) fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            counts: self.counts,
            window_started_at: self.window_started_at,
            entered_at: self.entered_at,
            last_failure_at: self.last_failure_at,
            last_success_at: self.last_success_at,
        }
    }

    /// Resets the counters when the window is older than `count_window`.
    /// Returns true if a reset happened.
    pub(crate) fn expire_window(&mut self, now: Instant, count_window: Duration) -> bool {
        if now.saturating_duration_since(self.window_started_at) > count_window {
            self.reset_counts(now);
            return true;
        }

        false
    }

    /// Zeroes both counters and starts a new window at `now`.
    pub(crate) fn reset_counts(&mut self, now: Instant) {
        self.counts = Counts::default();
        self.window_started_at = now;
    }

    pub(crate) fn record_failure(&mut self, now: Instant) {
        self.counts.failures = self.counts.failures.saturating_add(1);
        self.last_failure_at = Some(now);
    }

    pub(crate) fn record_success(&mut self, now: Instant) {
        self.counts.successes = self.counts.successes.saturating_add(1);
        self.last_success_at = Some(now);
    }

    /// How long an open breaker has been cooling down.
    ///
    /// Measured from the later of the last failure and the moment the breaker
    /// opened, so late failures from in-flight calls extend the cooldown.
    pub(crate) fn cooldown_elapsed(&self, now: Instant) -> Duration {
        let anchor = match self.last_failure_at {
            Some(failed_at) => failed_at.max(self.entered_at),
            None => self.entered_at,
        };
        now.saturating_duration_since(anchor)
    }

    /// Time spent in the current state.
    pub(crate) fn time_in_state(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.entered_at)
    }

    /// Restarts the clock of the current state without changing it.
    pub(crate) fn rearm(&mut self, now: Instant) {
        self.entered_at = now;
    }

    /// Moves to `to`, returning the transition if the state actually changed.
    ///
    /// Entering Closed or HalfOpen starts a fresh window: Closed begins a new
    /// history, HalfOpen judges only the outcomes of its own probes.
    pub(crate) fn transition(&mut self, to: State, now: Instant) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }

        let counts = self.counts;
        self.state = to;
        self.entered_at = now;
        if matches!(to, State::Closed | State::HalfOpen) {
            self.reset_counts(now);
        }

        Some(Transition { from, to, counts })
    }
}
