//! Policy engine for circuit breaker trip and recovery decisions.

use crate::state::Counts;

/// Outcome of evaluating the probes let through while half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The target has recovered; close the circuit.
    Close,

    /// No probe outcome has been reported yet.
    Pending,

    /// The probes did not meet the bar; open the circuit again.
    Reopen,
}

/// A policy that determines when to trip and when to recover a circuit breaker.
///
/// Both methods are evaluated while the breaker's lock is held and must not block.
pub trait BreakerPolicy: Send + Sync + 'static {
    /// Determines if a closed circuit should trip open based on the window counts.
    fn should_trip(&self, counts: &Counts) -> bool;

    /// Judges the counts accumulated since the circuit went half-open.
    fn probe_verdict(&self, counts: &Counts) -> ProbeVerdict;
}

/// Default policy: trip on a failure count, recover on a success-to-failure ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioPolicy {
    failure_threshold: u64,
    success_threshold_ratio: f64,
}

impl RatioPolicy {
    /// Creates a new ratio policy.
    pub fn new(failure_threshold: u64, success_threshold_ratio: f64) -> Self {
        Self {
            failure_threshold,
            success_threshold_ratio,
        }
    }

    /// Failures within one window that trip the circuit.
    pub fn failure_threshold(&self) -> u64 {
        self.failure_threshold
    }

    /// Minimum successes-per-failure ratio required to close a half-open circuit.
    pub fn success_threshold_ratio(&self) -> f64 {
        self.success_threshold_ratio
    }
}

impl BreakerPolicy for RatioPolicy {
    fn should_trip(&self, counts: &Counts) -> bool {
        counts.failures >= self.failure_threshold
    }

    fn probe_verdict(&self, counts: &Counts) -> ProbeVerdict {
        match counts.success_ratio() {
            None => ProbeVerdict::Pending,
            Some(ratio) if ratio >= self.success_threshold_ratio => ProbeVerdict::Close,
            Some(_) => ProbeVerdict::Reopen,
        }
    }
}

/// Recovers only after a run of successes with no failure in between.
///
/// Stricter than [`RatioPolicy`]: any failure reported while half-open reopens
/// the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsecutivePolicy {
    failure_threshold: u64,
    success_threshold: u64,
}

impl ConsecutivePolicy {
    /// Creates a new consecutive-outcome policy.
    pub fn new(failure_threshold: u64, success_threshold: u64) -> Self {
        Self {
            failure_threshold,
            success_threshold,
        }
    }
}

impl BreakerPolicy for ConsecutivePolicy {
    fn should_trip(&self, counts: &Counts) -> bool {
        counts.failures >= self.failure_threshold
    }

    fn probe_verdict(&self, counts: &Counts) -> ProbeVerdict {
        if counts.failures > 0 {
            ProbeVerdict::Reopen
        } else if counts.successes >= self.success_threshold {
            ProbeVerdict::Close
        } else {
            ProbeVerdict::Pending
        }
    }
}
