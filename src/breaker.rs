//! Core circuit breaker implementation.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::config::{BreakerBuilder, BreakerConfig};
use crate::error::{BreakerError, BreakerResult};
use crate::hook::HookRegistry;
use crate::metrics::MetricSink;
use crate::policy::{BreakerPolicy, ProbeVerdict, RatioPolicy};
use crate::state::{BreakerSnapshot, Counts, State, StateRecord, Transition};

/// Inner state of the circuit breaker, shared between clones.
struct BreakerInner<P>
where
    P: BreakerPolicy,
{
    name: String,
    policy: P,
    config: BreakerConfig,
    record: Mutex<StateRecord>,
    clock: Arc<dyn Clock>,
    metric_sink: Arc<dyn MetricSink>,
    hooks: Arc<HookRegistry>,
}

/// A circuit breaker guarding calls to one downstream target.
///
/// Callers ask [`is_allowed`](Self::is_allowed) before every attempt and report the
/// result with [`on_success`](Self::on_success) or [`on_failure`](Self::on_failure).
/// All three take the same lock for their whole body; hooks, metrics and log events
/// run after it is released.
pub struct CircuitBreaker<P = RatioPolicy>
where
    P: BreakerPolicy,
{
    inner: Arc<BreakerInner<P>>,
}

impl CircuitBreaker<RatioPolicy> {
    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> BreakerBuilder<RatioPolicy> {
        BreakerBuilder::new()
    }
}

impl<P> CircuitBreaker<P>
where
    P: BreakerPolicy,
{
    /// Creates a new circuit breaker with the specified policy and settings.
    ///
    /// Prefer the builder, which validates `config` first.
    pub fn new(
        name: String,
        policy: P,
        config: BreakerConfig,
        clock: Arc<dyn Clock>,
        metric_sink: Arc<dyn MetricSink>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let record = StateRecord::new(clock.now());
        let inner = BreakerInner {
            name,
            policy,
            config,
            record: Mutex::new(record),
            clock,
            metric_sink,
            hooks,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Name of the protected target.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Configuration the breaker was built with.
    pub fn config(&self) -> &BreakerConfig {
        &self.inner.config
    }

    /// Gets the current state of the circuit breaker.
    pub fn current_state(&self) -> State {
        self.inner.record.lock().state()
    }

    /// Gets the counters of the current window.
    pub fn counts(&self) -> Counts {
        self.inner.record.lock().counts()
    }

    /// Takes a consistent snapshot of state, counters and timestamps.
    pub fn snapshot(&self) -> BreakerSnapshot {
        self.inner.record.lock().snapshot()
    }

    /// Decides whether the caller may attempt the protected call right now.
    ///
    /// Not idempotent: an open breaker whose recovery timeout has elapsed moves to
    /// half-open and admits the caller as its probe, and a half-open breaker closes
    /// or reopens depending on the probe outcomes reported so far.
    pub fn is_allowed(&self) -> bool {
        let inner = &*self.inner;
        let now = inner.clock.now();

        let (allowed, transition) = {
            let mut record = inner.record.lock();
            self.expire_window(&mut record, now);

            match record.state() {
                State::Closed => (true, None),
                State::Open => {
                    if record.cooldown_elapsed(now) >= inner.config.recovery_timeout {
                        (true, record.transition(State::HalfOpen, now))
                    } else {
                        (false, None)
                    }
                }
                State::HalfOpen => match inner.policy.probe_verdict(&record.counts()) {
                    ProbeVerdict::Close => (true, record.transition(State::Closed, now)),
                    ProbeVerdict::Reopen => (false, record.transition(State::Open, now)),
                    ProbeVerdict::Pending => {
                        // No probe outcome yet; re-arm once a full recovery timeout
                        // has passed without one.
                        if record.time_in_state(now) >= inner.config.recovery_timeout {
                            record.rearm(now);
                            (true, None)
                        } else {
                            (false, None)
                        }
                    }
                },
            }
        };

        self.publish(transition);
        inner.metric_sink.record_admission(&inner.name, allowed);
        if !allowed {
            tracing::trace!(breaker = %inner.name, "call rejected");
            inner.hooks.execute_rejected_hook();
        }

        allowed
    }

    /// Reports a call the caller judged successful.
    pub fn on_success(&self) {
        let inner = &*self.inner;
        let now = inner.clock.now();

        {
            let mut record = inner.record.lock();
            self.expire_window(&mut record, now);
            record.record_success(now);
        }

        inner.metric_sink.record_outcome(&inner.name, true);
        inner.hooks.execute_success_hook();
    }

    /// Reports a call the caller judged failed.
    ///
    /// Trips a closed breaker once the window's failures reach the policy threshold.
    pub fn on_failure(&self) {
        let inner = &*self.inner;
        let now = inner.clock.now();

        let transition = {
            let mut record = inner.record.lock();
            self.expire_window(&mut record, now);
            record.record_failure(now);

            if record.state() == State::Closed && inner.policy.should_trip(&record.counts()) {
                record.transition(State::Open, now)
            } else {
                None
            }
        };

        inner.metric_sink.record_outcome(&inner.name, false);
        inner.hooks.execute_failure_hook();
        self.publish(transition);
    }

    /// Executes a function wrapped by the circuit breaker.
    ///
    /// Any `Err` counts as a failure.
    pub fn call<F, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.call_classified(f, Result::is_err)
    }

    /// Executes a function wrapped by the circuit breaker, letting `is_failure`
    /// decide which results count against the target.
    ///
    /// An `Ok` judged a failure (say, a 503 response) is still returned as `Ok`; an
    /// `Err` judged harmless (say, a client-side cancellation) is still returned as
    /// [`BreakerError::Operation`].
    pub fn call_classified<F, C, T, E>(&self, f: F, is_failure: C) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        C: FnOnce(&Result<T, E>) -> bool,
    {
        if !self.is_allowed() {
            return Err(BreakerError::Open);
        }

        let start = self.inner.clock.now();
        let result = f();
        let duration = self.inner.clock.now().saturating_duration_since(start);

        self.inner
            .metric_sink
            .record_latency(&self.inner.name, duration);
        self.report(!is_failure(&result));

        result.map_err(BreakerError::Operation)
    }

    /// Forces the circuit breaker to the open state.
    ///
    /// Returns false if it was already open.
    pub fn force_open(&self) -> bool {
        self.force(State::Open)
    }

    /// Forces the circuit breaker to the closed state, starting a fresh window.
    ///
    /// Returns false if it was already closed.
    pub fn force_closed(&self) -> bool {
        self.force(State::Closed)
    }

    /// Resets the counters and restarts the window without changing state.
    pub fn reset_counts(&self) {
        let now = self.inner.clock.now();
        self.inner.record.lock().reset_counts(now);
    }

    fn force(&self, to: State) -> bool {
        let now = self.inner.clock.now();
        let transition = self.inner.record.lock().transition(to, now);
        let changed = transition.is_some();
        self.publish(transition);
        changed
    }

    fn report(&self, success: bool) {
        if success {
            self.on_success();
        } else {
            self.on_failure();
        }
    }

    fn expire_window(&self, record: &mut StateRecord, now: Instant) {
        let counts = record.counts();
        if record.expire_window(now, self.inner.config.count_window) && counts.total() > 0 {
            tracing::debug!(
                breaker = %self.inner.name,
                failures = counts.failures,
                successes = counts.successes,
                "count window expired, counters reset"
            );
        }
    }

    /// Replays a transition to logs, metrics and hooks. Must be called without the
    /// record lock held.
    fn publish(&self, transition: Option<Transition>) {
        let Some(Transition { from, to, counts }) = transition else {
            return;
        };
        let inner = &*self.inner;

        if to == State::Open {
            tracing::warn!(
                breaker = %inner.name,
                from = from.as_str(),
                to = to.as_str(),
                failures = counts.failures,
                successes = counts.successes,
                "circuit breaker opened"
            );
        } else {
            tracing::info!(
                breaker = %inner.name,
                from = from.as_str(),
                to = to.as_str(),
                failures = counts.failures,
                successes = counts.successes,
                "circuit breaker state changed"
            );
        }

        inner
            .metric_sink
            .record_state_transition(&inner.name, from.as_str(), to.as_str());
        inner.hooks.execute_state_transition_hook(to);
    }
}

// Allow cloning of circuit breakers - cheap because inner state is Arc'd
impl<P> Clone for CircuitBreaker<P>
where
    P: BreakerPolicy,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for CircuitBreaker<P>
where
    P: BreakerPolicy,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("state", &self.current_state())
            .finish()
    }
}

#[cfg(feature = "async")]
impl<P> CircuitBreaker<P>
where
    P: BreakerPolicy,
{
    /// Executes an async function wrapped by the circuit breaker.
    pub async fn call_async<F, Fut, T, E>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.is_allowed() {
            return Err(BreakerError::Open);
        }

        let start = self.inner.clock.now();
        let result = f().await;
        let duration = self.inner.clock.now().saturating_duration_since(start);

        self.inner
            .metric_sink
            .record_latency(&self.inner.name, duration);
        self.report(result.is_ok());

        result.map_err(BreakerError::Operation)
    }

    /// Executes an async function with a deadline; running out of time counts as
    /// a failure and yields [`BreakerError::Timeout`].
    pub async fn call_async_timeout<F, Fut, T, E>(
        &self,
        timeout: std::time::Duration,
        f: F,
    ) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.is_allowed() {
            return Err(BreakerError::Open);
        }

        let start = self.inner.clock.now();
        let outcome = tokio::time::timeout(timeout, f()).await;
        let duration = self.inner.clock.now().saturating_duration_since(start);

        self.inner
            .metric_sink
            .record_latency(&self.inner.name, duration);

        match outcome {
            Ok(result) => {
                self.report(result.is_ok());
                result.map_err(BreakerError::Operation)
            }
            Err(_elapsed) => {
                tracing::debug!(breaker = %self.inner.name, ?timeout, "call timed out");
                self.on_failure();
                Err(BreakerError::Timeout)
            }
        }
    }
}
