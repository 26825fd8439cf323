//! Configuration for circuit breakers.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};
use crate::policy::{BreakerPolicy, RatioPolicy};

/// Thresholds and timers of a breaker, fixed at construction time.
///
/// Defaults mirror the proxy's optional settings: a zero ratio, a zero window and
/// a zero recovery timeout, tripping after five failures in a window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BreakerConfig {
    /// Minimum successes-per-failure ratio required to close a half-open breaker.
    pub success_threshold_ratio: f64,

    /// Age after which the failure and success counters are reset.
    #[cfg_attr(feature = "serde", serde(alias = "initialize_count_duration"))]
    pub count_window: Duration,

    /// Minimum time an open breaker waits before letting a probe through.
    pub recovery_timeout: Duration,

    /// Failures within one window that trip a closed breaker.
    pub failure_threshold: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            success_threshold_ratio: 0.0,
            count_window: Duration::ZERO,
            recovery_timeout: Duration::ZERO,
            failure_threshold: 5,
        }
    }
}

impl BreakerConfig {
    /// Checks the thresholds for values the state machine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.success_threshold_ratio;
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::InvalidSuccessRatio(ratio));
        }

        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }

        Ok(())
    }

    /// The default policy derived from these thresholds.
    pub fn ratio_policy(&self) -> RatioPolicy {
        RatioPolicy::new(self.failure_threshold, self.success_threshold_ratio)
    }
}

/// Builder for creating circuit breakers with custom configurations.
pub struct BreakerBuilder<P = RatioPolicy>
where
    P: BreakerPolicy,
{
    name: String,
    config: BreakerConfig,
    policy: Option<P>,
    clock: Arc<dyn Clock>,
    metric_sink: Arc<dyn MetricSink>,
    hook_registry: Arc<HookRegistry>,
}

impl Default for BreakerBuilder<RatioPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerBuilder<RatioPolicy> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: String::from("default"),
            config: BreakerConfig::default(),
            policy: None,
            clock: Arc::new(SystemClock),
            metric_sink: Arc::new(NullMetricSink),
            hook_registry: Arc::new(HookRegistry::new()),
        }
    }

    /// Builds a circuit breaker with the ratio policy derived from the configuration.
    pub fn build(self) -> Result<CircuitBreaker<RatioPolicy>, ConfigError> {
        self.config.validate()?;
        let policy = match self.policy {
            Some(policy) => policy,
            None => self.config.ratio_policy(),
        };

        Ok(CircuitBreaker::new(
            self.name,
            policy,
            self.config,
            self.clock,
            self.metric_sink,
            self.hook_registry,
        ))
    }
}

impl<P> BreakerBuilder<P>
where
    P: BreakerPolicy,
{
    /// Names the protected target; used in log events and metric labels.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: BreakerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the ratio of successes to failures required to leave half-open.
    pub fn success_threshold_ratio(mut self, ratio: f64) -> Self {
        self.config.success_threshold_ratio = ratio;
        self
    }

    /// Sets the window after which the counters are considered stale.
    pub fn count_window(mut self, window: Duration) -> Self {
        self.config.count_window = window;
        self
    }

    /// Alias of [`count_window`](Self::count_window), named after the proxy option.
    pub fn initialize_count_duration(self, window: Duration) -> Self {
        self.count_window(window)
    }

    /// Sets the minimum time the circuit stays open before probing.
    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    /// Sets the number of failures within a window that trips the circuit.
    pub fn failure_threshold(mut self, count: u64) -> Self {
        self.config.failure_threshold = count;
        self
    }

    /// Sets the time source.
    pub fn clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets a metric sink for the circuit breaker.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.metric_sink = Arc::new(sink);
        self
    }

    /// Shares an existing metric sink.
    pub fn shared_metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.metric_sink = sink;
        self
    }

    /// Sets a hook registry for the circuit breaker.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hook_registry = Arc::new(hooks);
        self
    }

    /// Swaps in a custom policy. The ratio and failure threshold settings are then
    /// only validated, not used.
    pub fn policy<Q: BreakerPolicy>(self, policy: Q) -> BreakerBuilder<Q> {
        BreakerBuilder {
            name: self.name,
            config: self.config,
            policy: Some(policy),
            clock: self.clock,
            metric_sink: self.metric_sink,
            hook_registry: self.hook_registry,
        }
    }

    /// Builds a circuit breaker around the policy given to [`policy`](Self::policy).
    pub fn build_with_policy(self) -> Result<CircuitBreaker<P>, ConfigError> {
        self.config.validate()?;
        let policy = self.policy.ok_or(ConfigError::MissingPolicy)?;

        Ok(CircuitBreaker::new(
            self.name,
            policy,
            self.config,
            self.clock,
            self.metric_sink,
            self.hook_registry,
        ))
    }
}
