//! One breaker per protected target.

use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::breaker::CircuitBreaker;
use crate::clock::{Clock, SystemClock};
use crate::config::BreakerConfig;
use crate::error::ConfigError;
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};

/// Lazily creates and hands out breakers keyed by target, all sharing one
/// configuration, clock and metric sink.
///
/// The configuration is validated once, so creating a breaker never fails.
pub struct BreakerRegistry {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    metric_sink: Arc<dyn MetricSink>,
    breakers: RwLock<AHashMap<String, CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Creates a registry that builds breakers from `config` on the system clock.
    pub fn new(config: BreakerConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(NullMetricSink))
    }

    /// Creates a registry with an explicit clock and metric sink.
    pub fn with_parts(
        config: BreakerConfig,
        clock: Arc<dyn Clock>,
        metric_sink: Arc<dyn MetricSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            metric_sink,
            breakers: RwLock::new(AHashMap::new()),
        })
    }

    /// Returns the breaker for `target`, creating it on first use.
    pub fn get_or_create(&self, target: &str) -> CircuitBreaker {
        if let Some(breaker) = self.breakers.read().get(target) {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write();
        if let Some(breaker) = breakers.get(target) {
            return breaker.clone();
        }

        let breaker = CircuitBreaker::new(
            target.to_owned(),
            self.config.ratio_policy(),
            self.config.clone(),
            Arc::clone(&self.clock),
            Arc::clone(&self.metric_sink),
            Arc::new(HookRegistry::new()),
        );

        tracing::debug!(breaker = target, "circuit breaker created");
        breakers.insert(target.to_owned(), breaker.clone());
        breaker
    }

    /// Returns the breaker for `target` if one exists.
    pub fn get(&self, target: &str) -> Option<CircuitBreaker> {
        self.breakers.read().get(target).cloned()
    }

    /// Drops the breaker for `target`; returns it if it existed.
    ///
    /// Clones held by in-flight callers keep working on the removed instance.
    pub fn remove(&self, target: &str) -> Option<CircuitBreaker> {
        self.breakers.write().remove(target)
    }

    /// Names of all targets with a breaker, sorted.
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.breakers.read().keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Number of breakers.
    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    /// Returns true if no breaker has been created yet.
    pub fn is_empty(&self) -> bool {
        self.breakers.read().is_empty()
    }

    /// The configuration new breakers are built with.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}
