//! Metric sinks that receive circuit breaker events.

use std::time::Duration;

/// Trait for metrics sinks that can receive circuit breaker events.
///
/// Sinks are invoked after the breaker's lock has been released.
pub trait MetricSink: Send + Sync + 'static {
    /// Records a state transition event.
    fn record_state_transition(&self, breaker: &str, from: &str, to: &str);

    /// Records a gate decision.
    fn record_admission(&self, breaker: &str, allowed: bool);

    /// Records a reported call outcome.
    fn record_outcome(&self, breaker: &str, success: bool);

    /// Records how long a wrapped call took.
    fn record_latency(&self, breaker: &str, duration: Duration);
}

/// A null metrics sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_state_transition(&self, _breaker: &str, _from: &str, _to: &str) {}
    fn record_admission(&self, _breaker: &str, _allowed: bool) {}
    fn record_outcome(&self, _breaker: &str, _success: bool) {}
    fn record_latency(&self, _breaker: &str, _duration: Duration) {}
}

#[cfg(feature = "prometheus")]
pub use self::prometheus::PrometheusSink;

#[cfg(feature = "prometheus")]
mod prometheus {
    use super::MetricSink;
    use prometheus_client::encoding::EncodeLabelSet;
    use prometheus_client::metrics::counter::Counter;
    use prometheus_client::metrics::family::Family;
    use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
    use prometheus_client::registry::Registry;
    use std::time::Duration;

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct TransitionLabels {
        breaker: String,
        from: String,
        to: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct ResultLabels {
        breaker: String,
        result: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    struct BreakerLabels {
        breaker: String,
    }

    /// Prometheus-backed sink.
    ///
    /// Exposes `breaker_transitions`, `breaker_admissions`, `breaker_outcomes` and
    /// `breaker_call_duration_seconds`, each labelled with the breaker name.
    #[derive(Clone)]
    pub struct PrometheusSink {
        transitions: Family<TransitionLabels, Counter>,
        admissions: Family<ResultLabels, Counter>,
        outcomes: Family<ResultLabels, Counter>,
        latency: Family<BreakerLabels, Histogram>,
    }

    impl PrometheusSink {
        /// Creates the metric families and registers them on `registry`.
        pub fn register(registry: &mut Registry) -> Self {
            let sink = Self {
                transitions: Family::default(),
                admissions: Family::default(),
                outcomes: Family::default(),
                latency: Family::new_with_constructor(|| {
                    Histogram::new(exponential_buckets(0.001, 2.0, 14))
                }),
            };

            registry.register(
                "breaker_transitions",
                "Circuit breaker state transitions",
                sink.transitions.clone(),
            );
            registry.register(
                "breaker_admissions",
                "Gate decisions, labelled allowed or rejected",
                sink.admissions.clone(),
            );
            registry.register(
                "breaker_outcomes",
                "Reported call outcomes, labelled success or failure",
                sink.outcomes.clone(),
            );
            registry.register(
                "breaker_call_duration_seconds",
                "Duration of calls wrapped by the breaker",
                sink.latency.clone(),
            );

            sink
        }
    }

    impl MetricSink for PrometheusSink {
        fn record_state_transition(&self, breaker: &str, from: &str, to: &str) {
            self.transitions
                .get_or_create(&TransitionLabels {
                    breaker: breaker.to_owned(),
                    from: from.to_owned(),
                    to: to.to_owned(),
                })
                .inc();
        }

        fn record_admission(&self, breaker: &str, allowed: bool) {
            let result = if allowed { "allowed" } else { "rejected" };
            self.admissions
                .get_or_create(&ResultLabels {
                    breaker: breaker.to_owned(),
                    result: result.to_owned(),
                })
                .inc();
        }

        fn record_outcome(&self, breaker: &str, success: bool) {
            let result = if success { "success" } else { "failure" };
            self.outcomes
                .get_or_create(&ResultLabels {
                    breaker: breaker.to_owned(),
                    result: result.to_owned(),
                })
                .inc();
        }

        fn record_latency(&self, breaker: &str, duration: Duration) {
            self.latency
                .get_or_create(&BreakerLabels {
                    breaker: breaker.to_owned(),
                })
                .observe(duration.as_secs_f64());
        }
    }
}
