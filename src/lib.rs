//! # proxybreaker-rs
//!
//! A failure gate for reverse proxies: one circuit breaker per downstream target
//! decides whether an outbound call should be attempted at all.
//!
//! The breaker cycles through three states:
//!
//! - **Closed**: calls pass through. Failures are counted in a time window and trip
//!   the breaker once they reach the failure threshold.
//! - **Open**: calls are rejected without touching the network until the recovery
//!   timeout has elapsed since the last failure.
//! - **Half-Open**: the first caller after the timeout becomes a probe. Once probe
//!   outcomes arrive, the breaker closes if successes per failure reach the success
//!   threshold ratio and reopens otherwise.
//!
//! Counters older than the count window are reset before they are used, so a
//! long-lived closed breaker never accumulates unbounded history.
//!
//! ## Basic Usage
//!
//! ```rust
//! use proxybreaker_rs::{CircuitBreaker, State};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::builder()
//!     .name("billing-api")
//!     .failure_threshold(3)
//!     .success_threshold_ratio(0.5)
//!     .count_window(Duration::from_secs(10))
//!     .recovery_timeout(Duration::from_secs(30))
//!     .build()
//!     .expect("valid configuration");
//!
//! if breaker.is_allowed() {
//!     // Perform the downstream call, then report what happened.
//!     breaker.on_failure();
//! }
//!
//! assert_eq!(breaker.current_state(), State::Closed);
//! ```
//!
//! Calls can also be wrapped in a closure:
//!
//! ```rust
//! use proxybreaker_rs::{BreakerError, CircuitBreaker};
//!
//! let breaker = CircuitBreaker::builder().build().expect("valid configuration");
//!
//! match breaker.call(|| Ok::<_, std::io::Error>("response")) {
//!     Ok(body) => println!("upstream said {body}"),
//!     Err(BreakerError::Open) => println!("short-circuited"),
//!     Err(err) => println!("upstream failed: {err}"),
//! }
//! ```
//!
//! ## Features
//!
//! - `async` - `call_async` and `call_async_timeout` with Tokio
//! - `prometheus` - Prometheus metric sink
//! - `serde` - deserializable [`BreakerConfig`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod clock;
mod config;
mod error;
mod hook;
mod metrics;
mod policy;
pub mod prelude;
mod registry;
mod state;

// Re-exports
pub use breaker::CircuitBreaker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BreakerBuilder, BreakerConfig};
pub use error::{BreakerError, BreakerResult, ConfigError};
pub use hook::HookRegistry;
#[cfg(feature = "prometheus")]
pub use metrics::PrometheusSink;
pub use metrics::{MetricSink, NullMetricSink};
pub use policy::{BreakerPolicy, ConsecutivePolicy, ProbeVerdict, RatioPolicy};
pub use registry::BreakerRegistry;
pub use state::{BreakerSnapshot, Counts, State};
