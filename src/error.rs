//! Error types for the circuit breaker library.

use thiserror::Error;

/// Result type for calls wrapped by a circuit breaker.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Error returned by the closure wrappers on [`CircuitBreaker`](crate::CircuitBreaker).
///
/// The gate itself never fails; these variants only describe what happened to a
/// wrapped call.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open, the call was not attempted.
    #[error("circuit breaker is open")]
    Open,

    /// The underlying operation failed.
    #[error("operation error: {0}")]
    Operation(#[source] E),

    /// The underlying operation did not finish in time.
    #[error("operation timed out")]
    Timeout,
}

impl<E> BreakerError<E> {
    /// Returns true if the call was rejected without being attempted.
    pub fn is_rejected(&self) -> bool {
        matches!(self, BreakerError::Open)
    }

    /// Returns the operation's own error, if there is one.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(err) => Some(err),
            _ => None,
        }
    }
}

/// Invalid breaker configuration, reported when a breaker is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The success threshold ratio must be a finite number in `[0, 1]`.
    #[error("success threshold ratio must be within [0, 1], got {0}")]
    InvalidSuccessRatio(f64),

    /// A failure threshold of zero would trip on every call.
    #[error("failure threshold must be at least 1")]
    ZeroFailureThreshold,

    /// `build_with_policy` was called without a policy.
    #[error("a policy must be provided when building with a custom policy")]
    MissingPolicy,
}
