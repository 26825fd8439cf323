//! Re-exports the types needed to gate calls with a breaker.
//!
//! # Example
//! ```rust,no_run
//! use proxybreaker_rs::prelude::*;
//!
//! let registry = BreakerRegistry::new(BreakerConfig::default()).unwrap();
//! let breaker = registry.get_or_create("inventory");
//! if breaker.is_allowed() {
//!     breaker.on_success();
//! }
//! ```

pub use crate::breaker::CircuitBreaker;
pub use crate::config::BreakerConfig;
pub use crate::error::{BreakerError, BreakerResult};
pub use crate::registry::BreakerRegistry;
pub use crate::state::State;
