//! Hook registry for circuit breaker events.

use crate::state::State;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::sync::Arc;

type HookFn = Arc<dyn Fn() + Send + Sync + 'static>;
type HookList = RwLock<SmallVec<[HookFn; 2]>>;

/// A registry for circuit breaker event hooks.
///
/// Several hooks may be registered per event; they run in registration order,
/// after the breaker has released its lock.
#[derive(Default)]
pub struct HookRegistry {
    on_open: HookList,
    on_close: HookList,
    on_half_open: HookList,
    on_success: HookList,
    on_failure: HookList,
    on_rejected: HookList,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook to call when the circuit breaker opens.
    pub fn set_on_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_open.write().push(Arc::new(f));
    }

    /// Adds a hook to call when the circuit breaker closes.
    pub fn set_on_close<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close.write().push(Arc::new(f));
    }

    /// Adds a hook to call when the circuit breaker half-opens.
    pub fn set_on_half_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_half_open.write().push(Arc::new(f));
    }

    /// Adds a hook to call when a success is reported.
    pub fn set_on_success<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success.write().push(Arc::new(f));
    }

    /// Adds a hook to call when a failure is reported.
    pub fn set_on_failure<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_failure.write().push(Arc::new(f));
    }

    /// Adds a hook to call when the gate rejects a call.
    pub fn set_on_rejected<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_rejected.write().push(Arc::new(f));
    }

    /// Executes the hooks registered for entering `to`.
    pub fn execute_state_transition_hook(&self, to: State) {
        match to {
            State::Open => run(&self.on_open),
            State::Closed => run(&self.on_close),
            State::HalfOpen => run(&self.on_half_open),
        }
    }

    /// Executes the success hooks.
    pub fn execute_success_hook(&self) {
        run(&self.on_success);
    }

    /// Executes the failure hooks.
    pub fn execute_failure_hook(&self) {
        run(&self.on_failure);
    }

    /// Executes the rejection hooks.
    pub fn execute_rejected_hook(&self) {
        run(&self.on_rejected);
    }
}

// Hooks are cloned out so a hook may register further hooks without deadlocking.
fn run(list: &HookList) {
    let hooks: SmallVec<[HookFn; 2]> = list.read().iter().cloned().collect();
    for hook in hooks {
        hook();
    }
}
