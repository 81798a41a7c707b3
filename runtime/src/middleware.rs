//! Observers called around every reducer run.
//!
//! Middleware see each action exactly once, in dispatch order, while the store
//! holds its write lock. They cannot change the action or the state.

use std::fmt::Debug;

/// Hooks invoked by [`crate::Store::send`].
///
/// Both methods default to doing nothing, so implementors override only the
/// hook they need. Keep them cheap: they run inside the store's critical
/// section.
pub trait Middleware<A>: Send + Sync {
    /// Called before the reducer sees `action`.
    fn on_action(&self, _action: &A) {}

    /// Called after the reducer ran. `changed` is `false` when the reducer
    /// handed back the previous snapshot.
    fn on_reduced(&self, _action: &A, _changed: bool) {}
}

/// Logs every action and whether it changed state.
///
/// Actions log at `debug`, referential no-ops at `trace`.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    store: &'static str,
}

impl LoggingMiddleware {
    /// Create a middleware tagging its logs with `store`.
    #[must_use]
    pub const fn new(store: &'static str) -> Self {
        Self { store }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new("store")
    }
}

impl<A> Middleware<A> for LoggingMiddleware
where
    A: Debug,
{
    fn on_action(&self, action: &A) {
        tracing::debug!(store = self.store, action = ?action, "dispatching");
    }

    fn on_reduced(&self, action: &A, changed: bool) {
        if changed {
            tracing::debug!(store = self.store, action = ?action, "state changed");
        } else {
            tracing::trace!(store = self.store, action = ?action, "state unchanged");
        }
    }
}
