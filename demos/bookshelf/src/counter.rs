//! A counter with thunk-style asynchronous steps.
//!
//! `Incremented` and `Decremented` apply immediately. The `*Requested`
//! actions start an effect that resolves after the environment's delay and
//! feeds back the matching `*Fulfilled` action, moving `status` through
//! `idle → pending → succeeded`. Negative steps are rejected by the effect.

use serde::Serialize;
use slicekit_core::{Effect, Reducer, Reduction};
use std::sync::Arc;
use std::time::Duration;

/// Step applied when an action carries none.
pub const DEFAULT_STEP: i64 = 1;

/// Status of the last asynchronous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterStatus {
    /// No step requested yet
    #[default]
    Idle,
    /// A step is in flight
    Pending,
    /// The last step was applied
    Succeeded,
    /// The last step was rejected
    Failed,
}

/// Counter state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterState {
    /// Current value
    pub value: i64,
    /// Status of the last asynchronous step
    pub status: CounterStatus,
}

/// Counter actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// Add the step (default 1) right away
    Incremented(Option<i64>),
    /// Subtract the step (default 1) right away
    Decremented(Option<i64>),
    /// Start an asynchronous increment
    IncrementRequested(Option<i64>),
    /// Start an asynchronous decrement
    DecrementRequested(Option<i64>),
    /// An asynchronous increment resolved
    IncrementFulfilled(i64),
    /// An asynchronous decrement resolved
    DecrementFulfilled(i64),
    /// An asynchronous step failed
    Rejected(String),
}

/// Counter environment
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterEnvironment {
    delay: Duration,
}

impl CounterEnvironment {
    /// Steps resolve after `delay`.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    fn step_effect(
        self,
        step: i64,
        fulfilled: fn(i64) -> CounterAction,
    ) -> Effect<CounterAction> {
        let delay = self.delay;
        Effect::Future(Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if step < 0 {
                return Some(CounterAction::Rejected(format!(
                    "step must not be negative, got {step}"
                )));
            }
            Some(fulfilled(step))
        }))
    }
}

/// Counter reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl CounterReducer {
    /// Create a new counter reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Keep the old snapshot when nothing observable changed.
fn settle(state: &Arc<CounterState>, next: CounterState) -> Reduction<CounterState, CounterAction> {
    if **state == next {
        Reduction::unchanged(state)
    } else {
        Reduction::new(Arc::new(next))
    }
}

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Environment = CounterEnvironment;

    fn reduce(
        &self,
        state: &Arc<Self::State>,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Reduction<Self::State, Self::Action> {
        match action {
            CounterAction::Incremented(step) => settle(
                state,
                CounterState {
                    value: state.value.saturating_add(step.unwrap_or(DEFAULT_STEP)),
                    status: state.status,
                },
            ),
            CounterAction::Decremented(step) => settle(
                state,
                CounterState {
                    value: state.value.saturating_sub(step.unwrap_or(DEFAULT_STEP)),
                    status: state.status,
                },
            ),
            CounterAction::IncrementRequested(step) => settle(
                state,
                CounterState {
                    value: state.value,
                    status: CounterStatus::Pending,
                },
            )
            .with_effect(env.step_effect(
                step.unwrap_or(DEFAULT_STEP),
                CounterAction::IncrementFulfilled,
            )),
            CounterAction::DecrementRequested(step) => settle(
                state,
                CounterState {
                    value: state.value,
                    status: CounterStatus::Pending,
                },
            )
            .with_effect(env.step_effect(
                step.unwrap_or(DEFAULT_STEP),
                CounterAction::DecrementFulfilled,
            )),
            CounterAction::IncrementFulfilled(step) => settle(
                state,
                CounterState {
                    value: state.value.saturating_add(step),
                    status: CounterStatus::Succeeded,
                },
            ),
            CounterAction::DecrementFulfilled(step) => settle(
                state,
                CounterState {
                    value: state.value.saturating_sub(step),
                    status: CounterStatus::Succeeded,
                },
            ),
            CounterAction::Rejected(message) => {
                tracing::warn!(%message, "counter step rejected");
                settle(
                    state,
                    CounterState {
                        value: state.value,
                        status: CounterStatus::Failed,
                    },
                )
            },
        }
    }
}
