//! # Slicekit Core
//!
//! Core traits and types for the Slicekit architecture.
//!
//! This crate provides the building blocks for feature "slices": a normalized
//! entity table, a request lifecycle tracker that discards stale completions,
//! and a pure reducer combining both behind a closed action vocabulary.
//!
//! ## Core Concepts
//!
//! - **State**: Immutable snapshot for a feature, shared as `Arc<State>`
//! - **Action**: Closed sum type of everything that can happen to a slice
//! - **Reducer**: Pure function `(&Arc<State>, Action, Environment) → (Arc<State>, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Snapshots are never mutated; unchanged slices keep their `Arc` identity
//! - Explicit Effects (no hidden I/O)
//!
//! ## Example
//!
//! ```
//! use slicekit_core::entity::HasId;
//! use slicekit_core::lifecycle::{LoadingStatus, RequestId};
//! use slicekit_core::reducer::Reducer;
//! use slicekit_core::slice::{EntityAction, SliceEnvironment, SliceReducer, SliceState};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Book {
//!     id: u32,
//! }
//!
//! impl HasId for Book {
//!     type Id = u32;
//!     fn id(&self) -> u32 {
//!         self.id
//!     }
//! }
//!
//! let reducer = SliceReducer::<Book, u32>::new();
//! let env = SliceEnvironment::<Book>::pure();
//! let state = Arc::new(SliceState::<Book, u32>::new());
//!
//! let r1 = RequestId::from("r1");
//! let state = reducer
//!     .reduce(&state, EntityAction::FetchRequested { request_id: r1.clone() }, &env)
//!     .state;
//! assert_eq!(state.tracker.status(), LoadingStatus::Pending);
//!
//! let state = reducer
//!     .reduce(
//!         &state,
//!         EntityAction::FetchSucceeded { request_id: r1, entities: vec![Book { id: 1 }] },
//!         &env,
//!     )
//!     .state;
//! assert_eq!(state.tracker.status(), LoadingStatus::Loaded);
//! assert_eq!(state.table.select_by_id(&1), Some(&Book { id: 1 }));
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer composition utilities (`scope_reducer`, `combine_reducers`)
pub mod composition;

/// Normalized keyed storage for records of one type
pub mod entity;

/// Request lifecycle tracking with stale-completion guards
pub mod lifecycle;

/// Memoized read-only views over slice state
pub mod selectors;

/// The slice reducer combining entity table and lifecycle tracker
pub mod slice;

/// The asynchronous I/O collaborator that produces entities
pub mod source;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They never mutate the snapshot they are given. A reducer that has nothing to
/// change hands back the identical `Arc`, so hosts and selectors can detect a
/// no-op with `Arc::ptr_eq` instead of a deep comparison.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;
    use std::sync::Arc;

    /// Effects returned alongside a new snapshot.
    ///
    /// Most transitions produce zero or one effect, so four inline slots avoid
    /// a heap allocation on the hot path.
    pub type Effects<A> = SmallVec<[Effect<A>; 4]>;

    /// The outcome of one reducer call: the next snapshot and the effects to run.
    #[derive(Debug)]
    pub struct Reduction<S, A> {
        /// Next state snapshot (may be the same `Arc` as the input)
        pub state: Arc<S>,
        /// Effects for the runtime to execute
        pub effects: Effects<A>,
    }

    impl<S, A> Reduction<S, A> {
        /// A transition to `state` with no effects.
        #[must_use]
        pub fn new(state: Arc<S>) -> Self {
            Self {
                state,
                effects: SmallVec::new(),
            }
        }

        /// A referential no-op: hands back the caller's snapshot untouched.
        #[must_use]
        pub fn unchanged(state: &Arc<S>) -> Self {
            Self::new(Arc::clone(state))
        }

        /// Attach an effect to this reduction.
        #[must_use]
        pub fn with_effect(mut self, effect: Effect<A>) -> Self {
            self.effects.push(effect);
            self
        }

        /// Whether the reduction kept the identity of `previous`.
        #[must_use]
        pub fn is_unchanged(&self, previous: &Arc<S>) -> bool {
            Arc::ptr_eq(&self.state, previous)
        }

        /// Map the effects' actions into another action type.
        #[must_use]
        pub fn map_actions<B, F>(self, f: F) -> Reduction<S, B>
        where
            A: Send + 'static,
            B: Send + 'static,
            F: Fn(A) -> B + Clone + Send + Sync + 'static,
        {
            Reduction {
                state: self.state,
                effects: self
                    .effects
                    .into_iter()
                    .map(|effect| effect.map(f.clone()))
                    .collect(),
            }
        }
    }

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```
    /// use slicekit_core::reducer::{Reducer, Reduction};
    /// use std::sync::Arc;
    ///
    /// #[derive(Clone, Debug, Default, PartialEq)]
    /// struct CounterState {
    ///     value: i64,
    /// }
    ///
    /// enum CounterAction {
    ///     Incremented(Option<i64>),
    /// }
    ///
    /// struct CounterReducer;
    ///
    /// impl Reducer for CounterReducer {
    ///     type State = CounterState;
    ///     type Action = CounterAction;
    ///     type Environment = ();
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &Arc<CounterState>,
    ///         action: CounterAction,
    ///         _env: &(),
    ///     ) -> Reduction<CounterState, CounterAction> {
    ///         match action {
    ///             CounterAction::Incremented(by) => Reduction::new(Arc::new(CounterState {
    ///                 value: state.value + by.unwrap_or(1),
    ///             })),
    ///         }
    ///     }
    /// }
    ///
    /// let state = Arc::new(CounterState::default());
    /// let next = CounterReducer.reduce(&state, CounterAction::Incremented(None), &()).state;
    /// assert_eq!(next.value, 1);
    /// assert_eq!(state.value, 0);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into a new snapshot and effects
        ///
        /// This is a pure function that:
        /// 1. Reads the current snapshot
        /// 2. Builds the next snapshot (or returns the same `Arc` for a no-op)
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &Arc<Self::State>,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Reduction<Self::State, Self::Action>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use futures::FutureExt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Map the produced action into another action type
        ///
        /// Used when a child reducer's effects are lifted into a parent's
        /// action space (see [`crate::composition::scope_reducer`]).
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            Action: Send + 'static,
            B: Send + 'static,
            F: Fn(Action) -> B + Clone + Send + Sync + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| e.map(f.clone())).collect())
                },
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| e.map(f.clone())).collect())
                },
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(fut.map(move |a| a.map(f)))),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use crate::lifecycle::RequestId;

    /// Generator of request identifiers for fetch attempts.
    ///
    /// Production code uses [`UuidRequestIds`]; tests inject a deterministic
    /// sequence so assertions can name the ids they expect.
    pub trait RequestIds: Send + Sync {
        /// Produce an identifier never handed out before by this generator.
        fn next_id(&self) -> RequestId;
    }

    /// Random v4 UUID request ids.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UuidRequestIds;

    impl RequestIds for UuidRequestIds {
        fn next_id(&self) -> RequestId {
            RequestId::new()
        }
    }
}

pub use effect::Effect;
pub use reducer::{Effects, Reducer, Reduction};
