//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on one field of a larger state
//!
//! Both preserve referential no-ops: when no part reports a change, the root
//! snapshot keeps its `Arc` identity.
//!
//! # Examples
//!
//! ## Scoping a slice into a root state
//!
//! ```
//! use slicekit_core::composition::scope_reducer;
//! use slicekit_core::reducer::{Reducer, Reduction};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct CounterState {
//!     value: i64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Incremented,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &Arc<CounterState>,
//!         _action: CounterAction,
//!         _env: &(),
//!     ) -> Reduction<CounterState, CounterAction> {
//!         Reduction::new(Arc::new(CounterState { value: state.value + 1 }))
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default)]
//! struct AppState {
//!     counter: Arc<CounterState>,
//!     title: Arc<String>,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum AppAction {
//!     Counter(CounterAction),
//!     Ping,
//! }
//!
//! let scoped = scope_reducer(
//!     CounterReducer,
//!     |app: &AppState| &app.counter,
//!     |app: &AppState, counter| AppState { counter, ..app.clone() },
//!     |action: AppAction| match action {
//!         AppAction::Counter(action) => Some(action),
//!         AppAction::Ping => None,
//!     },
//!     AppAction::Counter,
//! );
//!
//! let state = Arc::new(AppState::default());
//! let next = scoped.reduce(&state, AppAction::Counter(CounterAction::Incremented), &()).state;
//! assert_eq!(next.counter.value, 1);
//! assert!(Arc::ptr_eq(&next.title, &state.title));
//!
//! // Actions the child does not handle leave the root untouched
//! let same = scoped.reduce(&next, AppAction::Ping, &()).state;
//! assert!(Arc::ptr_eq(&same, &next));
//! ```

use crate::reducer::{Effects, Reducer, Reduction};
use std::sync::Arc;

/// A boxed reducer usable in [`combine_reducers`].
pub type BoxedReducer<S, A, E> =
    Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer receives the snapshot produced by the previous one, and all
/// effects are concatenated in order. The result is unchanged only if every
/// reducer handed its input back.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<BoxedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<BoxedReducer<S, A, E>>,
}

impl<S, A, E> CombinedReducer<S, A, E> {
    /// Number of combined reducers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether no reducers were combined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &Arc<Self::State>,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Reduction<Self::State, Self::Action> {
        let mut current = Arc::clone(state);
        let mut effects = Effects::new();

        for reducer in &self.reducers {
            let reduction = reducer.reduce(&current, action.clone(), env);
            current = reduction.state;
            effects.extend(reduction.effects);
        }

        Reduction {
            state: current,
            effects,
        }
    }
}

/// Scopes a reducer to one field of a larger state.
///
/// - `get_state` reads the child snapshot out of the root
/// - `set_state` builds a new root around a changed child
/// - `extract_action` maps a root action to a child action, or `None` when the
///   child does not handle it
/// - `embed_action` lifts the child's effect actions back into root actions
///
/// The child shares the root environment. Use [`scope_reducer_with_env`] when
/// it needs a part of it instead.
#[must_use]
pub fn scope_reducer<R, S, A>(
    reducer: R,
    get_state: fn(&S) -> &Arc<R::State>,
    set_state: fn(&S, Arc<R::State>) -> S,
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
) -> ScopedReducer<R, S, A, R::Environment>
where
    R: Reducer,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        extract_action,
        embed_action,
        get_env: identity::<R::Environment>,
    }
}

/// Like [`scope_reducer`], with `get_env` projecting the child environment out
/// of the root one.
#[must_use]
pub fn scope_reducer_with_env<R, S, A, E>(
    reducer: R,
    get_state: fn(&S) -> &Arc<R::State>,
    set_state: fn(&S, Arc<R::State>) -> S,
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
    get_env: fn(&E) -> &R::Environment,
) -> ScopedReducer<R, S, A, E>
where
    R: Reducer,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        extract_action,
        embed_action,
        get_env,
    }
}

const fn identity<T>(value: &T) -> &T {
    value
}

/// A scoped reducer that operates on one field of a root state.
///
/// Created by [`scope_reducer`] or [`scope_reducer_with_env`].
pub struct ScopedReducer<R, S, A, E>
where
    R: Reducer,
{
    reducer: R,
    get_state: fn(&S) -> &Arc<R::State>,
    set_state: fn(&S, Arc<R::State>) -> S,
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
    get_env: fn(&E) -> &R::Environment,
}

impl<R, S, A, E> Reducer for ScopedReducer<R, S, A, E>
where
    R: Reducer,
    R::Action: Send + 'static,
    A: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &Arc<Self::State>,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Reduction<Self::State, Self::Action> {
        let Some(child_action) = (self.extract_action)(action) else {
            return Reduction::unchanged(state);
        };

        let child = (self.get_state)(state);
        let reduction = self
            .reducer
            .reduce(child, child_action, (self.get_env)(env));
        let unchanged = reduction.is_unchanged(child);
        let reduction = reduction.map_actions(self.embed_action);

        let next = if unchanged {
            Arc::clone(state)
        } else {
            Arc::new((self.set_state)(state, reduction.state))
        };

        Reduction {
            state: next,
            effects: reduction.effects,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::effect::Effect;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Count {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum CountAction {
        Add(i32),
        AddLater(i32),
    }

    struct CountReducer;

    impl Reducer for CountReducer {
        type State = Count;
        type Action = CountAction;
        type Environment = i32;

        fn reduce(
            &self,
            state: &Arc<Count>,
            action: CountAction,
            step: &i32,
        ) -> Reduction<Count, CountAction> {
            match action {
                // Adding zero changes nothing and must say so
                CountAction::Add(0) => Reduction::unchanged(state),
                CountAction::Add(n) => Reduction::new(Arc::new(Count {
                    value: state.value + n * step,
                })),
                CountAction::AddLater(n) => {
                    Reduction::unchanged(state).with_effect(Effect::Future(Box::pin(async move {
                        Some(CountAction::Add(n))
                    })))
                },
            }
        }
    }

    #[derive(Clone, Debug, Default)]
    struct Root {
        left: Arc<Count>,
        right: Arc<Count>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum RootAction {
        Left(CountAction),
        Right(CountAction),
        Unrelated,
    }

    struct RootEnv {
        left_step: i32,
        right_step: i32,
    }

    fn root_reducer() -> CombinedReducer<Root, RootAction, RootEnv> {
        combine_reducers(vec![
            Box::new(scope_reducer_with_env(
                CountReducer,
                |root: &Root| &root.left,
                |root: &Root, left| Root {
                    left,
                    right: Arc::clone(&root.right),
                },
                |action: RootAction| match action {
                    RootAction::Left(action) => Some(action),
                    RootAction::Right(_) | RootAction::Unrelated => None,
                },
                RootAction::Left,
                |env: &RootEnv| &env.left_step,
            )),
            Box::new(scope_reducer_with_env(
                CountReducer,
                |root: &Root| &root.right,
                |root: &Root, right| Root {
                    left: Arc::clone(&root.left),
                    right,
                },
                |action: RootAction| match action {
                    RootAction::Right(action) => Some(action),
                    RootAction::Left(_) | RootAction::Unrelated => None,
                },
                RootAction::Right,
                |env: &RootEnv| &env.right_step,
            )),
        ])
    }

    const ENV: RootEnv = RootEnv {
        left_step: 1,
        right_step: 10,
    };

    #[test]
    fn test_scoped_update_shares_sibling() {
        let reducer = root_reducer();
        let state = Arc::new(Root::default());

        let next = reducer.reduce(&state, RootAction::Left(CountAction::Add(2)), &ENV).state;

        assert_eq!(next.left.value, 2);
        assert!(Arc::ptr_eq(&next.right, &state.right));
        assert_eq!(state.left.value, 0);
    }

    #[test]
    fn test_child_environment_is_projected() {
        let reducer = root_reducer();
        let state = Arc::new(Root::default());

        let next = reducer.reduce(&state, RootAction::Right(CountAction::Add(2)), &ENV).state;
        assert_eq!(next.right.value, 20);
    }

    #[test]
    fn test_unrelated_action_is_referential_noop() {
        let reducer = root_reducer();
        let state = Arc::new(Root::default());

        let reduction = reducer.reduce(&state, RootAction::Unrelated, &ENV);
        assert!(reduction.is_unchanged(&state));
        assert!(reduction.effects.is_empty());
    }

    #[test]
    fn test_unchanged_child_keeps_root_identity() {
        let reducer = root_reducer();
        let state = Arc::new(Root::default());

        let reduction = reducer.reduce(&state, RootAction::Left(CountAction::Add(0)), &ENV);
        assert!(reduction.is_unchanged(&state));
    }

    #[tokio::test]
    async fn test_child_effects_are_embedded() {
        let reducer = root_reducer();
        let state = Arc::new(Root::default());

        let reduction = reducer.reduce(&state, RootAction::Right(CountAction::AddLater(3)), &ENV);
        assert!(reduction.is_unchanged(&state));

        let mut effects = reduction.effects.into_iter();
        match effects.next() {
            Some(Effect::Future(fut)) => {
                assert_eq!(fut.await, Some(RootAction::Right(CountAction::Add(3))));
            },
            other => panic!("expected an embedded future, got {other:?}"),
        }
        assert!(effects.next().is_none());
    }

    #[test]
    fn test_combine_threads_snapshots() {
        struct Double;

        impl Reducer for Double {
            type State = Count;
            type Action = ();
            type Environment = ();

            fn reduce(&self, state: &Arc<Count>, _action: (), _env: &()) -> Reduction<Count, ()> {
                Reduction::new(Arc::new(Count {
                    value: state.value * 2,
                }))
            }
        }

        struct Increment;

        impl Reducer for Increment {
            type State = Count;
            type Action = ();
            type Environment = ();

            fn reduce(&self, state: &Arc<Count>, _action: (), _env: &()) -> Reduction<Count, ()> {
                Reduction::new(Arc::new(Count {
                    value: state.value + 1,
                }))
            }
        }

        let combined = combine_reducers(vec![Box::new(Increment), Box::new(Double)]);
        assert_eq!(combined.len(), 2);

        let state = Arc::new(Count { value: 3 });
        let next = combined.reduce(&state, (), &()).state;
        assert_eq!(next.value, 8);
    }

    #[test]
    fn test_empty_combination_is_noop() {
        let combined: CombinedReducer<Count, (), ()> = combine_reducers(Vec::new());
        let state = Arc::new(Count::default());

        assert!(combined.is_empty());
        assert!(combined.reduce(&state, (), &()).is_unchanged(&state));
    }
}
