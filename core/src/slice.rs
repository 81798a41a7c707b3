//! The slice reducer.
//!
//! A slice is one feature area of application state (e.g. "books"): an
//! [`EntityTable`] merged with a [`RequestTracker`] for the fetch that fills it.
//! [`SliceReducer`] drives both from the closed [`EntityAction`] vocabulary:
//!
//! | Action            | Effect on state                                    |
//! |-------------------|----------------------------------------------------|
//! | `Add`             | table `add_one` (upsert)                           |
//! | `Remove`          | table `remove_one`                                 |
//! | `FetchRequested`  | tracker `start`; ignored while pending             |
//! | `FetchSucceeded`  | tracker `succeed`, then table `set_all`            |
//! | `FetchFailed`     | tracker `fail`; entities untouched                 |
//!
//! Transitions the guards reject hand back the identical `Arc`.

use crate::effect::Effect;
use crate::entity::{EntityTable, HasId};
use crate::lifecycle::{LoadingStatus, RequestId, RequestTracker};
use crate::reducer::{Reducer, Reduction};
use crate::source::{EntitySource, FetchError};
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Entity table and fetch lifecycle of one feature area.
pub struct SliceState<E, K> {
    /// Normalized entities
    pub table: EntityTable<E, K>,
    /// Lifecycle of the fetch that fills `table`
    pub tracker: RequestTracker,
}

impl<E, K> SliceState<E, K>
where
    E: HasId<Id = K> + 'static,
{
    /// An empty, idle slice keyed by [`HasId::id`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: EntityTable::new(),
            tracker: RequestTracker::new(),
        }
    }
}

impl<E, K> Default for SliceState<E, K>
where
    E: HasId<Id = K> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, K> SliceState<E, K> {
    /// An empty, idle slice keyed by a custom selector.
    #[must_use]
    pub fn with_selector<F>(select_id: F) -> Self
    where
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        Self {
            table: EntityTable::with_selector(select_id),
            tracker: RequestTracker::new(),
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> LoadingStatus {
        self.tracker.status()
    }
}

impl<E, K> Clone for SliceState<E, K> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<E, K> PartialEq for SliceState<E, K>
where
    E: PartialEq,
    K: Eq + Hash,
{
    fn eq(&self, other: &Self) -> bool {
        self.tracker == other.tracker && self.table == other.table
    }
}

impl<E, K> fmt::Debug for SliceState<E, K>
where
    E: fmt::Debug,
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceState")
            .field("table", &self.table)
            .field("tracker", &self.tracker)
            .finish()
    }
}

// Flattened: `{ ids, entities, status, currentRequestId, error }`
impl<E, K> Serialize for SliceState<E, K>
where
    E: Serialize,
    K: Serialize + Eq + Hash,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("SliceState", 5)?;
        state.serialize_field("ids", self.table.select_ids())?;
        state.serialize_field("entities", self.table.select_entities())?;
        state.serialize_field("status", &self.tracker.status())?;
        state.serialize_field("currentRequestId", &self.tracker.current_request_id())?;
        state.serialize_field("error", &self.tracker.error())?;
        state.end()
    }
}

/// Everything that can happen to a slice.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityAction<E, K> {
    /// Upsert one entity
    Add(E),
    /// Remove the entity with this key
    Remove(K),
    /// A fetch was issued under `request_id`
    FetchRequested {
        /// Id of the new request
        request_id: RequestId,
    },
    /// The fetch issued under `request_id` resolved
    FetchSucceeded {
        /// Id of the completed request
        request_id: RequestId,
        /// Entities replacing the table content
        entities: Vec<E>,
    },
    /// The fetch issued under `request_id` failed
    FetchFailed {
        /// Id of the failed request
        request_id: RequestId,
        /// Failure reason recorded in the tracker
        message: String,
    },
}

/// Borrowed view of a fetch completion carried by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion<'a> {
    /// A success carrying `count` entities
    Succeeded {
        /// Id of the completed request
        request_id: &'a RequestId,
        /// Number of entities delivered
        count: usize,
    },
    /// A failure
    Failed {
        /// Id of the failed request
        request_id: &'a RequestId,
        /// Failure reason
        message: &'a str,
    },
}

impl Completion<'_> {
    /// Id of the request this completion answers.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        match self {
            Self::Succeeded { request_id, .. } | Self::Failed { request_id, .. } => request_id,
        }
    }
}

/// Actions that can start and complete a slice fetch.
///
/// Implemented by [`EntityAction`] and by any root action that embeds one, so
/// hosts can dispatch a fetch and recognize its completion without knowing the
/// concrete action type.
pub trait FetchAction: Sized {
    /// Build the action announcing a new request.
    fn fetch_requested(request_id: RequestId) -> Self;

    /// The completion this action carries, if any.
    fn completion(&self) -> Option<Completion<'_>>;
}

impl<E, K> FetchAction for EntityAction<E, K> {
    fn fetch_requested(request_id: RequestId) -> Self {
        Self::FetchRequested { request_id }
    }

    fn completion(&self) -> Option<Completion<'_>> {
        match self {
            Self::FetchSucceeded {
                request_id,
                entities,
            } => Some(Completion::Succeeded {
                request_id,
                count: entities.len(),
            }),
            Self::FetchFailed {
                request_id,
                message,
            } => Some(Completion::Failed {
                request_id,
                message,
            }),
            Self::Add(_) | Self::Remove(_) | Self::FetchRequested { .. } => None,
        }
    }
}

/// Dependencies of a slice reducer.
///
/// Without a source the reducer is pure bookkeeping: whoever dispatched
/// `FetchRequested` is expected to dispatch the completion too.
pub struct SliceEnvironment<E> {
    source: Option<Arc<dyn EntitySource<E>>>,
    fetch_timeout: Option<Duration>,
}

impl<E> SliceEnvironment<E> {
    /// An environment without an I/O collaborator.
    #[must_use]
    pub const fn pure() -> Self {
        Self {
            source: None,
            fetch_timeout: None,
        }
    }

    /// An environment fetching from `source`.
    #[must_use]
    pub fn with_source(source: Arc<dyn EntitySource<E>>) -> Self {
        Self {
            source: Some(source),
            fetch_timeout: None,
        }
    }

    /// Fail fetches that take longer than `timeout`.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Configured fetch timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    /// Effect running the source for `request_id`, if a source is configured.
    fn fetch_effect<K>(&self, request_id: RequestId) -> Option<Effect<EntityAction<E, K>>>
    where
        E: Send + 'static,
        K: Send + 'static,
    {
        let source = Arc::clone(self.source.as_ref()?);
        let timeout = self.fetch_timeout;

        Some(Effect::Future(Box::pin(async move {
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, source.fetch())
                    .await
                    .unwrap_or_else(|_| Err(FetchError::TimedOut(limit))),
                None => source.fetch().await,
            };

            Some(match outcome {
                Ok(entities) => EntityAction::FetchSucceeded {
                    request_id,
                    entities,
                },
                Err(error) => {
                    tracing::warn!(request_id = %request_id, error = %error, "fetch failed");
                    EntityAction::FetchFailed {
                        request_id,
                        message: error.to_string(),
                    }
                },
            })
        })))
    }
}

impl<E> Default for SliceEnvironment<E> {
    fn default() -> Self {
        Self::pure()
    }
}

impl<E> Clone for SliceEnvironment<E> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            fetch_timeout: self.fetch_timeout,
        }
    }
}

impl<E> fmt::Debug for SliceEnvironment<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceEnvironment")
            .field("has_source", &self.source.is_some())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

/// Reducer for one entity slice.
pub struct SliceReducer<E, K> {
    _phantom: PhantomData<fn() -> (E, K)>,
}

impl<E, K> SliceReducer<E, K> {
    /// Create a new slice reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<E, K> Default for SliceReducer<E, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, K> Clone for SliceReducer<E, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, K> Copy for SliceReducer<E, K> {}

impl<E, K> fmt::Debug for SliceReducer<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SliceReducer")
    }
}

impl<E, K> Reducer for SliceReducer<E, K>
where
    E: Clone + Send + 'static,
    K: Eq + Hash + Clone + Send + 'static,
{
    type State = SliceState<E, K>;
    type Action = EntityAction<E, K>;
    type Environment = SliceEnvironment<E>;

    fn reduce(
        &self,
        state: &Arc<Self::State>,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Reduction<Self::State, Self::Action> {
        match action {
            EntityAction::Add(entity) => Reduction::new(Arc::new(SliceState {
                table: state.table.add_one(entity),
                tracker: state.tracker.clone(),
            })),

            EntityAction::Remove(key) => {
                let table = state.table.remove_one(&key);
                if table.ptr_eq(&state.table) {
                    return Reduction::unchanged(state);
                }
                Reduction::new(Arc::new(SliceState {
                    table,
                    tracker: state.tracker.clone(),
                }))
            },

            EntityAction::FetchRequested { request_id } => {
                let Some(tracker) = state.tracker.start(request_id.clone()) else {
                    metrics::counter!("slice.fetch.skipped").increment(1);
                    return Reduction::unchanged(state);
                };

                metrics::counter!("slice.fetch.started").increment(1);
                tracing::debug!(request_id = %request_id, "fetch started");

                let reduction = Reduction::new(Arc::new(SliceState {
                    table: state.table.clone(),
                    tracker,
                }));

                match env.fetch_effect(request_id) {
                    Some(effect) => reduction.with_effect(effect),
                    None => reduction,
                }
            },

            EntityAction::FetchSucceeded {
                request_id,
                entities,
            } => {
                let Some(tracker) = state.tracker.succeed(&request_id) else {
                    metrics::counter!("slice.fetch.stale").increment(1);
                    return Reduction::unchanged(state);
                };

                tracing::debug!(
                    request_id = %request_id,
                    count = entities.len(),
                    "fetch succeeded"
                );

                Reduction::new(Arc::new(SliceState {
                    table: state.table.set_all(entities),
                    tracker,
                }))
            },

            EntityAction::FetchFailed {
                request_id,
                message,
            } => {
                let Some(tracker) = state.tracker.fail(&request_id, message) else {
                    metrics::counter!("slice.fetch.stale").increment(1);
                    return Reduction::unchanged(state);
                };

                Reduction::new(Arc::new(SliceState {
                    table: state.table.clone(),
                    tracker,
                }))
            },
        }
    }
}
