//! # Bookshelf Example
//!
//! A small application assembled from Slicekit pieces:
//! - `books`: an entity slice keyed by the book's `id`, fetched from a
//!   [`library::Library`] source
//! - `tags`: an entity slice keyed by a custom selector (the tag label)
//! - `counter`: a hand-written reducer with thunk-style asynchronous steps
//!
//! All three live under one [`AppState`], combined with
//! [`combine_reducers`] and [`scope_reducer_with_env`]. Each root action is
//! routed to the one slice that handles it; the other slices keep their
//! snapshots by identity.
//!
//! ## Example
//!
//! ```no_run
//! use bookshelf::library::Library;
//! use bookshelf::{AppEnvironment, AppState, app_reducer};
//! use slicekit_core::slice::SliceEnvironment;
//! use slicekit_runtime::{Store, dispatch_fetch};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), slicekit_runtime::StoreError> {
//! let env = AppEnvironment {
//!     books: SliceEnvironment::with_source(Arc::new(Library::sample())),
//!     ..AppEnvironment::default()
//! };
//! let store = Store::new(AppState::default(), app_reducer(), env);
//!
//! let outcome = dispatch_fetch(&store, "r1".into(), Duration::from_secs(1)).await?;
//! assert!(outcome.is_fulfilled());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use slicekit_core::composition::{
    BoxedReducer, CombinedReducer, combine_reducers, scope_reducer_with_env,
};
use slicekit_core::entity::HasId;
use slicekit_core::lifecycle::RequestId;
use slicekit_core::slice::{
    Completion, EntityAction, FetchAction, SliceEnvironment, SliceReducer, SliceState,
};
use std::sync::Arc;

pub mod config;
pub mod counter;
pub mod library;
pub mod selectors;

pub use counter::{CounterAction, CounterEnvironment, CounterReducer, CounterState, CounterStatus};

/// A book on the shelf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Catalogue number
    pub id: u32,
    /// Title
    pub title: String,
}

impl Book {
    /// Create a book
    #[must_use]
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl HasId for Book {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// A label attached to books. Keyed by `label`, not by a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique label
    pub label: String,
    /// Number of books carrying the tag
    pub uses: u32,
}

/// Books slice state
pub type BooksState = SliceState<Book, u32>;
/// Books slice actions
pub type BooksAction = EntityAction<Book, u32>;
/// Tags slice state
pub type TagsState = SliceState<Tag, String>;
/// Tags slice actions
pub type TagsAction = EntityAction<Tag, String>;

/// Key selector for tags
#[must_use]
pub fn tag_label(tag: &Tag) -> String {
    tag.label.clone()
}

/// Root state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    /// Books slice
    pub books: Arc<BooksState>,
    /// Tags slice
    pub tags: Arc<TagsState>,
    /// Counter slice
    pub counter: Arc<CounterState>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            books: Arc::new(SliceState::new()),
            tags: Arc::new(SliceState::with_selector(tag_label)),
            counter: Arc::new(CounterState::default()),
        }
    }
}

/// Root actions
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Routed to the books slice
    Books(BooksAction),
    /// Routed to the tags slice
    Tags(TagsAction),
    /// Routed to the counter
    Counter(CounterAction),
    /// An action no slice handles
    Unrecognized(String),
}

impl From<BooksAction> for AppAction {
    fn from(action: BooksAction) -> Self {
        Self::Books(action)
    }
}

impl From<TagsAction> for AppAction {
    fn from(action: TagsAction) -> Self {
        Self::Tags(action)
    }
}

impl From<CounterAction> for AppAction {
    fn from(action: CounterAction) -> Self {
        Self::Counter(action)
    }
}

/// Root fetches target the books slice, so only books completions settle
/// them. A tags completion carrying the same id is not mistaken for one.
impl FetchAction for AppAction {
    fn fetch_requested(request_id: RequestId) -> Self {
        Self::Books(EntityAction::FetchRequested { request_id })
    }

    fn completion(&self) -> Option<Completion<'_>> {
        match self {
            Self::Books(action) => action.completion(),
            Self::Tags(_) | Self::Counter(_) | Self::Unrecognized(_) => None,
        }
    }
}

/// Root environment
#[derive(Debug, Clone, Default)]
pub struct AppEnvironment {
    /// Books slice dependencies
    pub books: SliceEnvironment<Book>,
    /// Tags slice dependencies
    pub tags: SliceEnvironment<Tag>,
    /// Counter dependencies
    pub counter: CounterEnvironment,
}

/// The combined root reducer
pub type AppReducer = CombinedReducer<AppState, AppAction, AppEnvironment>;

/// Build the root reducer: books, then tags, then counter.
#[must_use]
pub fn app_reducer() -> AppReducer {
    let reducers: Vec<BoxedReducer<AppState, AppAction, AppEnvironment>> = vec![
        Box::new(scope_reducer_with_env(
            SliceReducer::<Book, u32>::new(),
            |app: &AppState| &app.books,
            |app: &AppState, books| AppState {
                books,
                ..app.clone()
            },
            |action: AppAction| match action {
                AppAction::Books(action) => Some(action),
                _ => None,
            },
            AppAction::Books,
            |env: &AppEnvironment| &env.books,
        )),
        Box::new(scope_reducer_with_env(
            SliceReducer::<Tag, String>::new(),
            |app: &AppState| &app.tags,
            |app: &AppState, tags| AppState {
                tags,
                ..app.clone()
            },
            |action: AppAction| match action {
                AppAction::Tags(action) => Some(action),
                _ => None,
            },
            AppAction::Tags,
            |env: &AppEnvironment| &env.tags,
        )),
        Box::new(scope_reducer_with_env(
            CounterReducer::new(),
            |app: &AppState| &app.counter,
            |app: &AppState, counter| AppState {
                counter,
                ..app.clone()
            },
            |action: AppAction| match action {
                AppAction::Counter(action) => Some(action),
                _ => None,
            },
            AppAction::Counter,
            |env: &AppEnvironment| &env.counter,
        )),
    ];
    combine_reducers(reducers)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use slicekit_core::lifecycle::LoadingStatus;
    use slicekit_core::reducer::Reducer;
    use slicekit_testing::{ReducerTest, assertions};

    #[test]
    fn test_add_book_leaves_other_slices() {
        let initial = Arc::new(AppState::default());
        let reduction = app_reducer().reduce(
            &initial,
            AppAction::Books(EntityAction::Add(Book::new(1, "Dune"))),
            &AppEnvironment::default(),
        );

        assert_eq!(reduction.state.books.table.select_total(), 1);
        assert!(Arc::ptr_eq(&reduction.state.tags, &initial.tags));
        assert!(Arc::ptr_eq(&reduction.state.counter, &initial.counter));
    }

    #[test]
    fn test_unrecognized_action_keeps_root() {
        ReducerTest::new(app_reducer())
            .with_env(AppEnvironment::default())
            .given_state(AppState::default())
            .when_action(AppAction::Unrecognized("books/shelved".to_string()))
            .then_unchanged()
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_tags_keyed_by_label() {
        ReducerTest::new(app_reducer())
            .with_env(AppEnvironment::default())
            .given_state(AppState::default())
            .when_action(AppAction::Tags(EntityAction::Add(Tag {
                label: "sf".to_string(),
                uses: 1,
            })))
            .when_action(AppAction::Tags(EntityAction::Add(Tag {
                label: "sf".to_string(),
                uses: 2,
            })))
            .then_state(|state| {
                assert_eq!(state.tags.table.select_ids(), ["sf".to_string()]);
                assert_eq!(
                    state.tags.table.select_by_id(&"sf".to_string()).map(|t| t.uses),
                    Some(2)
                );
            })
            .run();
    }

    #[test]
    fn test_root_fetch_targets_books() {
        ReducerTest::new(app_reducer())
            .with_env(AppEnvironment::default())
            .given_state(AppState::default())
            .when_action(AppAction::fetch_requested(RequestId::from("r1")))
            .then_state(|state| {
                assert_eq!(state.books.status(), LoadingStatus::Pending);
                assert_eq!(state.tags.status(), LoadingStatus::Idle);
            })
            .run();
    }

    #[test]
    fn test_completion_view_of_root_actions() {
        let books = AppAction::Books(EntityAction::FetchFailed {
            request_id: RequestId::from("r1"),
            message: "Uh oh".to_string(),
        });
        assert_eq!(
            books.completion().map(|c| c.request_id().as_str().to_string()),
            Some("r1".to_string())
        );

        let tags = AppAction::Tags(EntityAction::FetchFailed {
            request_id: RequestId::from("r1"),
            message: "Uh oh".to_string(),
        });
        assert!(tags.completion().is_none());
        assert!(AppAction::Counter(CounterAction::Incremented(None))
            .completion()
            .is_none());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = AppState::default();
        let json = serde_json::to_value(&state).unwrap_or_default();
        assert_eq!(json["books"]["status"], "idle");
        assert_eq!(json["tags"]["ids"], serde_json::json!([]));
        assert_eq!(json["counter"]["value"], 0);
        assert_eq!(json["counter"]["status"], "idle");
    }
}
