//! Root-level views over [`AppState`].

use crate::{AppState, Book, BooksState, Tag};
use slicekit_core::lifecycle::LoadingStatus;
use slicekit_core::selectors::{self, SelectAll};
use std::collections::HashMap;
use std::sync::Arc;

/// The books slice of the root state.
#[must_use]
pub fn books_state(state: &AppState) -> &BooksState {
    &state.books
}

/// Status of the books fetch.
#[must_use]
pub fn books_status(state: &AppState) -> LoadingStatus {
    selectors::select_status(&state.books)
}

/// Message of the last failed books fetch.
#[must_use]
pub fn books_error(state: &AppState) -> Option<&str> {
    selectors::select_error(&state.books)
}

/// Look a book up by id.
#[must_use]
pub fn book_by_id(state: &AppState, id: u32) -> Option<&Book> {
    selectors::select_by_id(&state.books, &id)
}

/// Books keyed by id.
#[must_use]
pub fn book_entities(state: &AppState) -> Arc<HashMap<u32, Book>> {
    selectors::select_entity_map(&state.books.table)
}

/// Memoized list views, one cache per selector instance.
#[derive(Debug, Default)]
pub struct ShelfSelectors {
    books: SelectAll<Book, u32>,
    tags: SelectAll<Tag, String>,
}

impl ShelfSelectors {
    /// Fresh, empty caches.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            books: SelectAll::new(),
            tags: SelectAll::new(),
        }
    }

    /// All books in table order.
    pub fn all_books(&self, state: &AppState) -> Arc<[Book]> {
        self.books.select_from(&state.books)
    }

    /// All tags in table order.
    pub fn all_tags(&self, state: &AppState) -> Arc<[Tag]> {
        self.tags.select_from(&state.tags)
    }
}
