//! The book source behind the `books` slice.

use crate::Book;
use futures::future::BoxFuture;
use slicekit_core::source::{EntitySource, FetchError};
use std::time::Duration;

/// An in-memory catalogue answering after a fixed delay.
#[derive(Debug, Clone)]
pub struct Library {
    books: Vec<Book>,
    delay: Duration,
    failure: Option<String>,
}

impl Library {
    /// A catalogue holding `books`, answering immediately.
    #[must_use]
    pub const fn new(books: Vec<Book>) -> Self {
        Self {
            books,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// The two books the demo starts from.
    #[must_use]
    pub fn sample() -> Self {
        Self::new(vec![
            Book::new(1, "The Left Hand of Darkness"),
            Book::new(2, "A Wizard of Earthsea"),
        ])
    }

    /// Answer after `delay`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every fetch with `message` instead of answering.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl EntitySource<Book> for Library {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Book>, FetchError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.failure {
                Some(message) => Err(FetchError::source(message.clone())),
                None => Ok(self.books.clone()),
            }
        })
    }
}
