//! The I/O collaborator behind a slice fetch.
//!
//! The core never performs I/O itself. A slice environment may carry an
//! [`EntitySource`]; when a fetch is accepted, the reducer returns an effect
//! that awaits the source and feeds the outcome back as a completion action.
//! Transport, retries and caching are the source's business.

use futures::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;

/// Why a fetch did not produce entities.
///
/// The `Display` string is what a slice records in its tracker's `error` field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The source reported a failure
    #[error("{0}")]
    Source(String),

    /// The fetch did not resolve within the configured timeout
    #[error("Fetch timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl FetchError {
    /// Construct a source failure from any message.
    #[must_use]
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

/// Asynchronous producer of the entities a slice loads.
///
/// # Dyn Compatibility
///
/// The trait returns a boxed future so it can be stored as
/// `Arc<dyn EntitySource<E>>` inside an environment.
pub trait EntitySource<E>: Send + Sync {
    /// Fetch the full collection.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the collection cannot be produced.
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<E>, FetchError>>;
}

/// A source that always resolves to the same collection.
#[derive(Debug, Clone)]
pub struct StaticSource<E> {
    entities: Vec<E>,
}

impl<E> StaticSource<E> {
    /// Create a source resolving to `entities`.
    #[must_use]
    pub const fn new(entities: Vec<E>) -> Self {
        Self { entities }
    }
}

impl<E> EntitySource<E> for StaticSource<E>
where
    E: Clone + Send + Sync,
{
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<E>, FetchError>> {
        let entities = self.entities.clone();
        Box::pin(async move { Ok(entities) })
    }
}
