//! # Slicekit Testing
//!
//! Testing utilities and helpers for Slicekit reducers and stores.
//!
//! This crate provides:
//! - Mock implementations of environment collaborators
//! - A Given-When-Then harness for pure reducers
//! - Property-based testing strategies
//! - Assertion helpers for reductions
//!
//! ## Example
//!
//! ```ignore
//! use slicekit_testing::mocks::{ScriptedSource, SequentialRequestIds};
//!
//! #[tokio::test]
//! async fn test_out_of_order_completions() {
//!     let source = ScriptedSource::new()
//!         .then_ok_after(Duration::from_millis(50), vec![book(1)])
//!         .then_ok(vec![book(2)]);
//!     let env = SliceEnvironment::with_source(Arc::new(source));
//!     // ...
//! }
//! ```


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment collaborators
pub mod mocks {
    use futures::future::BoxFuture;
    use slicekit_core::environment::RequestIds;
    use slicekit_core::lifecycle::RequestId;
    use slicekit_core::source::{EntitySource, FetchError};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// Predictable request ids: `req-1`, `req-2`, ...
    ///
    /// # Example
    ///
    /// ```
    /// use slicekit_core::environment::RequestIds;
    /// use slicekit_testing::mocks::SequentialRequestIds;
    ///
    /// let ids = SequentialRequestIds::new();
    /// assert_eq!(ids.next_id().as_str(), "req-1");
    /// assert_eq!(ids.next_id().as_str(), "req-2");
    /// ```
    #[derive(Debug, Default)]
    pub struct SequentialRequestIds {
        issued: AtomicUsize,
    }

    impl SequentialRequestIds {
        /// Start the sequence at `req-1`
        #[must_use]
        pub const fn new() -> Self {
            Self {
                issued: AtomicUsize::new(0),
            }
        }
    }

    impl RequestIds for SequentialRequestIds {
        fn next_id(&self) -> RequestId {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            RequestId::from(format!("req-{n}"))
        }
    }

    struct Step<E> {
        delay: Duration,
        result: Result<Vec<E>, FetchError>,
    }

    /// A source answering each call with the next scripted response.
    ///
    /// Responses are consumed in call order; each may carry a delay, so two
    /// overlapping fetches can be made to resolve in reverse order. Once the
    /// script is exhausted every call fails with `"script exhausted"`.
    pub struct ScriptedSource<E> {
        steps: Mutex<VecDeque<Step<E>>>,
        calls: AtomicUsize,
    }

    impl<E> ScriptedSource<E> {
        /// An empty script
        #[must_use]
        pub const fn new() -> Self {
            Self {
                steps: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
            }
        }

        /// Queue an immediate success
        #[must_use]
        pub fn then_ok(self, entities: Vec<E>) -> Self {
            self.then_ok_after(Duration::ZERO, entities)
        }

        /// Queue a success delivered after `delay`
        #[must_use]
        pub fn then_ok_after(self, delay: Duration, entities: Vec<E>) -> Self {
            self.push(delay, Ok(entities))
        }

        /// Queue an immediate failure
        #[must_use]
        pub fn then_err(self, message: impl Into<String>) -> Self {
            self.then_err_after(Duration::ZERO, message)
        }

        /// Queue a failure delivered after `delay`
        #[must_use]
        pub fn then_err_after(self, delay: Duration, message: impl Into<String>) -> Self {
            self.push(delay, Err(FetchError::source(message)))
        }

        /// Number of fetches issued so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn push(self, delay: Duration, result: Result<Vec<E>, FetchError>) -> Self {
            self.steps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Step { delay, result });
            self
        }
    }

    impl<E> Default for ScriptedSource<E> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<E> EntitySource<E> for ScriptedSource<E>
    where
        E: Send,
    {
        fn fetch(&self) -> BoxFuture<'_, Result<Vec<E>, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Pop eagerly so the response belongs to the call order, not the poll order
            let step = self
                .steps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();

            Box::pin(async move {
                let Some(step) = step else {
                    return Err(FetchError::source("script exhausted"));
                };
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.result
            })
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly `tracing` subscriber once per process.
    ///
    /// Honors `RUST_LOG`, defaulting to `warn`. Output goes through the test
    /// harness writer so it is captured per test.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// Distinct `u32` keys in generation order, up to `max_len` of them.
    pub fn unique_keys(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(0u32..10_000, 0..=max_len).prop_map(|keys| {
            let mut seen = HashSet::new();
            keys.into_iter().filter(|key| seen.insert(*key)).collect()
        })
    }

    /// Short lowercase titles.
    pub fn titles() -> impl Strategy<Value = String> {
        "[a-z]{1,12}"
    }
}

// Re-export commonly used items
pub use mocks::{ScriptedSource, SequentialRequestIds};
