//! Dispatching a slice fetch and awaiting its own completion.
//!
//! [`dispatch_fetch`] sends `FetchRequested` under a caller-chosen id and
//! resolves once the store has reduced the completion carrying that id. The
//! caller learns whether its request was fulfilled, rejected, or skipped
//! because another request was already in flight.

use crate::store::{Store, wait_for_action};
use crate::StoreError;
use slicekit_core::lifecycle::RequestId;
use slicekit_core::reducer::Reducer;
use slicekit_core::slice::{Completion, FetchAction};
use std::time::Duration;

/// Result of one dispatched fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The fetch resolved and `count` entities replaced the table
    Fulfilled {
        /// Id the fetch ran under
        request_id: RequestId,
        /// Number of entities delivered
        count: usize,
    },
    /// The fetch failed; `message` is now the slice's error
    Rejected {
        /// Id the fetch ran under
        request_id: RequestId,
        /// Failure reason
        message: String,
    },
    /// Another request was pending, so this one never started
    Skipped {
        /// Id that was not started
        request_id: RequestId,
    },
}

impl FetchOutcome {
    /// Id of the request this outcome belongs to
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        match self {
            Self::Fulfilled { request_id, .. }
            | Self::Rejected { request_id, .. }
            | Self::Skipped { request_id } => request_id,
        }
    }

    /// Whether the fetch delivered entities
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }
}

/// Send a fetch start under `request_id` and wait for its completion.
///
/// Completions for other ids are ignored. The store reduces the completion
/// before this returns, so reading state afterwards observes it.
///
/// # Errors
///
/// - [`StoreError::ShutdownInProgress`]: the store no longer accepts actions
/// - [`StoreError::Timeout`]: no completion for `request_id` within `timeout`
///   (also the case for a slice environment without a source)
/// - [`StoreError::ChannelClosed`]: the action broadcast closed
#[tracing::instrument(skip_all, fields(request_id = %request_id))]
pub async fn dispatch_fetch<S, A, E, R>(
    store: &Store<S, A, E, R>,
    request_id: RequestId,
    timeout: Duration,
) -> Result<FetchOutcome, StoreError>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: FetchAction + Send + Sync + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    // Subscribe BEFORE sending to avoid race condition
    let mut rx = store.subscribe_actions();

    let handle = store.send(A::fetch_requested(request_id.clone())).await?;
    if !handle.state_changed() {
        tracing::debug!("Fetch skipped: another request is pending");
        return Ok(FetchOutcome::Skipped { request_id });
    }

    let outcome = wait_for_action(
        &mut rx,
        |action: &A| match action.completion()? {
            Completion::Succeeded { request_id: id, count } if id == &request_id => {
                Some(FetchOutcome::Fulfilled {
                    request_id: id.clone(),
                    count,
                })
            },
            Completion::Failed { request_id: id, message } if id == &request_id => {
                Some(FetchOutcome::Rejected {
                    request_id: id.clone(),
                    message: message.to_string(),
                })
            },
            Completion::Succeeded { .. } | Completion::Failed { .. } => None,
        },
        timeout,
    )
    .await?;

    tracing::debug!(outcome = ?outcome, "Fetch settled");
    Ok(outcome)
}
