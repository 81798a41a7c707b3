//! Request lifecycle tracking.
//!
//! A [`RequestTracker`] follows one asynchronous operation through
//! `idle → pending → (loaded | error)`. Completions are matched against the
//! in-flight [`RequestId`], so a superseded request resolving late can never
//! overwrite fresher state. That identity check, not arrival order, decides
//! which completion is allowed to land.
//!
//! # Overlapping starts
//!
//! A `start` while a request is already pending is ignored: the first request
//! keeps the slot, and the second request's completion is later discarded as
//! stale.
//!
//! ```
//! use slicekit_core::lifecycle::{LoadingStatus, RequestId, RequestTracker};
//!
//! let r1 = RequestId::from("r1");
//! let r2 = RequestId::from("r2");
//!
//! let pending = RequestTracker::new().start(r1.clone()).unwrap_or_default();
//! assert!(pending.start(r2.clone()).is_none());
//! assert!(pending.succeed(&r2).is_none());
//!
//! let loaded = pending.succeed(&r1).unwrap_or_default();
//! assert_eq!(loaded.status(), LoadingStatus::Loaded);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Opaque token distinguishing one fetch attempt from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of the tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A request is in flight
    Pending,
    /// The last accepted request succeeded
    Loaded,
    /// The last accepted request failed
    Error,
}

impl LoadingStatus {
    /// Check if a request is in flight
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for LoadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pending => write!(f, "pending"),
            Self::Loaded => write!(f, "loaded"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Lifecycle of one asynchronous operation slot.
///
/// # Invariant
///
/// `current_request_id` is `Some` if and only if `status == Pending`.
///
/// Fields are only reachable through the transition methods, and
/// deserialization rejects a tracker that breaks the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TrackerFields")]
pub struct RequestTracker {
    status: LoadingStatus,
    current_request_id: Option<RequestId>,
    error: Option<String>,
}

/// A deserialized tracker whose fields contradict each other.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTracker {
    /// Pending without an in-flight id
    #[error("pending tracker has no currentRequestId")]
    MissingRequestId,

    /// An in-flight id outside of pending
    #[error("{status} tracker carries currentRequestId {request_id}")]
    UnexpectedRequestId {
        /// Status found
        status: LoadingStatus,
        /// Id found
        request_id: RequestId,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackerFields {
    #[serde(default)]
    status: LoadingStatus,
    #[serde(default)]
    current_request_id: Option<RequestId>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<TrackerFields> for RequestTracker {
    type Error = InvalidTracker;

    fn try_from(fields: TrackerFields) -> Result<Self, Self::Error> {
        match (fields.status.is_pending(), fields.current_request_id) {
            (true, None) => Err(InvalidTracker::MissingRequestId),
            (false, Some(request_id)) => Err(InvalidTracker::UnexpectedRequestId {
                status: fields.status,
                request_id,
            }),
            (_, current_request_id) => Ok(Self {
                status: fields.status,
                current_request_id,
                error: fields.error,
            }),
        }
    }
}

impl RequestTracker {
    /// An idle tracker with no error.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: LoadingStatus::Idle,
            current_request_id: None,
            error: None,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> LoadingStatus {
        self.status
    }

    /// Id of the in-flight request, set only while pending.
    #[must_use]
    pub const fn current_request_id(&self) -> Option<&RequestId> {
        self.current_request_id.as_ref()
    }

    /// Message of the last failure, cleared by the next start.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a completion carrying `request_id` belongs to the in-flight request.
    #[must_use]
    pub fn accepts(&self, request_id: &RequestId) -> bool {
        self.status.is_pending() && self.current_request_id.as_ref() == Some(request_id)
    }

    /// Begin tracking `request_id`.
    ///
    /// Returns `None` while another request is pending; the original
    /// `current_request_id` stays in place.
    #[must_use]
    pub fn start(&self, request_id: RequestId) -> Option<Self> {
        if self.status.is_pending() {
            tracing::trace!(
                current = ?self.current_request_id,
                ignored = %request_id,
                "start ignored, request already pending"
            );
            return None;
        }

        Some(Self {
            status: LoadingStatus::Pending,
            current_request_id: Some(request_id),
            error: None,
        })
    }

    /// Complete the in-flight request successfully.
    ///
    /// Returns `None` for a stale or unknown `request_id`.
    #[must_use]
    pub fn succeed(&self, request_id: &RequestId) -> Option<Self> {
        if !self.accepts(request_id) {
            self.trace_stale(request_id);
            return None;
        }

        Some(Self {
            status: LoadingStatus::Loaded,
            current_request_id: None,
            error: None,
        })
    }

    /// Complete the in-flight request with a failure.
    ///
    /// Returns `None` for a stale or unknown `request_id`.
    #[must_use]
    pub fn fail(&self, request_id: &RequestId, message: impl Into<String>) -> Option<Self> {
        if !self.accepts(request_id) {
            self.trace_stale(request_id);
            return None;
        }

        Some(Self {
            status: LoadingStatus::Error,
            current_request_id: None,
            error: Some(message.into()),
        })
    }

    fn trace_stale(&self, request_id: &RequestId) {
        tracing::debug!(
            stale = %request_id,
            current = ?self.current_request_id,
            status = %self.status,
            "discarding stale completion"
        );
    }
}

/// Trackers for several concurrent operations keyed by operation name.
///
/// Each slot is guarded independently: a pending `"books/fetch"` does not
/// block a `"authors/fetch"` start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestTrackers {
    slots: HashMap<String, RequestTracker>,
}

impl RequestTrackers {
    /// Create an empty set of trackers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker for `operation`; unknown operations read as idle.
    #[must_use]
    pub fn get(&self, operation: &str) -> RequestTracker {
        self.slots.get(operation).cloned().unwrap_or_default()
    }

    /// Start `request_id` on `operation`; `None` when that slot is pending.
    #[must_use]
    pub fn start(&self, operation: &str, request_id: RequestId) -> Option<Self> {
        let tracker = self.get(operation).start(request_id)?;
        Some(self.with_slot(operation, tracker))
    }

    /// Succeed `request_id` on `operation`; `None` when stale.
    #[must_use]
    pub fn succeed(&self, operation: &str, request_id: &RequestId) -> Option<Self> {
        let tracker = self.get(operation).succeed(request_id)?;
        Some(self.with_slot(operation, tracker))
    }

    /// Fail `request_id` on `operation`; `None` when stale.
    #[must_use]
    pub fn fail(
        &self,
        operation: &str,
        request_id: &RequestId,
        message: impl Into<String>,
    ) -> Option<Self> {
        let tracker = self.get(operation).fail(request_id, message)?;
        Some(self.with_slot(operation, tracker))
    }

    /// Names of operations with a request in flight.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|(_, tracker)| tracker.status().is_pending())
            .map(|(name, _)| name.as_str())
    }

    fn with_slot(&self, operation: &str, tracker: RequestTracker) -> Self {
        let mut slots = self.slots.clone();
        slots.insert(operation.to_string(), tracker);
        Self { slots }
    }
}
