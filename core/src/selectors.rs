//! Read-only views over slice state.
//!
//! Plain selectors are free functions over a [`SliceState`]. [`SelectAll`] is
//! memoized on the identity of the table's shared halves: as long as a reducer
//! hands back the same `Arc`s, callers get the same `Arc<[E]>` back without a
//! rebuild, and can compare results with `Arc::ptr_eq`.

use crate::entity::EntityTable;
use crate::lifecycle::LoadingStatus;
use crate::slice::SliceState;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle status of a slice.
#[must_use]
pub const fn select_status<E, K>(state: &SliceState<E, K>) -> LoadingStatus {
    state.tracker.status()
}

/// Last failure message of a slice, if any.
#[must_use]
pub fn select_error<E, K>(state: &SliceState<E, K>) -> Option<&str> {
    state.tracker.error()
}

/// Entity stored under `key`.
#[must_use]
pub fn select_by_id<'a, E, K>(state: &'a SliceState<E, K>, key: &K) -> Option<&'a E>
where
    E: Clone,
    K: Eq + Hash + Clone,
{
    state.table.select_by_id(key)
}

/// Number of stored entities.
#[must_use]
pub fn select_total<E, K>(state: &SliceState<E, K>) -> usize {
    state.table.select_total()
}

/// The key-to-entity map, shared with the table.
///
/// No copy is made: two unchanged snapshots yield the same `Arc`.
#[must_use]
pub fn select_entity_map<E, K>(table: &EntityTable<E, K>) -> Arc<HashMap<K, E>> {
    Arc::clone(table.shared_entities())
}

/// Cache statistics of a memoized selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectorStats {
    /// Calls answered from the cache
    pub hits: u64,
    /// Calls that rebuilt the output
    pub misses: u64,
}

struct Memo<E, K> {
    // Strong references: a cached pointer can never be recycled by a new table
    ids: Arc<Vec<K>>,
    entities: Arc<HashMap<K, E>>,
    output: Arc<[E]>,
}

/// Memoized `select_all`.
///
/// One instance caches one input. Share it (it is `Send + Sync`) between the
/// readers of one store rather than creating one per call.
pub struct SelectAll<E, K> {
    memo: Mutex<Option<Memo<E, K>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E, K> SelectAll<E, K> {
    /// Create a selector with an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            memo: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache statistics so far.
    #[must_use]
    pub fn stats(&self) -> SelectorStats {
        SelectorStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<E, K> SelectAll<E, K>
where
    E: Clone,
    K: Eq + Hash + Clone,
{
    /// Entities of `table` in `ids` order.
    ///
    /// Returns the cached `Arc` when the table's `ids` and `entities` are the
    /// same allocations as on the previous call.
    pub fn select(&self, table: &EntityTable<E, K>) -> Arc<[E]> {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);

        let hit = memo.as_ref().filter(|cached| {
            Arc::ptr_eq(&cached.ids, table.shared_ids())
                && Arc::ptr_eq(&cached.entities, table.shared_entities())
        });
        if let Some(cached) = hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(&cached.output);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let output: Arc<[E]> = table.select_all().cloned().collect();
        *memo = Some(Memo {
            ids: Arc::clone(table.shared_ids()),
            entities: Arc::clone(table.shared_entities()),
            output: Arc::clone(&output),
        });
        output
    }

    /// Shorthand for selecting from a slice's table.
    pub fn select_from(&self, state: &SliceState<E, K>) -> Arc<[E]> {
        self.select(&state.table)
    }
}

impl<E, K> Default for SelectAll<E, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, K> fmt::Debug for SelectAll<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectAll")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
