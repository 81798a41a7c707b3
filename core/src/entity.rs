//! Normalized entity table.
//!
//! An [`EntityTable`] stores records of one type keyed by an identity extracted
//! from each record. Keys keep their insertion order in `ids`; the records live
//! in a key → entity map. Both halves sit behind `Arc`, so every operation
//! returns a new table while sharing whatever it did not touch:
//!
//! ```
//! use slicekit_core::entity::{EntityTable, HasId};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Book {
//!     id: u32,
//!     title: &'static str,
//! }
//!
//! impl HasId for Book {
//!     type Id = u32;
//!     fn id(&self) -> u32 {
//!         self.id
//!     }
//! }
//!
//! let empty = EntityTable::<Book, u32>::new();
//! let one = empty.add_one(Book { id: 1, title: "Dune" });
//!
//! assert!(empty.is_empty());
//! assert_eq!(one.select_ids(), &[1]);
//!
//! // Removing an absent key hands back a table sharing the same storage
//! let same = one.remove_one(&7);
//! assert!(same.ptr_eq(&one));
//! ```

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Default identity for an entity: the Rust rendition of "a field named `id`".
pub trait HasId {
    /// The key type of this entity
    type Id;

    /// Extract the entity's key.
    fn id(&self) -> Self::Id;
}

/// Key-selector function supplied when a table is constructed.
pub type KeySelector<E, K> = Arc<dyn Fn(&E) -> K + Send + Sync>;

/// Normalized keyed storage for records of one type.
///
/// # Invariants
///
/// - `ids` and `entities.keys()` always hold the same set of keys
/// - no key appears twice in `ids`
pub struct EntityTable<E, K> {
    ids: Arc<Vec<K>>,
    entities: Arc<HashMap<K, E>>,
    select_id: KeySelector<E, K>,
}

impl<E, K> EntityTable<E, K>
where
    E: HasId<Id = K> + 'static,
{
    /// Create an empty table keyed by [`HasId::id`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_selector(|entity: &E| entity.id())
    }
}

impl<E, K> Default for EntityTable<E, K>
where
    E: HasId<Id = K> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, K> EntityTable<E, K> {
    /// Create an empty table with a custom key selector.
    #[must_use]
    pub fn with_selector<F>(select_id: F) -> Self
    where
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        Self {
            ids: Arc::new(Vec::new()),
            entities: Arc::new(HashMap::new()),
            select_id: Arc::new(select_id),
        }
    }

    /// Whether both tables share the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ids, &other.ids) && Arc::ptr_eq(&self.entities, &other.entities)
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn select_ids(&self) -> &[K] {
        &self.ids
    }

    /// The raw key → entity mapping.
    #[must_use]
    pub fn select_entities(&self) -> &HashMap<K, E> {
        &self.entities
    }

    /// Number of stored entities.
    #[must_use]
    pub fn select_total(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn shared_ids(&self) -> &Arc<Vec<K>> {
        &self.ids
    }

    pub(crate) fn shared_entities(&self) -> &Arc<HashMap<K, E>> {
        &self.entities
    }

    fn derive(&self, ids: Arc<Vec<K>>, entities: Arc<HashMap<K, E>>) -> Self {
        Self {
            ids,
            entities,
            select_id: Arc::clone(&self.select_id),
        }
    }
}

impl<E, K> EntityTable<E, K>
where
    E: Clone,
    K: Eq + Hash + Clone,
{
    /// Extract the key of `entity` with this table's selector.
    pub fn key_of(&self, entity: &E) -> K {
        (self.select_id)(entity)
    }

    /// Entity stored under `key`, if any.
    #[must_use]
    pub fn select_by_id(&self, key: &K) -> Option<&E> {
        self.entities.get(key)
    }

    /// Entities in `ids` order.
    ///
    /// The iterator is `Clone`, so it can be restarted without touching the table.
    pub fn select_all(&self) -> impl Iterator<Item = &E> + Clone + '_ {
        self.ids.iter().filter_map(move |key| self.entities.get(key))
    }

    /// Insert `entity`, replacing any entity stored under the same key.
    ///
    /// A replaced entity keeps its position in `ids`.
    #[must_use]
    pub fn add_one(&self, entity: E) -> Self {
        self.add_many(std::iter::once(entity))
    }

    /// Upsert every entity of `entities` in order.
    #[must_use]
    pub fn add_many<I>(&self, entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let mut map = (*self.entities).clone();
        let mut appended = Vec::new();

        for entity in entities {
            let key = self.key_of(&entity);
            if map.insert(key.clone(), entity).is_none() {
                appended.push(key);
            }
        }

        let ids = if appended.is_empty() {
            Arc::clone(&self.ids)
        } else {
            let mut ids = (*self.ids).clone();
            ids.extend(appended);
            Arc::new(ids)
        };

        self.derive(ids, Arc::new(map))
    }

    /// Remove the entity stored under `key`.
    ///
    /// An absent key returns a table sharing this table's storage.
    #[must_use]
    pub fn remove_one(&self, key: &K) -> Self {
        self.remove_many(std::slice::from_ref(key))
    }

    /// Remove every key of `keys`; absent keys are ignored.
    #[must_use]
    pub fn remove_many(&self, keys: &[K]) -> Self {
        if !keys.iter().any(|key| self.entities.contains_key(key)) {
            return self.clone();
        }

        let mut map = (*self.entities).clone();
        for key in keys {
            map.remove(key);
        }

        let ids = self
            .ids
            .iter()
            .filter(|key| map.contains_key(*key))
            .cloned()
            .collect();

        self.derive(Arc::new(ids), Arc::new(map))
    }

    /// Remove every entity.
    #[must_use]
    pub fn remove_all(&self) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        self.derive(Arc::new(Vec::new()), Arc::new(HashMap::new()))
    }

    /// Replace the whole content with `entities`.
    ///
    /// Duplicate keys collapse to one entry: the later entity wins, and the key
    /// keeps the position of its first appearance.
    #[must_use]
    pub fn set_all<I>(&self, entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let mut ids = Vec::new();
        let mut map = HashMap::new();

        for entity in entities {
            let key = self.key_of(&entity);
            if map.insert(key.clone(), entity).is_none() {
                ids.push(key);
            }
        }

        self.derive(Arc::new(ids), Arc::new(map))
    }
}

impl<E, K> Clone for EntityTable<E, K> {
    fn clone(&self) -> Self {
        self.derive(Arc::clone(&self.ids), Arc::clone(&self.entities))
    }
}

impl<E, K> PartialEq for EntityTable<E, K>
where
    E: PartialEq,
    K: Eq + Hash,
{
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.ids == other.ids && self.entities == other.entities)
    }
}

impl<E, K> fmt::Debug for EntityTable<E, K>
where
    E: fmt::Debug,
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTable")
            .field("ids", &self.ids)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

impl<E, K> Serialize for EntityTable<E, K>
where
    E: Serialize,
    K: Serialize + Eq + Hash,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut table = serializer.serialize_struct("EntityTable", 2)?;
        table.serialize_field("ids", &*self.ids)?;
        table.serialize_field("entities", &*self.entities)?;
        table.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq, Serialize)]
    struct Book {
        id: u32,
        title: String,
    }

    impl HasId for Book {
        type Id = u32;
        fn id(&self) -> u32 {
            self.id
        }
    }

    fn book(id: u32, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_add_one_appends_in_order() {
        let table = EntityTable::<Book, u32>::new()
            .add_one(book(3, "c"))
            .add_one(book(1, "a"))
            .add_one(book(2, "b"));

        assert_eq!(table.select_ids(), &[3, 1, 2]);
        let titles: Vec<_> = table.select_all().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_add_one_upserts_in_place() {
        let table = EntityTable::<Book, u32>::new()
            .add_one(book(1, "first"))
            .add_one(book(2, "second"))
            .add_one(book(1, "replaced"));

        assert_eq!(table.select_ids(), &[1, 2]);
        assert_eq!(table.select_by_id(&1), Some(&book(1, "replaced")));
        assert_eq!(table.select_total(), 2);
    }

    #[test]
    fn test_upsert_shares_ids() {
        let table = EntityTable::<Book, u32>::new().add_one(book(1, "a"));
        let updated = table.add_one(book(1, "b"));

        assert!(Arc::ptr_eq(table.shared_ids(), updated.shared_ids()));
        assert!(!Arc::ptr_eq(table.shared_entities(), updated.shared_entities()));
    }

    #[test]
    fn test_operations_do_not_touch_receiver() {
        let original = EntityTable::<Book, u32>::new().add_one(book(1, "a"));
        let _added = original.add_one(book(2, "b"));
        let _removed = original.remove_one(&1);
        let _replaced = original.set_all(vec![book(9, "z")]);

        assert_eq!(original.select_ids(), &[1]);
        assert_eq!(original.select_by_id(&1), Some(&book(1, "a")));
    }

    #[test]
    fn test_remove_absent_key_is_identity() {
        let table = EntityTable::<Book, u32>::new().add_one(book(1, "a"));
        let same = table.remove_one(&42);

        assert!(same.ptr_eq(&table));
        assert_eq!(same, table);
    }

    #[test]
    fn test_remove_one_drops_both_halves() {
        let table = EntityTable::<Book, u32>::new()
            .add_one(book(1, "a"))
            .add_one(book(2, "b"))
            .remove_one(&1);

        assert_eq!(table.select_ids(), &[2]);
        assert!(table.select_by_id(&1).is_none());
        assert_eq!(table.select_entities().len(), 1);
    }

    #[test]
    fn test_add_then_remove_equals_initial() {
        let initial = EntityTable::<Book, u32>::new();
        let table = initial.add_one(book(1, "a")).remove_one(&1);

        assert_eq!(table, initial);
        assert!(table.is_empty());
    }

    #[test]
    fn test_set_all_later_duplicate_wins() {
        let table = EntityTable::<Book, u32>::new()
            .add_one(book(7, "stale"))
            .set_all(vec![book(1, "a"), book(2, "b"), book(1, "a2")]);

        assert_eq!(table.select_ids(), &[1, 2]);
        assert_eq!(table.select_by_id(&1), Some(&book(1, "a2")));
        assert!(table.select_by_id(&7).is_none());
    }

    #[test]
    fn test_remove_many_and_remove_all() {
        let table = EntityTable::<Book, u32>::new().add_many(vec![
            book(1, "a"),
            book(2, "b"),
            book(3, "c"),
        ]);

        let trimmed = table.remove_many(&[1, 3, 99]);
        assert_eq!(trimmed.select_ids(), &[2]);

        let cleared = trimmed.remove_all();
        assert!(cleared.is_empty());
        assert!(cleared.remove_all().ptr_eq(&cleared));
    }

    #[test]
    fn test_custom_selector() {
        let table = EntityTable::<Book, String>::with_selector(|b: &Book| b.title.clone())
            .add_one(book(1, "same"))
            .add_one(book(2, "same"));

        assert_eq!(table.select_ids(), &["same".to_string()]);
        assert_eq!(table.select_by_id(&"same".to_string()).map(|b| b.id), Some(2));
    }

    #[test]
    fn test_selector_runs_once_per_entity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let table = EntityTable::<Book, u32>::with_selector(move |b: &Book| {
            counter.fetch_add(1, Ordering::SeqCst);
            b.id
        });

        let table = table.set_all(vec![book(1, "a"), book(2, "b"), book(3, "c")]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let table = table.add_many(vec![book(4, "d"), book(5, "e")]);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let table = table.remove_one(&2).remove_many(&[3, 99]);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let table = table.add_one(book(1, "a2"));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(table.select_ids(), &[1, 4, 5]);
    }

    #[test]
    fn test_select_all_is_restartable() {
        let table = EntityTable::<Book, u32>::new()
            .add_one(book(1, "a"))
            .add_one(book(2, "b"));

        let iter = table.select_all();
        let first: Vec<_> = iter.clone().map(|b| b.id).collect();
        let second: Vec<_> = iter.map(|b| b.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serializes_ids_and_entities() {
        let table = EntityTable::<Book, u32>::new().add_one(book(1, "a"));
        let json = serde_json::to_value(&table).unwrap_or_default();

        assert_eq!(json["ids"], serde_json::json!([1]));
        assert_eq!(json["entities"]["1"]["title"], "a");
    }

    fn arb_books() -> impl Strategy<Value = Vec<Book>> {
        prop::collection::vec((0u32..20, "[a-z]{0,6}"), 0..30).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(id, title)| Book { id, title })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_remove_absent_is_idempotent(books in arb_books(), missing in 100u32..200) {
            let table = EntityTable::<Book, u32>::new().add_many(books);
            prop_assert_eq!(table.remove_one(&missing), table);
        }

        #[test]
        fn prop_upsert_keeps_single_entry(id in 0u32..50, a in "[a-z]{1,5}", b in "[a-z]{1,5}") {
            let table = EntityTable::<Book, u32>::new()
                .add_one(Book { id, title: a })
                .add_one(Book { id, title: b.clone() });

            prop_assert_eq!(table.select_ids(), &[id]);
            prop_assert_eq!(table.select_by_id(&id).map(|x| x.title.clone()), Some(b));
        }

        #[test]
        fn prop_distinct_adds_preserve_call_order(
            ids in prop::collection::hash_set(0u32..1000, 0..40),
        ) {
            let ids: Vec<u32> = ids.into_iter().collect();
            let table = ids.iter().fold(EntityTable::<Book, u32>::new(), |table, &id| {
                table.add_one(Book { id, title: String::new() })
            });

            let selected: Vec<u32> = table.select_all().map(|b| b.id).collect();
            prop_assert_eq!(selected, ids);
        }

        #[test]
        fn prop_set_all_round_trips_unique_keys(
            ids in prop::collection::hash_set(0u32..1000, 0..40),
        ) {
            let books: Vec<Book> = ids
                .into_iter()
                .map(|id| Book { id, title: format!("t{id}") })
                .collect();
            let table = EntityTable::<Book, u32>::new().set_all(books.clone());

            let selected: Vec<Book> = table.select_all().cloned().collect();
            prop_assert_eq!(selected, books);
        }

        #[test]
        fn prop_ids_match_entity_keys(
            books in arb_books(),
            removals in prop::collection::vec(0u32..20, 0..10),
        ) {
            let table = EntityTable::<Book, u32>::new()
                .add_many(books)
                .remove_many(&removals);

            let mut ids = table.select_ids().to_vec();
            let mut keys: Vec<u32> = table.select_entities().keys().copied().collect();
            ids.sort_unstable();
            keys.sort_unstable();
            prop_assert_eq!(&ids, &keys);

            ids.dedup();
            prop_assert_eq!(ids.len(), table.select_total());
        }
    }
}
