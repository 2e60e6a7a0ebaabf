//! Per-resource entity cache.
//!
//! # Design
//! - The store holds one page of truth; nothing is normalized across pages.
//! - `add_entity` is an optimistic insert: it prepends and bumps `total`
//!   without reconciling with server ordering.
//! - Flag setters only touch their own flag.
//! - [`SharedStore`] is the injected container; its lock is never held across an await.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::entity::Entity;
use crate::pagination::{Pagination, PaginationPatch};

/// Entity cache plus list flags for a single resource.
#[derive(Clone, Debug)]
pub struct EntityStore<T: Entity> {
    /// Current page of records.
    pub entities: Vec<T>,
    /// Ids selected for bulk actions.
    pub selected_ids: BTreeSet<String>,
    /// Single focused record (detail view).
    pub selected_id: Option<String>,
    /// Pagination for the held page.
    pub pagination: Pagination,
    /// Raw server metadata from the last list response.
    pub meta: Option<Value>,
    /// A list fetch is in flight.
    pub loading: bool,
    /// A create/update is in flight.
    pub saving: bool,
    /// A delete/restore is in flight.
    pub deleting: bool,
    /// The last successful fetch returned zero rows.
    pub not_found: bool,
    /// Message of the last failed fetch.
    pub error: Option<String>,
    /// The first fetch has completed.
    pub initial: bool,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            selected_ids: BTreeSet::new(),
            selected_id: None,
            pagination: Pagination::default(),
            meta: None,
            loading: false,
            saving: false,
            deleting: false,
            not_found: false,
            error: None,
            initial: false,
        }
    }
}

impl<T: Entity> EntityStore<T> {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held page wholesale.
    pub fn set_all_entities(&mut self, entities: Vec<T>) {
        self.entities = entities;
    }

    /// Replace a record with the same id in place, or prepend it and bump `total`.
    pub fn add_entity(&mut self, entity: T) {
        if let Some(existing) = self.entities.iter_mut().find(|e| e.id() == entity.id()) {
            *existing = entity;
            return;
        }
        self.entities.insert(0, entity);
        self.pagination.total = self.pagination.total.saturating_add(1);
    }

    /// Prepend several records without touching `total`.
    pub fn add_entities(&mut self, entities: Vec<T>) {
        self.entities.splice(0..0, entities);
    }

    /// Replace a record in place, or prepend it. `total` is untouched.
    pub fn set_entity(&mut self, entity: T) {
        match self.position(entity.id()) {
            Some(index) => self.entities[index] = entity,
            None => self.entities.insert(0, entity),
        }
    }

    /// Merge by id: existing records are replaced in place, new ones appended.
    pub fn set_entities(&mut self, entities: Vec<T>) {
        for entity in entities {
            match self.position(entity.id()) {
                Some(index) => self.entities[index] = entity,
                None => self.entities.push(entity),
            }
        }
    }

    /// Shallow-merge `patch` into the record it targets. No-op when absent.
    pub fn update_entity(&mut self, patch: T::Patch) {
        let id = T::patch_id(&patch).to_string();
        if let Some(entity) = self.entities.iter_mut().find(|e| e.id() == id) {
            entity.apply_patch(patch);
        }
    }

    /// Apply `changes` to every record whose id is in `ids`.
    pub fn update_entities<F>(&mut self, ids: &[&str], mut changes: F)
    where
        F: FnMut(&mut T),
    {
        for entity in &mut self.entities {
            if ids.contains(&entity.id()) {
                changes(entity);
            }
        }
    }

    /// Apply `changes` to every held record.
    pub fn update_all_entities<F>(&mut self, changes: F)
    where
        F: FnMut(&mut T),
    {
        self.entities.iter_mut().for_each(changes);
    }

    /// Drop a record and its selection; `total` decreases, floored at zero.
    pub fn remove_entity(&mut self, id: &str) {
        self.entities.retain(|entity| entity.id() != id);
        self.selected_ids.remove(id);
        if self.selected_id.as_deref() == Some(id) {
            self.selected_id = None;
        }
        self.pagination.total = self.pagination.total.saturating_sub(1);
    }

    /// Drop several records; `total` decreases by the number actually removed.
    pub fn remove_entities(&mut self, ids: &[&str]) {
        let before = self.entities.len();
        self.entities.retain(|entity| !ids.contains(&entity.id()));
        let removed = u64::try_from(before - self.entities.len()).unwrap_or(u64::MAX);
        for id in ids {
            self.selected_ids.remove(*id);
        }
        if self
            .selected_id
            .as_deref()
            .is_some_and(|selected| ids.contains(&selected))
        {
            self.selected_id = None;
        }
        self.pagination.total = self.pagination.total.saturating_sub(removed);
    }

    /// Drop every held record and the focused selection.
    pub fn remove_all_entities(&mut self) {
        self.entities.clear();
        self.selected_id = None;
    }

    /// Record with the given id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    /// Focused record, if it is on the held page.
    #[must_use]
    pub fn selected_entity(&self) -> Option<&T> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    /// Records selected for bulk actions, in page order.
    #[must_use]
    pub fn selected_entities(&self) -> Vec<&T> {
        self.entities
            .iter()
            .filter(|entity| self.selected_ids.contains(entity.id()))
            .collect()
    }

    /// Add an id to the bulk selection.
    pub fn select(&mut self, id: &str) {
        self.selected_ids.insert(id.to_string());
    }

    /// Remove an id from the bulk selection.
    pub fn deselect(&mut self, id: &str) {
        self.selected_ids.remove(id);
    }

    /// Flip an id's membership in the bulk selection.
    pub fn toggle_selection(&mut self, id: &str) {
        if !self.selected_ids.remove(id) {
            self.selected_ids.insert(id.to_string());
        }
    }

    /// Select every record on the held page.
    pub fn select_all(&mut self) {
        self.selected_ids = self
            .entities
            .iter()
            .map(|entity| entity.id().to_string())
            .collect();
    }

    /// Clear the bulk selection.
    pub fn deselect_all(&mut self) {
        self.selected_ids.clear();
    }

    /// Focus a single record.
    pub fn put_select_id(&mut self, id: Option<String>) {
        self.selected_id = id;
    }

    /// Merge a partial pagination update.
    pub fn put_pagination(&mut self, patch: PaginationPatch) {
        self.pagination.apply(patch);
    }

    /// Store raw server metadata.
    pub fn put_meta(&mut self, meta: Option<Value>) {
        self.meta = meta;
    }

    /// Set the loading flag.
    pub const fn put_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Set the saving flag.
    pub const fn put_saving(&mut self, saving: bool) {
        self.saving = saving;
    }

    /// Set the deleting flag.
    pub const fn put_deleting(&mut self, deleting: bool) {
        self.deleting = deleting;
    }

    /// Set the not-found flag.
    pub const fn put_not_found(&mut self, not_found: bool) {
        self.not_found = not_found;
    }

    /// Set the initial-load flag.
    pub const fn put_initial(&mut self, initial: bool) {
        self.initial = initial;
    }

    /// Store or clear the last fetch error.
    pub fn put_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Restore every field to its initial empty value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id() == id)
    }
}

/// Injected, cloneable handle to an [`EntityStore`].
#[derive(Debug)]
pub struct SharedStore<T: Entity> {
    inner: Arc<Mutex<EntityStore<T>>>,
}

impl<T: Entity> Clone for SharedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> Default for SharedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> SharedStore<T> {
    /// Handle to a fresh, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EntityStore::new())),
        }
    }

    /// Read from the store under its lock.
    pub fn read<R>(&self, f: impl FnOnce(&EntityStore<T>) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the store under its lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut EntityStore<T>) -> R) -> R {
        f(&mut self.lock())
    }

    /// Clone of the current state.
    #[must_use]
    pub fn snapshot(&self) -> EntityStore<T> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, EntityStore<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: String,
        name: String,
        rank: u32,
    }

    #[derive(Clone, Debug, Default)]
    struct RowPatch {
        id: String,
        name: Option<String>,
        rank: Option<u32>,
    }

    impl From<Row> for RowPatch {
        fn from(row: Row) -> Self {
            Self {
                id: row.id,
                name: Some(row.name),
                rank: Some(row.rank),
            }
        }
    }

    impl Entity for Row {
        type Patch = RowPatch;

        fn id(&self) -> &str {
            &self.id
        }

        fn patch_id(patch: &RowPatch) -> &str {
            &patch.id
        }

        fn apply_patch(&mut self, patch: RowPatch) {
            if let Some(name) = patch.name {
                self.name = name;
            }
            if let Some(rank) = patch.rank {
                self.rank = rank;
            }
        }
    }

    fn row(id: &str, name: &str) -> Row {
        Row {
            id: id.to_string(),
            name: name.to_string(),
            rank: 0,
        }
    }

    fn seeded() -> EntityStore<Row> {
        let mut store = EntityStore::new();
        store.set_all_entities(vec![row("a", "Alpha"), row("b", "Beta")]);
        store.pagination.total = 2;
        store
    }

    #[test]
    fn add_entity_replaces_existing_in_place() {
        let mut store = seeded();
        store.add_entity(row("b", "Beta v2"));
        assert_eq!(store.entities.len(), 2);
        assert_eq!(store.entities[1].name, "Beta v2");
        assert_eq!(store.pagination.total, 2);
    }

    #[test]
    fn add_entity_prepends_new_and_increments_total() {
        let mut store = seeded();
        store.add_entity(row("c", "Gamma"));
        assert_eq!(store.entities[0].id, "c");
        assert_eq!(store.entities.len(), 3);
        assert_eq!(store.pagination.total, 3);
    }

    #[test]
    fn update_entity_merges_and_ignores_missing() {
        let mut store = seeded();
        store.update_entity(RowPatch {
            id: "a".to_string(),
            rank: Some(7),
            ..RowPatch::default()
        });
        assert_eq!(store.entities[0].name, "Alpha");
        assert_eq!(store.entities[0].rank, 7);

        let before = store.entities.clone();
        store.update_entity(RowPatch {
            id: "zzz".to_string(),
            name: Some("ghost".to_string()),
            ..RowPatch::default()
        });
        assert_eq!(store.entities, before);
    }

    #[test]
    fn remove_entity_evicts_selection_and_floors_total() {
        let mut store = seeded();
        store.select("a");
        store.put_select_id(Some("a".to_string()));
        store.remove_entity("a");
        assert!(store.get("a").is_none());
        assert!(!store.selected_ids.contains("a"));
        assert_eq!(store.selected_id, None);
        assert_eq!(store.pagination.total, 1);

        store.pagination.total = 0;
        store.remove_entity("b");
        assert_eq!(store.pagination.total, 0);
    }

    #[test]
    fn remove_entities_counts_only_removed_rows() {
        let mut store = seeded();
        store.pagination.total = 10;
        store.remove_entities(&["a", "missing"]);
        assert_eq!(store.entities.len(), 1);
        assert_eq!(store.pagination.total, 9);
    }

    #[test]
    fn set_entities_merges_by_id() {
        let mut store = seeded();
        store.set_entities(vec![row("b", "Beta v2"), row("c", "Gamma")]);
        let names: Vec<_> = store.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta v2", "Gamma"]);
    }

    #[test]
    fn selection_helpers_track_membership() {
        let mut store = seeded();
        store.toggle_selection("a");
        assert_eq!(store.selected_entities().len(), 1);
        store.toggle_selection("a");
        assert!(store.selected_ids.is_empty());
        store.select_all();
        assert_eq!(store.selected_ids.len(), 2);
        store.deselect("b");
        assert_eq!(store.selected_entities()[0].id, "a");
        store.deselect_all();
        assert!(store.selected_entities().is_empty());
    }

    #[test]
    fn flags_and_reset() {
        let mut store = seeded();
        store.put_loading(true);
        assert!(store.loading && !store.saving && !store.deleting);
        store.put_not_found(true);
        store.put_error(Some("boom".to_string()));
        store.reset();
        assert!(store.entities.is_empty());
        assert!(!store.loading && !store.not_found);
        assert_eq!(store.error, None);
        assert_eq!(store.pagination, Pagination::default());
    }

    #[test]
    fn shared_store_handles_see_the_same_state() {
        let shared = SharedStore::<Row>::new();
        let other = shared.clone();
        other.update(|store| store.add_entity(row("x", "Xi")));
        assert_eq!(shared.read(|store| store.entities.len()), 1);
        assert_eq!(shared.snapshot().pagination.total, 1);
    }
}
