use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Stable logical identifier of a stored record. Monotonically assigned,
/// never reused except by a full reset.
pub type RecordId = u64;

/// Metadata describing one stored embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Named group the record belongs to, typically one video's frames.
    pub collection: String,
    /// Item name within the collection, typically a frame file name.
    pub name: String,
    /// Optional class label attached by a detector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RecordMeta {
    pub fn new(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Maps record ids to their metadata and owns id allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCatalog {
    entries: BTreeMap<RecordId, RecordMeta>,
    next_id: RecordId,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a catalog from persisted entries.
    ///
    /// `next_id` resumes at `max(existing ids) + 1`, or 0 for an empty
    /// catalog, so reloaded stores never reuse an id.
    pub fn from_entries(entries: BTreeMap<RecordId, RecordMeta>) -> Self {
        let next_id = entries
            .keys()
            .next_back()
            .map_or(0, |id| id.saturating_add(1));
        Self { entries, next_id }
    }

    /// Stores `meta` under a fresh id and returns it.
    pub fn allocate(&mut self, meta: RecordMeta) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, meta);
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&RecordMeta> {
        self.entries.get(&id)
    }

    /// Removes the given ids. Does not renumber `next_id`.
    pub fn remove_ids(&mut self, ids: &BTreeSet<RecordId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| !ids.contains(id));
        before - self.entries.len()
    }

    /// Ids belonging to `collection`, in ascending order.
    pub fn ids_for(&self, collection: &str) -> Vec<RecordId> {
        self.entries
            .iter()
            .filter(|(_, meta)| meta.collection == collection)
            .map(|(id, _)| *id)
            .collect()
    }

    /// `(id, name)` pairs belonging to `collection`, in ascending-id order.
    pub fn entries_for(&self, collection: &str) -> Vec<(RecordId, &str)> {
        self.entries
            .iter()
            .filter(|(_, meta)| meta.collection == collection)
            .map(|(id, meta)| (*id, meta.name.as_str()))
            .collect()
    }

    /// Distinct collection names present in the catalog.
    pub fn collection_names(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|meta| meta.collection.clone())
            .collect()
    }

    /// Record count per collection.
    pub fn collection_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for meta in self.entries.values() {
            *counts.entry(meta.collection.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Iterates all entries in ascending-id order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &RecordMeta)> + '_ {
        self.entries.iter().map(|(id, meta)| (*id, meta))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id the next allocation will use.
    pub fn next_id(&self) -> RecordId {
        self.next_id
    }

    /// Drops every entry and restarts id allocation at 0.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = 0;
    }

    pub(crate) fn entries(&self) -> &BTreeMap<RecordId, RecordMeta> {
        &self.entries
    }
}
