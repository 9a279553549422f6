use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use framedex_core::{
    load_store, remove_store_files, save_store, ArenaConfig, MetadataCatalog, RecordId,
    RecordMeta, VectorArena,
};

use crate::errors::IndexError;
use crate::models::{PromptOptions, PromptReport, SearchHit, ThresholdReport};
use crate::{analysis, search};

/// Mutable state behind the index lock: the physical arena, the logical
/// catalog, and the indirection table binding the two.
pub(crate) struct IndexInner {
    pub(crate) arena: VectorArena,
    pub(crate) catalog: MetadataCatalog,
    /// Record id occupying each physical slot. Ids are allocated
    /// monotonically at append time and removal preserves survivor order, so
    /// the table stays sorted ascending.
    pub(crate) slot_ids: Vec<RecordId>,
}

impl IndexInner {
    fn fresh(config: ArenaConfig) -> Self {
        Self {
            arena: VectorArena::new(config),
            catalog: MetadataCatalog::new(),
            slot_ids: Vec::new(),
        }
    }

    fn from_loaded(arena: VectorArena, catalog: MetadataCatalog) -> Self {
        // The codec writes vectors in slot order and slot order equals
        // ascending id order, so the table is the sorted catalog ids.
        let slot_ids: Vec<RecordId> = catalog.iter().map(|(id, _)| id).collect();
        let inner = Self {
            arena,
            catalog,
            slot_ids,
        };
        inner.debug_check();
        inner
    }

    /// Metadata of the record currently occupying `slot`.
    pub(crate) fn meta_at_slot(&self, slot: usize) -> Option<&RecordMeta> {
        let id = self.slot_ids.get(slot)?;
        self.catalog.get(*id)
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.arena.len(), self.catalog.len());
        debug_assert_eq!(self.arena.len(), self.slot_ids.len());
        debug_assert!(self.slot_ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

/// Multi-collection embedding index with metadata-scoped retrieval and
/// paired-file persistence.
///
/// All mutating operations and `save` serialize behind a writer lock;
/// queries run under the read lock for their full duration, so they never
/// observe the arena and catalog mid-mutation. Handles are cheap to clone
/// and share one store.
#[derive(Clone)]
pub struct EmbeddingIndex {
    inner: Arc<RwLock<IndexInner>>,
    index_path: PathBuf,
    config: ArenaConfig,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("index_path", &self.index_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EmbeddingIndex {
    /// Opens the index at `index_path`, loading the persisted pair when it
    /// exists. Missing files yield a fresh empty store; a damaged pair fails
    /// without yielding partial data.
    pub fn open(index_path: impl Into<PathBuf>, config: ArenaConfig) -> Result<Self, IndexError> {
        let index_path = index_path.into();
        let inner = match load_store(&index_path, config)? {
            Some((arena, catalog)) => {
                let inner = IndexInner::from_loaded(arena, catalog);
                tracing::info!(
                    path = %index_path.display(),
                    vectors = inner.arena.len(),
                    "opened embedding index"
                );
                inner
            }
            None => {
                tracing::info!(
                    path = %index_path.display(),
                    dimension = config.dimension,
                    "initialized empty embedding index"
                );
                IndexInner::fresh(config)
            }
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            index_path,
            config,
        })
    }

    /// Appends a batch of embeddings to `collection`, returning the assigned
    /// record ids.
    ///
    /// `names` and `vectors` must have equal lengths and every vector must
    /// have the store dimension; violations reject the whole batch before
    /// any mutation.
    pub fn add_to_collection(
        &self,
        collection: &str,
        names: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Vec<RecordId>, IndexError> {
        self.add_records(collection, names, vectors, None)
    }

    /// Same as [`Self::add_to_collection`], carrying an optional class label
    /// per embedding for label-scoped threshold queries.
    pub fn add_to_collection_with_labels(
        &self,
        collection: &str,
        names: Vec<String>,
        vectors: Vec<Vec<f32>>,
        labels: Vec<Option<String>>,
    ) -> Result<Vec<RecordId>, IndexError> {
        self.add_records(collection, names, vectors, Some(labels))
    }

    fn add_records(
        &self,
        collection: &str,
        names: Vec<String>,
        vectors: Vec<Vec<f32>>,
        labels: Option<Vec<Option<String>>>,
    ) -> Result<Vec<RecordId>, IndexError> {
        if collection.trim().is_empty() {
            return Err(IndexError::InvalidCollectionName);
        }
        if names.len() != vectors.len() {
            return Err(IndexError::ArityMismatch {
                field: "names",
                expected: vectors.len(),
                got: names.len(),
            });
        }
        if let Some(labels) = &labels {
            if labels.len() != vectors.len() {
                return Err(IndexError::ArityMismatch {
                    field: "labels",
                    expected: vectors.len(),
                    got: labels.len(),
                });
            }
        }

        let mut inner = self.write()?;
        let slots = inner.arena.append(&vectors)?;

        let labels = labels.unwrap_or_else(|| vec![None; names.len()]);
        let mut ids = Vec::with_capacity(names.len());
        for (name, label) in names.into_iter().zip(labels) {
            let mut meta = RecordMeta::new(collection, name);
            meta.label = label;
            let id = inner.catalog.allocate(meta);
            inner.slot_ids.push(id);
            ids.push(id);
        }

        debug_assert_eq!(inner.slot_ids.len(), slots.end);
        inner.debug_check();
        tracing::info!(collection = %collection, added = ids.len(), "added embeddings");
        Ok(ids)
    }

    /// Removes every record of `collection`, returning how many were
    /// removed.
    ///
    /// Compaction renumbers the surviving slots, so the whole indirection
    /// table is rebuilt, not just the deleted entries. A collection with no
    /// members is reported as `CollectionNotFound`; the store is unchanged.
    pub fn delete_collection(&self, collection: &str) -> Result<usize, IndexError> {
        let mut inner = self.write()?;

        let doomed: BTreeSet<RecordId> = inner.catalog.ids_for(collection).into_iter().collect();
        if doomed.is_empty() {
            tracing::warn!(collection = %collection, "delete of unknown collection");
            return Err(IndexError::CollectionNotFound(collection.to_string()));
        }

        let doomed_slots: BTreeSet<usize> = inner
            .slot_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| doomed.contains(id))
            .map(|(slot, _)| slot)
            .collect();

        inner.arena.remove(&doomed_slots)?;
        inner.catalog.remove_ids(&doomed);
        inner.slot_ids.retain(|id| !doomed.contains(id));

        inner.debug_check();
        tracing::info!(collection = %collection, removed = doomed.len(), "deleted collection");
        Ok(doomed.len())
    }

    /// Wipes the store and deletes the persisted pair.
    ///
    /// Without `confirm` this is a silent no-op returning `false`; the
    /// decision belongs to the caller, never to an interactive prompt.
    pub fn reset(&self, confirm: bool) -> Result<bool, IndexError> {
        if !confirm {
            return Ok(false);
        }

        let mut inner = self.write()?;
        inner.arena.clear();
        inner.catalog.clear();
        inner.slot_ids.clear();
        remove_store_files(&self.index_path)?;

        tracing::info!(path = %self.index_path.display(), "reset embedding index");
        Ok(true)
    }

    /// Snapshots the arena and catalog to the persisted pair.
    ///
    /// Runs under the writer lock so a snapshot never interleaves with a
    /// mutation.
    pub fn save(&self) -> Result<(), IndexError> {
        let inner = self.write()?;
        save_store(&self.index_path, &inner.arena, &inner.catalog)?;
        tracing::info!(
            path = %self.index_path.display(),
            vectors = inner.arena.len(),
            "saved embedding index"
        );
        Ok(())
    }

    /// Saves and drops this handle.
    pub fn close(self) -> Result<(), IndexError> {
        self.save()
    }

    /// K-nearest-neighbor search by squared L2 distance, ascending.
    pub fn knn(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let inner = self.read()?;
        search::knn(&inner, query, k)
    }

    /// Every record within `max_distance` cosine distance of `query`,
    /// optionally restricted to records whose label is in `allowed_labels`.
    pub fn threshold_query(
        &self,
        query: &[f32],
        allowed_labels: Option<&BTreeSet<String>>,
        max_distance: f32,
    ) -> Result<ThresholdReport, IndexError> {
        let inner = self.read()?;
        search::threshold(&inner, query, allowed_labels, max_distance)
    }

    /// Cross-collection prompt analysis: per-collection top-k,
    /// above-threshold sets, and summaries against an adaptive or supplied
    /// similarity cutoff.
    pub fn analyze_prompt(
        &self,
        query: &[f32],
        options: PromptOptions,
    ) -> Result<PromptReport, IndexError> {
        let inner = self.read()?;
        analysis::analyze(&inner, query, options)
    }

    /// Record count per collection.
    pub fn collections(&self) -> Result<BTreeMap<String, usize>, IndexError> {
        Ok(self.read()?.catalog.collection_counts())
    }

    /// Total number of stored embeddings.
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.arena.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.read()?.arena.is_empty())
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Path of the persisted index blob; the metadata sidecar sits next to
    /// it.
    pub fn path(&self) -> &Path {
        &self.index_path
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexInner>, IndexError> {
        self.inner.read().map_err(|_| IndexError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexInner>, IndexError> {
        self.inner.write().map_err(|_| IndexError::LockPoisoned)
    }
}
