#![forbid(unsafe_code)]
//! Framedex embedding index and retrieval engine.
//!
//! Composes the core arena, catalog, and codec into a single-writer
//! embeddable service:
//! - `add_to_collection` / `add_to_collection_with_labels`: append embedding
//!   batches produced by frame encoders
//! - `knn`: k-nearest-neighbor search by squared L2 distance
//! - `threshold_query`: label- and cosine-distance-filtered retrieval
//! - `analyze_prompt`: per-collection top-k, adaptive threshold, summaries
//! - `delete_collection` / `reset`: bulk removal with indirection rebuild
//! - `open` / `save` / `close`: explicit persisted lifecycle

mod analysis;
mod errors;
mod index;
mod models;
mod search;

pub use errors::IndexError;
pub use index::EmbeddingIndex;
pub use models::{
    CollectionReport, CollectionSummary, PromptMatch, PromptOptions, PromptReport, SearchHit,
    ThresholdMatch, ThresholdReport, ADAPTIVE_THRESHOLD_RATIO, DEFAULT_TOP_K,
};

pub use framedex_core::{
    ArenaConfig, PersistenceError, RecordId, RecordMeta, StoreError,
};

#[cfg(test)]
mod tests;
