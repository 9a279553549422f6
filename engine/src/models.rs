use std::collections::BTreeMap;

use serde::Serialize;

use framedex_core::RecordId;

/// Number of results kept per collection by a prompt analysis when the
/// caller does not override it.
pub const DEFAULT_TOP_K: usize = 5;

/// Fraction of the global maximum similarity used as the adaptive
/// above-threshold cutoff when no explicit threshold is supplied.
pub const ADAPTIVE_THRESHOLD_RATIO: f32 = 0.9;

/// One k-nearest-neighbor result, ranked by squared L2 distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub collection: String,
    pub name: String,
    pub distance: f32,
}

/// One record passing a threshold query's distance and label filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdMatch {
    pub id: RecordId,
    pub collection: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Cosine distance (`1 - cosine_similarity`) to the query.
    pub distance: f32,
}

/// Result of a threshold query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdReport {
    /// Matching records in catalog iteration order (not sorted).
    pub matches: Vec<ThresholdMatch>,
    /// Cosine distance of every stored record, filtered or not, in catalog
    /// iteration order. Records with an undefined cosine carry `+inf`.
    pub distances: Vec<f32>,
}

/// Caller-tunable knobs for a prompt analysis.
#[derive(Debug, Clone, Copy)]
pub struct PromptOptions {
    /// Results kept per collection in the top-k list.
    pub top_k: usize,
    /// Above-threshold cutoff; derived from the global maximum similarity
    /// when absent.
    pub threshold: Option<f32>,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: None,
        }
    }
}

/// One collection member scored against the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMatch {
    pub id: RecordId,
    pub name: String,
    pub similarity: f32,
}

/// Aggregate of a collection's above-threshold members. Absent when the
/// above-threshold set is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub best: PromptMatch,
    pub above_threshold_count: usize,
    pub mean_similarity: f32,
}

/// Per-collection slice of a prompt report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    /// Members sorted descending by similarity, truncated to `top_k`. Ties
    /// preserve catalog order.
    pub top_matches: Vec<PromptMatch>,
    /// Members with `similarity >= threshold`, descending by similarity.
    pub above_threshold: Vec<PromptMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CollectionSummary>,
}

/// Cross-collection prompt analysis. Rendering (result folders, clip
/// assembly) is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptReport {
    /// The cutoff that was applied, supplied or derived.
    pub threshold: f32,
    pub global_max_similarity: f32,
    pub collections: BTreeMap<String, CollectionReport>,
}
