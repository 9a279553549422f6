use std::collections::BTreeSet;

use framedex_core::{PackedQuery, StoreError, ZERO_NORM_EPSILON};

use crate::errors::IndexError;
use crate::index::IndexInner;
use crate::models::{SearchHit, ThresholdMatch, ThresholdReport};

pub(crate) fn knn(
    inner: &IndexInner,
    query: &[f32],
    k: usize,
) -> Result<Vec<SearchHit>, IndexError> {
    let hits = inner.arena.search(query, k)?;
    hits.into_iter()
        .map(|hit| {
            let meta = inner.meta_at_slot(hit.slot).ok_or(IndexError::Store(
                StoreError::SlotOutOfRange {
                    slot: hit.slot,
                    len: inner.arena.len(),
                },
            ))?;
            Ok(SearchHit {
                collection: meta.collection.clone(),
                name: meta.name.clone(),
                distance: hit.distance,
            })
        })
        .collect()
}

pub(crate) fn threshold(
    inner: &IndexInner,
    query: &[f32],
    allowed_labels: Option<&BTreeSet<String>>,
    max_distance: f32,
) -> Result<ThresholdReport, IndexError> {
    let packed = validate_cosine_query(inner, query)?;

    let mut matches = Vec::new();
    let mut distances = Vec::with_capacity(inner.catalog.len());
    // Slot order equals catalog (ascending-id) order, so this scan preserves
    // catalog iteration order.
    for (slot, vector) in inner.arena.iter_slots() {
        let meta = inner.meta_at_slot(slot).ok_or(IndexError::Store(
            StoreError::SlotOutOfRange {
                slot,
                len: inner.arena.len(),
            },
        ))?;

        // Records whose cosine is undefined are infinitely far: visible in
        // the diagnostics array, never a match.
        let distance = match packed.cosine(vector) {
            Some(similarity) => 1.0 - similarity,
            None => f32::INFINITY,
        };
        distances.push(distance);

        if distance <= max_distance && label_allowed(meta.label.as_deref(), allowed_labels) {
            matches.push(ThresholdMatch {
                id: inner.slot_ids[slot],
                collection: meta.collection.clone(),
                name: meta.name.clone(),
                label: meta.label.clone(),
                distance,
            });
        }
    }

    Ok(ThresholdReport { matches, distances })
}

/// Validates a cosine-metric query and packs it for the scan.
pub(crate) fn validate_cosine_query(
    inner: &IndexInner,
    query: &[f32],
) -> Result<PackedQuery, IndexError> {
    let dimension = inner.arena.dimension();
    if query.len() != dimension {
        return Err(StoreError::DimensionMismatch {
            expected: dimension,
            got: query.len(),
        }
        .into());
    }
    if let Some(component) = query.iter().position(|value| !value.is_finite()) {
        return Err(StoreError::NonFiniteQuery { component }.into());
    }

    let packed = PackedQuery::new(query);
    if packed.norm_sq() <= ZERO_NORM_EPSILON {
        return Err(IndexError::ZeroNormQuery);
    }
    Ok(packed)
}

fn label_allowed(label: Option<&str>, allowed: Option<&BTreeSet<String>>) -> bool {
    match allowed {
        None => true,
        Some(set) => label.is_some_and(|label| set.contains(label)),
    }
}
