use std::collections::BTreeMap;

use framedex_core::StoreError;

use crate::errors::IndexError;
use crate::index::IndexInner;
use crate::models::{
    CollectionReport, CollectionSummary, PromptMatch, PromptOptions, PromptReport,
    ADAPTIVE_THRESHOLD_RATIO,
};
use crate::search::validate_cosine_query;

/// Scores every stored record against the prompt and builds the
/// per-collection report.
///
/// The adaptive threshold is derived only after every collection has been
/// scored, so it reflects the global maximum, not a per-collection one.
pub(crate) fn analyze(
    inner: &IndexInner,
    query: &[f32],
    options: PromptOptions,
) -> Result<PromptReport, IndexError> {
    let packed = validate_cosine_query(inner, query)?;

    let mut scored: BTreeMap<String, Vec<PromptMatch>> = BTreeMap::new();
    let mut global_max = 0.0f32;
    for (slot, vector) in inner.arena.iter_slots() {
        let meta = inner.meta_at_slot(slot).ok_or(IndexError::Store(
            StoreError::SlotOutOfRange {
                slot,
                len: inner.arena.len(),
            },
        ))?;

        // Zero-norm members have no defined similarity and are skipped.
        let Some(similarity) = packed.cosine(vector) else {
            continue;
        };
        if similarity > global_max {
            global_max = similarity;
        }

        scored
            .entry(meta.collection.clone())
            .or_default()
            .push(PromptMatch {
                id: inner.slot_ids[slot],
                name: meta.name.clone(),
                similarity,
            });
    }

    let threshold = options
        .threshold
        .unwrap_or(ADAPTIVE_THRESHOLD_RATIO * global_max);

    let mut collections = BTreeMap::new();
    for (collection, mut members) in scored {
        // Stable sort: equal similarities keep catalog order.
        members.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));

        let above_threshold: Vec<PromptMatch> = members
            .iter()
            .filter(|member| member.similarity >= threshold)
            .cloned()
            .collect();

        let summary = above_threshold.first().map(|best| CollectionSummary {
            best: best.clone(),
            above_threshold_count: above_threshold.len(),
            mean_similarity: above_threshold
                .iter()
                .map(|member| member.similarity)
                .sum::<f32>()
                / above_threshold.len() as f32,
        });

        let mut top_matches = members;
        top_matches.truncate(options.top_k);

        collections.insert(
            collection,
            CollectionReport {
                top_matches,
                above_threshold,
                summary,
            },
        );
    }

    Ok(PromptReport {
        threshold,
        global_max_similarity: global_max,
        collections,
    })
}
