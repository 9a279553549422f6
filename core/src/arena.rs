use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use std::error::Error;
use std::fmt;
use std::ops::Range;

use crate::vector::PackedQuery;

/// Construction-time options for a [`VectorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of components every stored vector must have.
    pub dimension: usize,
    /// When true, NaN and +/-Inf components are rejected at append time.
    pub strict_finite: bool,
}

impl ArenaConfig {
    pub fn new(dimension: usize, strict_finite: bool) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::InvalidConfig(
                "dimension must be > 0".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            strict_finite,
        })
    }
}

/// Error type for arena operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    InvalidConfig(String),
    /// A submitted vector does not have the arena dimension. The whole batch
    /// is rejected.
    DimensionMismatch { expected: usize, got: usize },
    /// A submitted vector contains NaN or Infinity under strict validation.
    NonFinite { vector: usize, component: usize },
    /// A query vector contains NaN or Infinity.
    NonFiniteQuery { component: usize },
    /// A physical slot does not exist. Surfacing this means an id-to-slot
    /// mapping has diverged from the arena.
    SlotOutOfRange { slot: usize, len: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "invalid config: {message}"),
            Self::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
            Self::NonFinite { vector, component } => {
                write!(
                    f,
                    "non-finite value in vector {vector} at component {component}"
                )
            }
            Self::NonFiniteQuery { component } => {
                write!(f, "non-finite value in query at component {component}")
            }
            Self::SlotOutOfRange { slot, len } => {
                write!(f, "slot {slot} out of range for arena of {len} vectors")
            }
        }
    }
}

impl Error for StoreError {}

/// A hit produced by [`VectorArena::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SlotHit {
    pub slot: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

/// Contiguous arena of fixed-dimension embedding vectors addressed by
/// physical slot.
///
/// Slots are dense: removal compacts the arena and renumbers the survivors
/// from 0, preserving their relative order. Callers that map logical ids to
/// slots must rebuild that mapping after every removal.
#[derive(Debug, Clone)]
pub struct VectorArena {
    config: ArenaConfig,
    values: Vec<f32>,
}

impl VectorArena {
    pub fn new(config: ArenaConfig) -> Self {
        Self {
            config,
            values: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn strict_finite(&self) -> bool {
        self.config.strict_finite
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.values.len() / self.config.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a batch of vectors, returning the assigned slots.
    ///
    /// The whole batch is validated before any vector is stored: either every
    /// vector is appended or none is. Assigned slots are contiguous and
    /// increasing.
    pub fn append(&mut self, vectors: &[Vec<f32>]) -> Result<Range<usize>, StoreError> {
        for (index, vector) in vectors.iter().enumerate() {
            self.validate_vector(index, vector)?;
        }

        let start = self.len();
        self.values
            .reserve(vectors.len() * self.config.dimension);
        for vector in vectors {
            self.values.extend_from_slice(vector);
        }
        Ok(start..start + vectors.len())
    }

    /// Removes the given slots, compacting the survivors.
    ///
    /// Rejects the whole call with `SlotOutOfRange` before any mutation if a
    /// slot does not exist. Returns the number of removed vectors.
    pub fn remove(&mut self, slots: &BTreeSet<usize>) -> Result<usize, StoreError> {
        let len = self.len();
        if let Some(slot) = slots.iter().copied().find(|slot| *slot >= len) {
            return Err(StoreError::SlotOutOfRange { slot, len });
        }

        let dimension = self.config.dimension;
        let mut survivors = Vec::with_capacity(self.values.len() - slots.len() * dimension);
        for (slot, vector) in self.values.chunks_exact(dimension).enumerate() {
            if !slots.contains(&slot) {
                survivors.extend_from_slice(vector);
            }
        }
        self.values = survivors;
        Ok(slots.len())
    }

    /// Returns the stored vector at a slot.
    pub fn reconstruct(&self, slot: usize) -> Result<&[f32], StoreError> {
        let dimension = self.config.dimension;
        self.values
            .chunks_exact(dimension)
            .nth(slot)
            .ok_or(StoreError::SlotOutOfRange {
                slot,
                len: self.len(),
            })
    }

    /// Iterates stored vectors in slot order.
    pub fn iter_slots(&self) -> impl Iterator<Item = (usize, &[f32])> + '_ {
        self.values
            .chunks_exact(self.config.dimension)
            .enumerate()
    }

    /// Brute-force k-nearest-neighbor scan by squared L2 distance.
    ///
    /// Returns the `k` closest slots ascending by distance, ties broken by
    /// ascending slot. Fewer than `k` stored vectors yield all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SlotHit>, StoreError> {
        self.validate_query(query)?;

        let keep = k.min(self.len());
        if keep == 0 {
            return Ok(Vec::new());
        }

        let packed = PackedQuery::new(query);
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(keep);
        for (slot, vector) in self.iter_slots() {
            let candidate = Candidate {
                slot,
                distance: packed.l2_squared(vector),
            };
            if heap.len() < keep {
                heap.push(candidate);
            } else if heap
                .peek()
                .is_some_and(|worst| candidate.cmp(worst).is_lt())
            {
                let _ = heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| SlotHit {
                slot: candidate.slot,
                distance: candidate.distance,
            })
            .collect())
    }

    /// Drops every stored vector.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub(crate) fn as_flat(&self) -> &[f32] {
        &self.values
    }

    /// Rebuilds an arena from a flat buffer produced by [`Self::as_flat`].
    /// The caller guarantees the buffer length is a multiple of the
    /// dimension.
    pub(crate) fn from_flat(config: ArenaConfig, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len() % config.dimension, 0);
        Self { config, values }
    }

    fn validate_vector(&self, index: usize, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.config.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.config.dimension,
                got: vector.len(),
            });
        }

        if self.config.strict_finite {
            if let Some(component) = vector.iter().position(|value| !value.is_finite()) {
                return Err(StoreError::NonFinite {
                    vector: index,
                    component,
                });
            }
        }

        Ok(())
    }

    fn validate_query(&self, query: &[f32]) -> Result<(), StoreError> {
        if query.len() != self.config.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.config.dimension,
                got: query.len(),
            });
        }
        if let Some(component) = query.iter().position(|value| !value.is_finite()) {
            return Err(StoreError::NonFiniteQuery { component });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    slot: usize,
    distance: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.distance.to_bits() == other.distance.to_bits()
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

#[cfg(test)]
mod tests;
