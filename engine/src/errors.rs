use std::error::Error;
use std::fmt;

use framedex_core::{PersistenceError, StoreError};

/// Error type for index operations.
///
/// Empty query results are not errors; callers can always tell "no matches"
/// (an empty list) from "operation failed" (a value of this type).
#[derive(Debug)]
pub enum IndexError {
    /// An arena-level validation or consistency fault.
    Store(StoreError),
    /// Saving or loading the persisted pair failed.
    Persistence(PersistenceError),
    /// Parallel input sequences disagree in length. Nothing was mutated.
    ArityMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    /// A delete named a collection with no members. Non-fatal.
    CollectionNotFound(String),
    /// Collection names must contain at least one non-whitespace character.
    InvalidCollectionName,
    /// Cosine queries are undefined for zero-norm vectors.
    ZeroNormQuery,
    /// A writer panicked while holding the store lock.
    LockPoisoned,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(error) => write!(f, "store error: {error}"),
            Self::Persistence(error) => write!(f, "persistence error: {error}"),
            Self::ArityMismatch {
                field,
                expected,
                got,
            } => {
                write!(f, "arity mismatch: {field} has {got} entries, expected {expected}")
            }
            Self::CollectionNotFound(name) => {
                write!(f, "collection '{name}' has no members")
            }
            Self::InvalidCollectionName => write!(f, "collection name must not be empty"),
            Self::ZeroNormQuery => {
                write!(f, "cosine similarity is undefined for zero-norm queries")
            }
            Self::LockPoisoned => write!(f, "store lock poisoned"),
        }
    }
}

impl Error for IndexError {}

impl From<StoreError> for IndexError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PersistenceError> for IndexError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}
