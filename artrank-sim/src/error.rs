//! Similarity and scoring error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Embedding matrix is empty")]
    EmptyEmbeddings,

    #[error("Embedding row {index} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Embedding row {index} has a non-finite component")]
    NonFinite { index: usize },

    #[error("{what} has {found} entries but the embedding index has {expected} items")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Cannot score item {item} against an empty profile")]
    EmptyProfile { item: usize },
}

/// Result type alias for similarity and scoring operations.
pub type SimResult<T> = Result<T, SimError>;
