//! Sampler error types.
//!
//! Precondition violations are caller misconfiguration and are returned
//! before any sampling starts. Nothing here is defaulted silently.

use artrank_sim::SimError;
use thiserror::Error;

use crate::types::{ClusterId, ItemIndex, StrategyKind, UserId};

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Catalog has no items")]
    EmptyCatalog,

    #[error("{what} has {found} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Cluster {0} has no items")]
    EmptyCluster(ClusterId),

    #[error("Drew from an empty membership bucket")]
    EmptyBucket,

    #[error("User {0} has an empty interaction history")]
    EmptyHistory(UserId),

    #[error("User {user} references item {item} outside the catalog of {catalog_len} items")]
    ItemOutOfRange {
        user: UserId,
        item: ItemIndex,
        catalog_len: usize,
    },

    #[error("{strategy} emits synthetic users and cannot draw {count} samples in user identity mode")]
    SyntheticInUserMode { strategy: StrategyKind, count: usize },

    #[error("Item '{0}' has an embedding but no metadata row")]
    MissingMetadata(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("CSV parse error at line {line}: {source}")]
    Csv { line: usize, source: csv::Error },

    #[error("Failed to open '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Similarity(#[from] SimError),
}

/// Result type alias for sampler operations.
pub type SamplerResult<T> = Result<T, SamplerError>;
