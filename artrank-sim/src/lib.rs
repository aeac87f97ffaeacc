//! Visual similarity and relevance scoring for triplet sampling.
//!
//! - `EmbeddingIndex`: L2-normalized item embeddings
//! - `SimilarityCache`: memoized cosine similarity and the duplicate rule
//! - `RelevanceScorer`: profile-aware scores with an artist boost

pub mod embeddings;
pub mod error;
pub mod math;
pub mod relevance;
pub mod similarity;
pub mod thresholds;

pub use embeddings::EmbeddingIndex;
pub use error::{SimError, SimResult};
pub use relevance::{RelevanceScorer, ScoreKey};
pub use similarity::{CacheStats, PairKey, SimilarityCache};

/// Dense 0-based catalog index of an item.
pub type ItemIndex = usize;

/// Dense cluster id. Every item belongs to exactly one cluster.
pub type ClusterId = usize;

/// Artist id. Items with no known artist carry `None` instead.
pub type ArtistId = u32;

/// Id of a real user in the interaction log.
pub type UserId = u64;
