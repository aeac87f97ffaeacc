//! Centralized tuning constants for similarity, scoring and sampling.
//!
//! `artrank-sampler` reads its `SamplerConfig` defaults from here, so a value
//! changed in this file moves both the scorer and the strategies.

/// Two items in the same cluster whose cosine similarity is within this
/// distance of 1.0 are treated as the same visual asset.
pub const DUPLICATE_TOLERANCE: f64 = 1e-7;

/// Default margin for `SimilarityCache::validate_triple`.
pub const VALIDATION_MARGIN: f64 = 0.05;

/// Probability of drawing a candidate from the anchor's own cluster or artist
/// instead of a uniformly random cluster.
pub const DEFAULT_BIAS_THRESHOLD: f64 = 0.7;

/// Probability of picking the artist bucket over the cluster bucket once the
/// biased branch has been taken.
pub const ARTIST_BRANCH_PROBABILITY: f64 = 0.5;

/// Minimum score gap between positive and negative for the margin-filtered
/// strategies. Per-user strategies divide it by the history length.
pub const DEFAULT_CONFIDENCE_MARGIN: f64 = 0.18;

/// Added to the pair score when both items share a known artist.
pub const DEFAULT_ARTIST_BOOST: f64 = 0.1;

/// Draw attempts allowed per requested sample before the sample is skipped.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Norms below this are treated as zero vectors and left unnormalized.
pub const ZERO_NORM_EPSILON: f64 = 1e-15;
