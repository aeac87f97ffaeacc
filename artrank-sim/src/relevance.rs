use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::math::fingerprint_indices;
use crate::similarity::{CacheStats, SimilarityCache};
use crate::{ArtistId, ItemIndex, UserId};

/// Memo key for profile scores.
///
/// The profile fingerprint is part of the key: the same (user, item) scored
/// against two different profiles yields two entries instead of a stale hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub user: UserId,
    pub item: ItemIndex,
    pub profile: u64,
}

impl ScoreKey {
    pub fn new(user: UserId, profile: &[ItemIndex], item: ItemIndex) -> Self {
        Self {
            user,
            item,
            profile: fingerprint_indices(profile),
        }
    }
}

/// Profile-aware relevance scoring: visual similarity plus an artist boost.
///
/// Owns the `SimilarityCache` it reads from, so one scorer (and one sampling
/// engine around it) holds every memo table for a run.
pub struct RelevanceScorer {
    similarity: SimilarityCache,
    artists: Arc<[Option<ArtistId>]>,
    artist_boost: f64,
    cache: HashMap<ScoreKey, f64>,
    stats: CacheStats,
}

impl RelevanceScorer {
    pub fn new(
        similarity: SimilarityCache,
        artists: Arc<[Option<ArtistId>]>,
        artist_boost: f64,
    ) -> SimResult<Self> {
        if artists.len() != similarity.item_count() {
            return Err(SimError::LengthMismatch {
                what: "artist assignment",
                expected: similarity.item_count(),
                found: artists.len(),
            });
        }
        Ok(Self {
            similarity,
            artists,
            artist_boost,
            cache: HashMap::new(),
            stats: CacheStats::default(),
        })
    }

    /// Similarity of `i` and `j`, plus `artist_boost` when both have a known
    /// artist and it is the same one.
    pub fn pair_score(&mut self, i: ItemIndex, j: ItemIndex) -> f64 {
        let sim = self.similarity.similarity(i, j);
        match (self.artists[i], self.artists[j]) {
            (Some(ai), Some(aj)) if ai == aj => sim + self.artist_boost,
            _ => sim,
        }
    }

    /// Mean `pair_score(item, j)` over every `j` in `profile`, memoized per
    /// (user, item, profile contents).
    pub fn profile_score(
        &mut self,
        user: UserId,
        profile: &[ItemIndex],
        item: ItemIndex,
    ) -> SimResult<f64> {
        if profile.is_empty() {
            return Err(SimError::EmptyProfile { item });
        }
        let key = ScoreKey::new(user, profile, item);
        if let Some(&score) = self.cache.get(&key) {
            self.stats.hits += 1;
            return Ok(score);
        }
        self.stats.misses += 1;
        let total: f64 = profile.iter().map(|&j| self.pair_score(item, j)).sum();
        let score = total / profile.len() as f64;
        self.cache.insert(key, score);
        Ok(score)
    }

    pub fn artist_of(&self, item: ItemIndex) -> Option<ArtistId> {
        self.artists[item]
    }

    pub fn artist_boost(&self) -> f64 {
        self.artist_boost
    }

    pub fn similarity(&self) -> &SimilarityCache {
        &self.similarity
    }

    pub fn similarity_mut(&mut self) -> &mut SimilarityCache {
        &mut self.similarity
    }

    /// Profile-score cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of memoized profile scores.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
