use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::embeddings::EmbeddingIndex;
use crate::error::{SimError, SimResult};
use crate::thresholds::DUPLICATE_TOLERANCE;
use crate::{ClusterId, ItemIndex};

/// Unordered pair of item indices, stored smaller-first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairKey(ItemIndex, ItemIndex);

impl PairKey {
    pub fn new(i: ItemIndex, j: ItemIndex) -> Self {
        if i <= j {
            PairKey(i, j)
        } else {
            PairKey(j, i)
        }
    }

    pub fn first(&self) -> ItemIndex {
        self.0
    }

    pub fn second(&self) -> ItemIndex {
        self.1
    }
}

/// Hit/miss counters for a memoizing cache. A miss is a computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoized cosine similarity between catalog items, plus the
/// visual-duplicate rule.
///
/// Entries are computed lazily on first access and never evicted, so the
/// cache grows to at most N·(N-1)/2 + N entries. Access is `&mut self`:
/// one cache belongs to one sampling engine and is not shared between
/// writers.
pub struct SimilarityCache {
    embeddings: Arc<EmbeddingIndex>,
    clusters: Arc<[ClusterId]>,
    cache: HashMap<PairKey, f64>,
    stats: CacheStats,
    duplicates: u64,
}

impl SimilarityCache {
    pub fn new(embeddings: Arc<EmbeddingIndex>, clusters: Arc<[ClusterId]>) -> SimResult<Self> {
        if clusters.len() != embeddings.len() {
            return Err(SimError::LengthMismatch {
                what: "cluster assignment",
                expected: embeddings.len(),
                found: clusters.len(),
            });
        }
        Ok(Self {
            embeddings,
            clusters,
            cache: HashMap::new(),
            stats: CacheStats::default(),
            duplicates: 0,
        })
    }

    /// Cosine similarity of items `i` and `j`.
    ///
    /// Symmetric by construction: both argument orders resolve to the same
    /// cache entry, which is computed at most once. Indices must be valid.
    pub fn similarity(&mut self, i: ItemIndex, j: ItemIndex) -> f64 {
        let key = PairKey::new(i, j);
        if let Some(&sim) = self.cache.get(&key) {
            self.stats.hits += 1;
            return sim;
        }
        self.stats.misses += 1;
        let sim = self.embeddings.cosine(key.0, key.1);
        self.cache.insert(key, sim);
        sim
    }

    /// True when `i` and `j` are the same visual asset: same cluster and a
    /// similarity within `DUPLICATE_TOLERANCE` of 1.0.
    ///
    /// The cluster check runs first, so cross-cluster pairs never touch the
    /// cache. Every positive answer bumps `duplicate_count`.
    pub fn same(&mut self, i: ItemIndex, j: ItemIndex) -> bool {
        if self.clusters[i] != self.clusters[j] {
            return false;
        }
        if (self.similarity(i, j) - 1.0).abs() < DUPLICATE_TOLERANCE {
            self.duplicates += 1;
            return true;
        }
        false
    }

    /// Should `q`–`p` outrank `q`–`n`?
    ///
    /// Cluster agreement with `q` decides first; otherwise `p` must beat `n`
    /// in similarity to `q` by more than `margin`.
    pub fn validate_triple(&mut self, q: ItemIndex, p: ItemIndex, n: ItemIndex, margin: f64) -> bool {
        let cq = self.clusters[q];
        let cp = self.clusters[p];
        let cn = self.clusters[n];
        if cq == cp && cq != cn {
            return true;
        }
        if cq == cn && cq != cp {
            return false;
        }
        self.similarity(q, p) > self.similarity(q, n) + margin
    }

    /// Compute every missing pair in parallel and insert the results.
    ///
    /// Values are identical to what `similarity` would compute lazily. Call
    /// before a sampling run to take the dot products off the hot path.
    /// Returns the number of entries inserted; cache stats are untouched.
    pub fn warmup_parallel<I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (ItemIndex, ItemIndex)>,
    {
        let missing: Vec<PairKey> = pairs
            .into_iter()
            .map(|(i, j)| PairKey::new(i, j))
            .filter(|key| !self.cache.contains_key(key))
            .collect::<HashSet<PairKey>>()
            .into_iter()
            .collect();

        if missing.is_empty() {
            return 0;
        }

        let embeddings = &self.embeddings;
        let computed: Vec<(PairKey, f64)> = missing
            .par_iter()
            .map(|key| (*key, embeddings.cosine(key.0, key.1)))
            .collect();

        let inserted = computed.len();
        self.cache.extend(computed);
        log::debug!("similarity warmup inserted {} pairs", inserted);
        inserted
    }

    pub fn cluster_of(&self, item: ItemIndex) -> ClusterId {
        self.clusters[item]
    }

    /// Number of items the cache can answer for.
    pub fn item_count(&self) -> usize {
        self.embeddings.len()
    }

    /// Number of positive `same` answers so far. Diagnostic only.
    pub fn duplicate_count(&self) -> u64 {
        self.duplicates
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of memoized pairs.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
