use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

use artrank_sim::{EmbeddingIndex, RelevanceScorer, SimilarityCache};

use crate::catalog::Catalog;
use crate::config::{IdentityMode, SamplerConfig};
use crate::dedup::{triple_key, DedupRegistry, HashKey, TripleAnchor};
use crate::draw::{self, AttemptBudget};
use crate::error::{SamplerError, SamplerResult};
use crate::interactions::InteractionLog;
use crate::types::{ArtistId, ClusterId, ItemIndex, SampleBatch, StrategyKind, UserId};

/// Owns everything one sampling run mutates: the RNG and the score and
/// similarity caches. Catalog, embeddings and interactions are shared
/// read-only.
pub struct SamplingEngine {
    config: SamplerConfig,
    catalog: Arc<Catalog>,
    interactions: Arc<InteractionLog>,
    scorer: RelevanceScorer,
    rng: StdRng,
}

impl SamplingEngine {
    /// Build an engine seeded from `config.seed`, or from OS entropy when
    /// no seed is set.
    pub fn new(
        config: SamplerConfig,
        catalog: Arc<Catalog>,
        embeddings: Arc<EmbeddingIndex>,
        interactions: Arc<InteractionLog>,
    ) -> SamplerResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, catalog, embeddings, interactions, rng)
    }

    /// Build an engine around a caller-supplied RNG. `config.seed` is ignored.
    pub fn with_rng(
        config: SamplerConfig,
        catalog: Arc<Catalog>,
        embeddings: Arc<EmbeddingIndex>,
        interactions: Arc<InteractionLog>,
        rng: StdRng,
    ) -> SamplerResult<Self> {
        config.validate()?;
        if embeddings.len() != catalog.len() {
            return Err(SamplerError::LengthMismatch {
                what: "embedding rows",
                expected: catalog.len(),
                found: embeddings.len(),
            });
        }
        interactions.validate_items(catalog.len())?;

        let similarity = SimilarityCache::new(embeddings, catalog.clusters())?;
        let scorer = RelevanceScorer::new(similarity, catalog.artists(), config.artist_boost)?;

        log::info!(
            "sampling engine ready: {} items, {} clusters, {} users, {} interactions",
            catalog.len(),
            catalog.cluster_count(),
            interactions.len(),
            interactions.total_interactions()
        );

        Ok(Self {
            config,
            catalog,
            interactions,
            scorer,
            rng,
        })
    }

    /// Run one strategy for `count` samples per user (or per pivot item).
    pub fn run(
        &mut self,
        kind: StrategyKind,
        count: usize,
        registry: &mut dyn DedupRegistry,
    ) -> SamplerResult<SampleBatch> {
        kind.strategy().sample(self, count, registry)
    }

    /// Fill the similarity cache with every pair inside each user's profile
    /// window, in parallel. Returns the number of pairs computed.
    pub fn prewarm(&mut self) -> usize {
        let window = self.config.max_profile_size;
        let mut pairs = Vec::new();
        for (_, history) in self.interactions.iter() {
            for (a, &i) in history.iter().enumerate() {
                let reach = window.map_or(history.len(), |w| (a + w).min(history.len()));
                pairs.extend(history[a..reach].iter().map(|&j| (i, j)));
            }
        }
        let inserted = self.scorer.similarity_mut().warmup_parallel(pairs);
        log::info!("prewarmed {} similarity pairs", inserted);
        inserted
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn interactions(&self) -> Arc<InteractionLog> {
        Arc::clone(&self.interactions)
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    // -----------------------------------------------------------------------
    // Helpers for the strategies
    // -----------------------------------------------------------------------

    pub(crate) fn budget(&self) -> AttemptBudget {
        AttemptBudget::new(self.config.max_attempts)
    }

    /// Synthetic strategies cannot sample when triples must be keyed on a
    /// real user.
    pub(crate) fn require_profile_identity(
        &self,
        strategy: StrategyKind,
        count: usize,
    ) -> SamplerResult<()> {
        if count > 0 && self.config.identity == IdentityMode::User {
            return Err(SamplerError::SyntheticInUserMode { strategy, count });
        }
        Ok(())
    }

    pub(crate) fn random_position(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub(crate) fn draw_biased<F>(
        &mut self,
        anchor: ItemIndex,
        budget: &mut AttemptBudget,
        reject: F,
    ) -> SamplerResult<Option<ItemIndex>>
    where
        F: Fn(ItemIndex) -> bool,
    {
        draw::biased_until(
            &self.catalog,
            anchor,
            self.config.threshold,
            &mut self.rng,
            budget,
            reject,
        )
    }

    pub(crate) fn draw_smart(
        &mut self,
        artists: &[ArtistId],
        clusters: &[ClusterId],
        exclude: &HashSet<ItemIndex>,
        budget: &mut AttemptBudget,
    ) -> SamplerResult<Option<ItemIndex>> {
        draw::smart(
            &self.catalog,
            self.config.threshold,
            &mut self.rng,
            artists,
            clusters,
            exclude,
            budget,
        )
    }

    pub(crate) fn draw_naive(
        &mut self,
        exclude: &HashSet<ItemIndex>,
        budget: &mut AttemptBudget,
    ) -> Option<ItemIndex> {
        draw::naive(self.catalog.len(), &mut self.rng, exclude, budget)
    }

    pub(crate) fn is_duplicate(&mut self, i: ItemIndex, j: ItemIndex) -> bool {
        self.scorer.similarity_mut().same(i, j)
    }

    pub(crate) fn pair_score(&mut self, i: ItemIndex, j: ItemIndex) -> f64 {
        self.scorer.pair_score(i, j)
    }

    pub(crate) fn profile_score(
        &mut self,
        user: UserId,
        profile: &[ItemIndex],
        item: ItemIndex,
    ) -> SamplerResult<f64> {
        Ok(self.scorer.profile_score(user, profile, item)?)
    }

    /// Up to `max_profile_size` items ending at and including `position`;
    /// the whole history when unbounded.
    pub(crate) fn profile_window<'h>(
        &self,
        history: &'h [ItemIndex],
        position: usize,
    ) -> &'h [ItemIndex] {
        match self.config.max_profile_size {
            Some(max) => {
                let end = position + 1;
                &history[end.saturating_sub(max)..end]
            }
            None => history,
        }
    }

    /// The latest `max_profile_size` items; the whole history when unbounded.
    pub(crate) fn recent_profile<'h>(&self, history: &'h [ItemIndex]) -> &'h [ItemIndex] {
        match self.config.max_profile_size {
            Some(max) => &history[history.len().saturating_sub(max)..],
            None => history,
        }
    }

    /// Key for a user-grounded triple, anchored per the identity mode.
    pub(crate) fn user_triple_key(
        &self,
        user: UserId,
        profile: &[ItemIndex],
        positive: ItemIndex,
        negative: ItemIndex,
    ) -> HashKey {
        let anchor = match self.config.identity {
            IdentityMode::Profile => TripleAnchor::Profile(profile),
            IdentityMode::User => TripleAnchor::User(user),
        };
        triple_key(anchor, positive, negative)
    }
}
