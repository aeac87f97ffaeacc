use std::collections::HashSet;

use super::{log_batch, skip_exhausted};
use crate::dedup::DedupRegistry;
use crate::draw::AttemptBudget;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::strategy::Strategy;
use crate::types::{ArtistId, ClusterId, ItemIndex, SampleBatch, SamplingStats, StrategyKind, Triple, UserId};

/// Both items drawn from the user's taste (artists and clusters of the
/// history), ordered by profile score, kept only above a per-user margin.
///
/// The margin is `confidence_margin / history length`, so long histories
/// accept finer distinctions.
pub struct SmartPair;

/// Per-user inputs shared by every sample of that user.
struct Taste<'h> {
    user: UserId,
    profile: &'h [ItemIndex],
    artists: Vec<ArtistId>,
    clusters: Vec<ClusterId>,
    exclude: HashSet<ItemIndex>,
    margin: f64,
}

impl Strategy for SmartPair {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SmartPair
    }

    fn sample(
        &self,
        engine: &mut SamplingEngine,
        count: usize,
        registry: &mut dyn DedupRegistry,
    ) -> SamplerResult<SampleBatch> {
        let mut batch = SampleBatch::new(self.kind());
        let max_attempts = engine.config().max_attempts;
        let confidence_margin = engine.config().confidence_margin;
        let interactions = engine.interactions();

        for (user, history) in interactions.iter() {
            let catalog = engine.catalog();
            let profile = engine.recent_profile(history);
            let taste = Taste {
                user,
                profile,
                artists: history.iter().filter_map(|&i| catalog.artist_of(i)).collect(),
                clusters: history.iter().map(|&i| catalog.cluster_of(i)).collect(),
                exclude: profile.iter().copied().collect(),
                margin: confidence_margin / history.len() as f64,
            };

            let mut warned = false;
            for _ in 0..count {
                let mut budget = engine.budget();
                match sample_one(engine, &taste, &mut budget, registry, &mut batch.stats)? {
                    Some(triple) => batch.push(triple),
                    None => skip_exhausted(&mut batch, &mut warned, "user", user, max_attempts),
                }
            }
            log::debug!("{}: user {} done (margin {:.4})", batch.kind, user, taste.margin);
        }

        log_batch(&batch);
        Ok(batch)
    }
}

fn sample_one(
    engine: &mut SamplingEngine,
    taste: &Taste<'_>,
    budget: &mut AttemptBudget,
    registry: &mut dyn DedupRegistry,
    stats: &mut SamplingStats,
) -> SamplerResult<Option<Triple>> {
    while budget.spend() {
        let first = match engine.draw_smart(&taste.artists, &taste.clusters, &taste.exclude, budget)? {
            Some(item) => item,
            None => return Ok(None),
        };
        let second = match engine.draw_smart(&taste.artists, &taste.clusters, &taste.exclude, budget)? {
            Some(item) => item,
            None => return Ok(None),
        };

        if first == second {
            stats.same_item += 1;
            continue;
        }
        if engine.is_duplicate(first, second) {
            stats.duplicate += 1;
            continue;
        }

        let s_first = engine.profile_score(taste.user, taste.profile, first)?;
        let s_second = engine.profile_score(taste.user, taste.profile, second)?;
        let ((positive, s_pos), (negative, s_neg)) = if s_first < s_second {
            ((second, s_second), (first, s_first))
        } else {
            ((first, s_first), (second, s_second))
        };
        if s_pos < s_neg + taste.margin {
            stats.margin += 1;
            continue;
        }

        let key = engine.user_triple_key(taste.user, taste.profile, positive, negative);
        if !registry.enroll(key) {
            stats.already_enrolled += 1;
            continue;
        }

        return Ok(Some(Triple {
            profile: taste.profile.to_vec(),
            positive,
            negative,
            user: Some(taste.user),
        }));
    }
    Ok(None)
}
