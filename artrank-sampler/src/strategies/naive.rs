use std::collections::HashSet;

use super::{log_batch, skip_exhausted};
use crate::dedup::DedupRegistry;
use crate::draw::AttemptBudget;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::strategy::Strategy;
use crate::types::{ItemIndex, SampleBatch, SamplingStats, StrategyKind, Triple, UserId};

/// Baseline: `ProfilePositive` with a uniformly random negative and no
/// similarity or score filtering.
pub struct NaiveProfilePositive;

impl Strategy for NaiveProfilePositive {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NaiveProfilePositive
    }

    fn sample(
        &self,
        engine: &mut SamplingEngine,
        count: usize,
        registry: &mut dyn DedupRegistry,
    ) -> SamplerResult<SampleBatch> {
        let mut batch = SampleBatch::new(self.kind());
        let max_attempts = engine.config().max_attempts;
        let interactions = engine.interactions();

        for (user, history) in interactions.iter() {
            let seen: HashSet<ItemIndex> = history.iter().copied().collect();
            let mut warned = false;
            for _ in 0..count {
                let mut budget = engine.budget();
                match sample_one(engine, user, history, &seen, &mut budget, registry, &mut batch.stats) {
                    Some(triple) => batch.push(triple),
                    None => skip_exhausted(&mut batch, &mut warned, "user", user, max_attempts),
                }
            }
        }

        log_batch(&batch);
        Ok(batch)
    }
}

fn sample_one(
    engine: &mut SamplingEngine,
    user: UserId,
    history: &[ItemIndex],
    seen: &HashSet<ItemIndex>,
    budget: &mut AttemptBudget,
    registry: &mut dyn DedupRegistry,
    stats: &mut SamplingStats,
) -> Option<Triple> {
    while budget.spend() {
        let position = engine.random_position(history.len());
        let positive = history[position];
        let profile = engine.profile_window(history, position);
        let negative = engine.draw_naive(seen, budget)?;

        let key = engine.user_triple_key(user, profile, positive, negative);
        if !registry.enroll(key) {
            stats.already_enrolled += 1;
            continue;
        }

        return Some(Triple {
            profile: profile.to_vec(),
            positive,
            negative,
            user: Some(user),
        });
    }
    None
}
