use std::collections::HashSet;

use super::{log_batch, skip_exhausted};
use crate::dedup::DedupRegistry;
use crate::draw::AttemptBudget;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::strategy::Strategy;
use crate::types::{ItemIndex, SampleBatch, SamplingStats, StrategyKind, Triple, UserId};

/// Positive from the user's own history, negative drawn near it.
///
/// The profile is the window of history ending at the positive. A
/// candidate is kept only when the positive outscores the negative against
/// that profile.
pub struct ProfilePositive;

impl Strategy for ProfilePositive {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ProfilePositive
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
                match sample_one(engine, user, history, &seen, &mut budget, registry, &mut batch.stats)? {
                    Some(triple) => batch.push(triple),
                    None => skip_exhausted(&mut batch, &mut warned, "user", user, max_attempts),
                }
            }
            log::debug!("{}: user {} done", batch.kind, user);
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
) -> SamplerResult<Option<Triple>> {
    while budget.spend() {
        let position = engine.random_position(history.len());
        let positive = history[position];
        let profile = engine.profile_window(history, position);

        let negative = match engine.draw_biased(positive, budget, |j| seen.contains(&j))? {
            Some(item) => item,
            None => return Ok(None),
        };

        if engine.is_duplicate(positive, negative) {
            stats.duplicate += 1;
            continue;
        }

        let s_pos = engine.profile_score(user, profile, positive)?;
        let s_neg = engine.profile_score(user, profile, negative)?;
        if s_pos <= s_neg {
            stats.low_score += 1;
            continue;
        }

        let key = engine.user_triple_key(user, profile, positive, negative);
        if !registry.enroll(key) {
            stats.already_enrolled += 1;
            continue;
        }

        return Ok(Some(Triple {
            profile: profile.to_vec(),
            positive,
            negative,
            user: Some(user),
        }));
    }
    Ok(None)
}
