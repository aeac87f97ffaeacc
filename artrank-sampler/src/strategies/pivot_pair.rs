use super::{log_batch, skip_exhausted};
use crate::dedup::{triple_key, DedupRegistry, TripleAnchor};
use crate::draw::AttemptBudget;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::strategy::Strategy;
use crate::types::{ItemIndex, SampleBatch, SamplingStats, StrategyKind, Triple};

/// Synthetic users: every catalog item is a one-item profile, and both the
/// positive and the negative are drawn near it. The pair is ordered by
/// `pair_score` against the pivot and must clear `confidence_margin`.
pub struct PivotPair;

impl Strategy for PivotPair {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PivotPair
    }

    fn sample(
        &self,
        engine: &mut SamplingEngine,
        count: usize,
        registry: &mut dyn DedupRegistry,
    ) -> SamplerResult<SampleBatch> {
        engine.require_profile_identity(self.kind(), count)?;
        let mut batch = SampleBatch::new(self.kind());
        let max_attempts = engine.config().max_attempts;
        let margin = engine.config().confidence_margin;

        for pivot in 0..engine.catalog().len() {
            let mut warned = false;
            for _ in 0..count {
                let mut budget = engine.budget();
                match sample_one(engine, pivot, margin, &mut budget, registry, &mut batch.stats)? {
                    Some(triple) => batch.push(triple),
                    None => skip_exhausted(&mut batch, &mut warned, "pivot", pivot, max_attempts),
                }
            }
        }

        log_batch(&batch);
        Ok(batch)
    }
}

fn sample_one(
    engine: &mut SamplingEngine,
    pivot: ItemIndex,
    margin: f64,
    budget: &mut AttemptBudget,
    registry: &mut dyn DedupRegistry,
    stats: &mut SamplingStats,
) -> SamplerResult<Option<Triple>> {
    while budget.spend() {
        let first = match engine.draw_biased(pivot, budget, |j| j == pivot)? {
            Some(item) => item,
            None => return Ok(None),
        };
        let second = match engine.draw_biased(pivot, budget, |j| j == pivot)? {
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

        let s_first = engine.pair_score(pivot, first);
        let s_second = engine.pair_score(pivot, second);
        let ((positive, s_pos), (negative, s_neg)) = if s_first < s_second {
            ((second, s_second), (first, s_first))
        } else {
            ((first, s_first), (second, s_second))
        };
        if s_pos < s_neg + margin {
            stats.margin += 1;
            continue;
        }

        let key = triple_key(TripleAnchor::Profile(&[pivot]), positive, negative);
        if !registry.enroll(key) {
            stats.already_enrolled += 1;
            continue;
        }

        return Ok(Some(Triple {
            profile: vec![pivot],
            positive,
            negative,
            user: None,
        }));
    }
    Ok(None)
}
