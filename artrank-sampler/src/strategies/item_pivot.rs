use super::{log_batch, skip_exhausted};
use crate::dedup::{triple_key, DedupRegistry, TripleAnchor};
use crate::draw::AttemptBudget;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::strategy::Strategy;
use crate::types::{ItemIndex, SampleBatch, SamplingStats, StrategyKind, Triple};

/// Synthetic users: every catalog item is a one-item profile and its own
/// positive, with a biased negative. No score filtering.
pub struct ItemPivot;

impl Strategy for ItemPivot {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ItemPivot
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

        for pivot in 0..engine.catalog().len() {
            let mut warned = false;
            for _ in 0..count {
                let mut budget = engine.budget();
                match sample_one(engine, pivot, &mut budget, registry, &mut batch.stats)? {
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
    budget: &mut AttemptBudget,
    registry: &mut dyn DedupRegistry,
    stats: &mut SamplingStats,
) -> SamplerResult<Option<Triple>> {
    while budget.spend() {
        let negative = match engine.draw_biased(pivot, budget, |j| j == pivot)? {
            Some(item) => item,
            None => return Ok(None),
        };

        if engine.is_duplicate(pivot, negative) {
            stats.duplicate += 1;
            continue;
        }

        let key = triple_key(TripleAnchor::Profile(&[pivot]), pivot, negative);
        if !registry.enroll(key) {
            stats.already_enrolled += 1;
            continue;
        }

        return Ok(Some(Triple {
            profile: vec![pivot],
            positive: pivot,
            negative,
            user: None,
        }));
    }
    Ok(None)
}
