use serde::Serialize;

use crate::dedup::DedupRegistry;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::types::{SamplingStats, StrategyKind, Triple};

/// One strategy invocation in a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub kind: StrategyKind,
    /// Samples per user, or per pivot item for the synthetic strategies.
    pub count: usize,
}

/// An ordered list of strategy runs sharing one engine and one registry.
///
/// Flow:
/// 1. Optionally prewarm the similarity cache
/// 2. Run each enabled step in order, enrolling keys in the shared registry
/// 3. Concatenate the triples and sum the stats
#[derive(Clone, Debug, Default)]
pub struct SamplingPlan {
    steps: Vec<PlanStep>,
    prewarm: bool,
}

/// What a step produced.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StepReport {
    pub kind: StrategyKind,
    pub requested: usize,
    pub stats: SamplingStats,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlanResult {
    pub triples: Vec<Triple>,
    pub steps: Vec<StepReport>,
    pub stats: SamplingStats,
    pub prewarmed_pairs: usize,
    pub registry_size: usize,
}

impl SamplingPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, kind: StrategyKind, count: usize) -> Self {
        self.steps.push(PlanStep { kind, count });
        self
    }

    pub fn with_prewarm(mut self, prewarm: bool) -> Self {
        self.prewarm = prewarm;
        self
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn execute(
        &self,
        engine: &mut SamplingEngine,
        registry: &mut dyn DedupRegistry,
    ) -> SamplerResult<PlanResult> {
        for step in self.steps.iter().filter(|s| s.kind.is_synthetic()) {
            engine.require_profile_identity(step.kind, step.count)?;
        }

        let prewarmed_pairs = if self.prewarm { engine.prewarm() } else { 0 };

        let mut triples = Vec::new();
        let mut steps = Vec::new();
        let mut stats = SamplingStats::default();

        for step in &self.steps {
            let strategy = step.kind.strategy();
            if !strategy.enable(step.count) {
                log::debug!("skipping {} (count 0)", strategy.name());
                continue;
            }
            log::info!("running {} with {} samples each", strategy.name(), step.count);
            let batch = strategy.sample(engine, step.count, registry)?;
            stats += batch.stats;
            steps.push(StepReport {
                kind: step.kind,
                requested: step.count,
                stats: batch.stats,
            });
            triples.extend(batch.triples);
        }

        log::info!(
            "plan finished: {} triples from {} steps, registry holds {} keys",
            triples.len(),
            steps.len(),
            registry.len()
        );

        Ok(PlanResult {
            triples,
            steps,
            stats,
            prewarmed_pairs,
            registry_size: registry.len(),
        })
    }
}
