use crate::dedup::DedupRegistry;
use crate::engine::SamplingEngine;
use crate::error::SamplerResult;
use crate::strategies::{ItemPivot, NaiveProfilePositive, PivotPair, ProfilePositive, SmartPair};
use crate::types::{SampleBatch, StrategyKind};

/// A triple sampling strategy.
///
/// Strategies are stateless: the engine carries the RNG and caches, the
/// registry carries the keys already emitted.
pub trait Strategy {
    fn kind(&self) -> StrategyKind;

    /// Decide if this strategy should run for the requested count.
    fn enable(&self, count: usize) -> bool {
        count > 0
    }

    /// Draw up to `count` triples per user (or per pivot item), enrolling
    /// each accepted triple's key in `registry`.
    fn sample(
        &self,
        engine: &mut SamplingEngine,
        count: usize,
        registry: &mut dyn DedupRegistry,
    ) -> SamplerResult<SampleBatch>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }
}

impl StrategyKind {
    pub fn strategy(&self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::ProfilePositive => Box::new(ProfilePositive),
            StrategyKind::ItemPivot => Box::new(ItemPivot),
            StrategyKind::SmartPair => Box::new(SmartPair),
            StrategyKind::PivotPair => Box::new(PivotPair),
            StrategyKind::NaiveProfilePositive => Box::new(NaiveProfilePositive),
        }
    }
}

/// `"my_crate::module::MyType"` -> `"MyType"`.
fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}
