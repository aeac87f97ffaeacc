//! The five sampling strategies.
//!
//! User-grounded strategies walk the interaction log in ascending user id
//! order; synthetic ones walk every catalog item as a pivot. Each requested
//! sample gets its own attempt budget.

mod item_pivot;
mod naive;
mod pivot_pair;
mod profile_positive;
mod smart_pair;

pub use item_pivot::ItemPivot;
pub use naive::NaiveProfilePositive;
pub use pivot_pair::PivotPair;
pub use profile_positive::ProfilePositive;
pub use smart_pair::SmartPair;

use std::fmt::Display;

use crate::types::SampleBatch;

/// Count a sample skipped after its budget ran out, warning once per
/// subject. The caller resets `warned` for every user or pivot.
fn skip_exhausted(
    batch: &mut SampleBatch,
    warned: &mut bool,
    subject: &str,
    id: impl Display,
    max_attempts: usize,
) {
    batch.stats.exhausted += 1;
    if !*warned {
        log::warn!(
            "{}: {} {} used up {} attempts, skipping sample",
            batch.kind,
            subject,
            id,
            max_attempts
        );
        *warned = true;
    }
}

fn log_batch(batch: &SampleBatch) {
    log::info!(
        "{}: {} triples, {} rejected (dup {}, score {}, margin {}, enrolled {}), {} skipped",
        batch.kind,
        batch.stats.accepted,
        batch.stats.rejected(),
        batch.stats.duplicate,
        batch.stats.low_score,
        batch.stats.margin,
        batch.stats.already_enrolled,
        batch.stats.exhausted
    );
}
