use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use serde::Serialize;

pub use artrank_sim::{ArtistId, ClusterId, ItemIndex, UserId};

// ---------------------------------------------------------------------------
// Strategy identity
// ---------------------------------------------------------------------------

/// The sampling strategies the engine can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyKind {
    /// Strategy 1: positive from the log, biased negative, score filter.
    ProfilePositive,
    /// Strategy 2: every item as pivot, biased negative, no score filter.
    ItemPivot,
    /// Strategy 3: both items drawn from the user's taste, per-user margin.
    SmartPair,
    /// Strategy 4: every item as pivot, both items drawn, fixed margin.
    PivotPair,
    /// Strategy 1 with a uniform negative and no filters.
    NaiveProfilePositive,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::ProfilePositive,
        StrategyKind::ItemPivot,
        StrategyKind::SmartPair,
        StrategyKind::PivotPair,
        StrategyKind::NaiveProfilePositive,
    ];

    /// Synthetic strategies emit triples with no real user behind them.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, StrategyKind::ItemPivot | StrategyKind::PivotPair)
    }

    /// Short flag-style name, as accepted by `FromStr`.
    pub fn short_name(&self) -> &'static str {
        match self {
            StrategyKind::ProfilePositive => "s1",
            StrategyKind::ItemPivot => "s2",
            StrategyKind::SmartPair => "s3",
            StrategyKind::PivotPair => "s4",
            StrategyKind::NaiveProfilePositive => "naive",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::ProfilePositive => write!(f, "Strategy 1"),
            StrategyKind::ItemPivot => write!(f, "Strategy 2"),
            StrategyKind::SmartPair => write!(f, "Strategy 3"),
            StrategyKind::PivotPair => write!(f, "Strategy 4"),
            StrategyKind::NaiveProfilePositive => write!(f, "Naive strategy 1"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.short_name() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown strategy '{}' (expected s1, s2, s3, s4 or naive)", s))
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One training sample: an anchor profile, a positive and a negative item.
///
/// `user` is `None` for synthetic samples not tied to a real user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Triple {
    pub profile: Vec<ItemIndex>,
    pub positive: ItemIndex,
    pub negative: ItemIndex,
    pub user: Option<UserId>,
}

/// Per-run counters: accepted samples and why candidates were rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SamplingStats {
    pub accepted: usize,
    /// Positive and negative drew the same item.
    pub same_item: usize,
    /// Positive and negative are the same visual asset.
    pub duplicate: usize,
    /// Negative scored at least as high as the positive.
    pub low_score: usize,
    /// Score gap below the required margin.
    pub margin: usize,
    /// Triple key was already in the dedup registry.
    pub already_enrolled: usize,
    /// Samples skipped after the attempt budget ran out.
    pub exhausted: usize,
}

impl SamplingStats {
    /// Total rejected candidates, excluding skipped samples.
    pub fn rejected(&self) -> usize {
        self.same_item + self.duplicate + self.low_score + self.margin + self.already_enrolled
    }
}

impl AddAssign for SamplingStats {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.same_item += other.same_item;
        self.duplicate += other.duplicate;
        self.low_score += other.low_score;
        self.margin += other.margin;
        self.already_enrolled += other.already_enrolled;
        self.exhausted += other.exhausted;
    }
}

/// Output of one strategy run, in generation order.
#[derive(Clone, Debug, Serialize)]
pub struct SampleBatch {
    pub kind: StrategyKind,
    pub triples: Vec<Triple>,
    pub stats: SamplingStats,
}

impl SampleBatch {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            triples: Vec::new(),
            stats: SamplingStats::default(),
        }
    }

    pub fn push(&mut self, triple: Triple) {
        self.stats.accepted += 1;
        self.triples.push(triple);
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}
