//! Triplet sampling for metric learning on user-item interaction logs.
//!
//! - `Catalog`, `InteractionLog`: the read-only inputs
//! - `SamplingEngine`: RNG and caches for one run
//! - `strategies`: the five ways of drawing (profile, positive, negative)
//! - `SamplingPlan`: several strategies against one dedup registry

pub mod catalog;
pub mod catalog_loader;
pub mod config;
pub mod dedup;
pub mod draw;
pub mod engine;
pub mod error;
pub mod interactions;
pub mod plan;
pub mod strategies;
pub mod strategy;
pub mod types;

pub use catalog::Catalog;
pub use config::{IdentityMode, SamplerConfig};
pub use dedup::{triple_key, DedupRegistry, HashKey, InMemoryRegistry, TripleAnchor};
pub use engine::SamplingEngine;
pub use error::{SamplerError, SamplerResult};
pub use interactions::InteractionLog;
pub use plan::{PlanResult, SamplingPlan};
pub use strategy::Strategy;
pub use types::{SampleBatch, SamplingStats, StrategyKind, Triple};
