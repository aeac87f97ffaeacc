//! Random item draws shared by the strategies.
//!
//! Every retrying draw spends from an `AttemptBudget` and returns `None`
//! once it runs dry, so no loop here can spin forever.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use artrank_sim::thresholds::ARTIST_BRANCH_PROBABILITY;

use crate::catalog::Catalog;
use crate::error::{SamplerError, SamplerResult};
use crate::types::{ArtistId, ClusterId, ItemIndex};

/// Draw attempts left for one requested sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptBudget {
    remaining: usize,
}

impl AttemptBudget {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            remaining: max_attempts,
        }
    }

    /// Take one attempt. False once the budget is spent.
    pub fn spend(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Uniform choice from a membership bucket.
pub fn pick<R: Rng + ?Sized>(bucket: &[ItemIndex], rng: &mut R) -> SamplerResult<ItemIndex> {
    bucket.choose(rng).copied().ok_or(SamplerError::EmptyBucket)
}

/// One item biased towards `anchor`.
///
/// With probability `threshold` the item comes from the anchor's artist
/// (half the time, when the artist is known) or the anchor's cluster;
/// otherwise from a uniformly chosen cluster.
pub fn biased<R: Rng + ?Sized>(
    catalog: &Catalog,
    anchor: ItemIndex,
    threshold: f64,
    rng: &mut R,
) -> SamplerResult<ItemIndex> {
    let bucket = if rng.gen_bool(threshold) {
        match catalog.artist_of(anchor) {
            Some(artist) if rng.gen_bool(ARTIST_BRANCH_PROBABILITY) => {
                catalog.artist_members(artist)
            }
            _ => catalog.cluster_members(catalog.cluster_of(anchor)),
        }
    } else {
        catalog.cluster_members(random_cluster(catalog, rng))
    };
    pick(bucket, rng)
}

/// Repeat `biased` until `reject` is false for the drawn item.
pub fn biased_until<R, F>(
    catalog: &Catalog,
    anchor: ItemIndex,
    threshold: f64,
    rng: &mut R,
    budget: &mut AttemptBudget,
    reject: F,
) -> SamplerResult<Option<ItemIndex>>
where
    R: Rng + ?Sized,
    F: Fn(ItemIndex) -> bool,
{
    while budget.spend() {
        let item = biased(catalog, anchor, threshold, rng)?;
        if !reject(item) {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

/// One item matching a user's taste, outside `exclude`.
///
/// `artists` and `clusters` list the artist and cluster of every item in the
/// user's history, repeats included, so frequent tastes are drawn more
/// often. With an empty `artists` list the cluster branch is always taken.
pub fn smart<R: Rng + ?Sized>(
    catalog: &Catalog,
    threshold: f64,
    rng: &mut R,
    artists: &[ArtistId],
    clusters: &[ClusterId],
    exclude: &HashSet<ItemIndex>,
    budget: &mut AttemptBudget,
) -> SamplerResult<Option<ItemIndex>> {
    while budget.spend() {
        let bucket = if rng.gen_bool(threshold) {
            let use_artist = !artists.is_empty() && rng.gen_bool(ARTIST_BRANCH_PROBABILITY);
            if use_artist {
                let artist = artists.choose(rng).ok_or(SamplerError::EmptyBucket)?;
                catalog.artist_members(*artist)
            } else {
                let cluster = clusters.choose(rng).ok_or(SamplerError::EmptyBucket)?;
                catalog.cluster_members(*cluster)
            }
        } else {
            catalog.cluster_members(random_cluster(catalog, rng))
        };
        let item = pick(bucket, rng)?;
        if !exclude.contains(&item) {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

/// Uniform item over the whole catalog, outside `exclude`.
pub fn naive<R: Rng + ?Sized>(
    len: usize,
    rng: &mut R,
    exclude: &HashSet<ItemIndex>,
    budget: &mut AttemptBudget,
) -> Option<ItemIndex> {
    while budget.spend() {
        let item = rng.gen_range(0..len);
        if !exclude.contains(&item) {
            return Some(item);
        }
    }
    None
}

fn random_cluster<R: Rng + ?Sized>(catalog: &Catalog, rng: &mut R) -> ClusterId {
    rng.gen_range(0..catalog.cluster_count())
}
