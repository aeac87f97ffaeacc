//! Correctness tests for artrank-sim.
//!
//! Validates that:
//! 1. Similarity is symmetric and self-similarity is 1.0
//! 2. Near-identical assets in one cluster are duplicates, across clusters never
//! 3. Repeated lookups are bit-identical and served from cache
//! 4. Parallel warmup agrees with lazy computation

use std::sync::Arc;

use artrank_sim::math::random_unit_vector;
use artrank_sim::{
    ArtistId, CacheStats, ClusterId, EmbeddingIndex, RelevanceScorer, SimilarityCache,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ITEMS: usize = 60;
const DIM: usize = 24;
const SEED: u64 = 42;

fn random_embeddings(items: usize, seed: u64) -> Arc<EmbeddingIndex> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut matrix = Array2::<f64>::zeros((items, DIM));
    for mut row in matrix.rows_mut() {
        row.assign(&random_unit_vector(DIM, &mut rng));
    }
    Arc::new(EmbeddingIndex::new(matrix).unwrap())
}

fn clusters(items: usize, count: usize) -> Arc<[ClusterId]> {
    Arc::from((0..items).map(|i| i % count).collect::<Vec<_>>())
}

fn cache() -> SimilarityCache {
    SimilarityCache::new(random_embeddings(ITEMS, SEED), clusters(ITEMS, 6)).unwrap()
}

// ---------------------------------------------------------------------------
// Similarity invariants
// ---------------------------------------------------------------------------

#[test]
fn similarity_is_symmetric_for_all_pairs() {
    let mut c = cache();
    for i in 0..ITEMS {
        for j in 0..ITEMS {
            let a = c.similarity(i, j);
            let b = c.similarity(j, i);
            assert_eq!(a.to_bits(), b.to_bits(), "sim({},{}) != sim({},{})", i, j, j, i);
        }
    }
    // one computation per unordered pair, diagonal included
    assert_eq!(c.len(), ITEMS * (ITEMS + 1) / 2);
}

#[test]
fn self_similarity_is_one() {
    let mut c = cache();
    for i in 0..ITEMS {
        let sim = c.similarity(i, i);
        assert!((sim - 1.0).abs() < 1e-12, "self-similarity of {} was {}", i, sim);
    }
}

#[test]
fn similarities_stay_in_range() {
    let mut c = cache();
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..500 {
        let i = rng.gen_range(0..ITEMS);
        let j = rng.gen_range(0..ITEMS);
        let sim = c.similarity(i, j);
        assert!((-1.0..=1.0).contains(&sim));
    }
}

#[test]
fn repeated_lookup_is_served_from_cache() {
    let mut c = cache();
    let first = c.similarity(3, 17);
    let second = c.similarity(17, 3);
    let third = c.similarity(3, 17);
    assert_eq!(first.to_bits(), second.to_bits());
    assert_eq!(first.to_bits(), third.to_bits());
    assert_eq!(c.stats(), CacheStats { hits: 2, misses: 1 });
}

// ---------------------------------------------------------------------------
// Duplicate detection
// ---------------------------------------------------------------------------

#[test]
fn four_item_duplicate_scenario() {
    // items 0 and 1 near-identical; item 2 points the same way but lives in
    // another cluster
    let embeddings = EmbeddingIndex::from_rows(&[
        vec![0.5, 0.5, 0.1],
        vec![0.5, 0.5, 0.1 + 1e-12],
        vec![0.5, 0.5, 0.1],
        vec![-0.3, 0.9, 0.0],
    ])
    .unwrap();
    let clusters: Arc<[ClusterId]> = Arc::from(vec![0, 0, 1, 1]);
    let mut c = SimilarityCache::new(Arc::new(embeddings), clusters).unwrap();

    assert!(c.same(0, 1));
    assert!(c.same(1, 0));
    assert!(!c.same(0, 2));
    assert!((c.similarity(0, 2) - 1.0).abs() < 1e-12);
    assert_eq!(c.duplicate_count(), 2);
}

#[test]
fn random_vectors_are_not_duplicates() {
    let mut c = cache();
    for i in 0..ITEMS {
        for j in (i + 1)..ITEMS {
            assert!(!c.same(i, j), "random items {} and {} flagged as duplicates", i, j);
        }
    }
    assert_eq!(c.duplicate_count(), 0);
}

// ---------------------------------------------------------------------------
// Warmup and scoring
// ---------------------------------------------------------------------------

#[test]
fn warmup_parallel_agrees_with_lazy() {
    let mut warmed = cache();
    let mut lazy = cache();
    let pairs: Vec<(usize, usize)> = (0..ITEMS)
        .flat_map(|i| (0..ITEMS).map(move |j| (i, j)))
        .collect();
    let inserted = warmed.warmup_parallel(pairs);
    assert_eq!(inserted, ITEMS * (ITEMS + 1) / 2);

    for i in 0..ITEMS {
        for j in 0..ITEMS {
            assert_eq!(warmed.similarity(i, j).to_bits(), lazy.similarity(i, j).to_bits());
        }
    }
    assert_eq!(warmed.stats().misses, 0);
}

#[test]
fn profile_score_matches_manual_average() {
    let embeddings = random_embeddings(ITEMS, 7);
    let artists: Arc<[Option<ArtistId>]> = Arc::from(
        (0..ITEMS)
            .map(|i| if i % 4 == 0 { None } else { Some((i % 5) as ArtistId) })
            .collect::<Vec<_>>(),
    );
    let sim = SimilarityCache::new(Arc::clone(&embeddings), clusters(ITEMS, 6)).unwrap();
    let mut scorer = RelevanceScorer::new(sim, Arc::clone(&artists), 0.25).unwrap();

    let profile = [1, 2, 3, 9, 14];
    let item = 21;
    let expected: f64 = profile
        .iter()
        .map(|&j| {
            let boost = match (artists[item], artists[j]) {
                (Some(a), Some(b)) if a == b => 0.25,
                _ => 0.0,
            };
            embeddings.cosine(item, j) + boost
        })
        .sum::<f64>()
        / profile.len() as f64;

    let score = scorer.profile_score(5, &profile, item).unwrap();
    assert!((score - expected).abs() < 1e-12);
    let again = scorer.profile_score(5, &profile, item).unwrap();
    assert_eq!(score.to_bits(), again.to_bits());
    assert_eq!(scorer.stats().misses, 1);
}
