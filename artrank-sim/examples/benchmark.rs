//! Performance benchmark for the similarity cache.
//!
//! Builds a synthetic catalog of random unit embeddings, then compares lazy
//! pairwise lookups against a parallel warmup followed by cached lookups.
//!
//! Run with:
//!   cargo run --example benchmark --release -p artrank-sim

use std::sync::Arc;
use std::time::Instant;

use artrank_sim::math::random_unit_vector;
use artrank_sim::{ClusterId, EmbeddingIndex, SimilarityCache};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NUM_ITEMS: usize = 20_000;
const DIMENSIONS: usize = 256;
const NUM_CLUSTERS: usize = 100;
const NUM_PAIRS: usize = 500_000;
const SEED: u64 = 42;

fn main() {
    println!("=== artrank-sim Similarity Cache Benchmark ===");
    println!();

    println!(
        "Generating {} embeddings (dimensions={})...",
        NUM_ITEMS, DIMENSIONS
    );
    let gen_start = Instant::now();
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut matrix = Array2::<f64>::zeros((NUM_ITEMS, DIMENSIONS));
    for mut row in matrix.rows_mut() {
        row.assign(&random_unit_vector(DIMENSIONS, &mut rng));
    }
    let embeddings = match EmbeddingIndex::new(matrix) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            eprintln!("Error building embeddings: {}", e);
            std::process::exit(1);
        }
    };
    let clusters: Arc<[ClusterId]> =
        Arc::from((0..NUM_ITEMS).map(|i| i % NUM_CLUSTERS).collect::<Vec<_>>());
    println!("  Generated in {:.3}s", gen_start.elapsed().as_secs_f64());
    println!();

    let pairs: Vec<(usize, usize)> = (0..NUM_PAIRS)
        .map(|_| (rng.gen_range(0..NUM_ITEMS), rng.gen_range(0..NUM_ITEMS)))
        .collect();

    // -----------------------------------------------------------------------
    // Lazy lookups
    // -----------------------------------------------------------------------
    let mut lazy = match SimilarityCache::new(Arc::clone(&embeddings), Arc::clone(&clusters)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error building cache: {}", e);
            std::process::exit(1);
        }
    };
    let lazy_start = Instant::now();
    let mut lazy_sum = 0.0;
    for &(i, j) in &pairs {
        lazy_sum += lazy.similarity(i, j);
    }
    let lazy_elapsed = lazy_start.elapsed();
    println!(
        "Lazy:    {} lookups in {:.3}s ({} computed, {} hits)",
        NUM_PAIRS,
        lazy_elapsed.as_secs_f64(),
        lazy.stats().misses,
        lazy.stats().hits
    );

    // -----------------------------------------------------------------------
    // Parallel warmup + cached lookups
    // -----------------------------------------------------------------------
    let mut warmed = match SimilarityCache::new(Arc::clone(&embeddings), Arc::clone(&clusters)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error building cache: {}", e);
            std::process::exit(1);
        }
    };
    let warm_start = Instant::now();
    let inserted = warmed.warmup_parallel(pairs.iter().copied());
    let warm_elapsed = warm_start.elapsed();
    let lookup_start = Instant::now();
    let mut warm_sum = 0.0;
    for &(i, j) in &pairs {
        warm_sum += warmed.similarity(i, j);
    }
    let lookup_elapsed = lookup_start.elapsed();
    println!(
        "Warmup:  {} pairs in {:.3}s, then {} lookups in {:.3}s",
        inserted,
        warm_elapsed.as_secs_f64(),
        NUM_PAIRS,
        lookup_elapsed.as_secs_f64()
    );
    println!();

    let agree = (lazy_sum - warm_sum).abs() < 1e-6;
    println!(
        "Checksums {} (lazy={:.6}, warmed={:.6})",
        if agree { "agree" } else { "DIFFER" },
        lazy_sum,
        warm_sum
    );
    println!(
        "Speedup: {:.2}x",
        lazy_elapsed.as_secs_f64() / (warm_elapsed + lookup_elapsed).as_secs_f64()
    );
}
