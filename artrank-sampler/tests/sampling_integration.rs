use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use artrank_sampler::catalog_loader::{build_catalog, load_embeddings_file, load_items_file};
use artrank_sampler::interactions::{load_interactions_file, mark_evaluation_rows, holdout};
use artrank_sampler::*;
use artrank_sim::math::random_unit_vector;
use artrank_sim::{EmbeddingIndex, RelevanceScorer, SimilarityCache};

// ---------------------------------------------------------------------------
// Test data fixtures
// ---------------------------------------------------------------------------

const ITEMS: usize = 40;
const DIMS: usize = 8;

/// 40 items in 4 contiguous clusters of 10. Each item is its cluster axis
/// plus seeded noise. Artists own runs of 5 items; every fifth item has no
/// known artist.
fn fixture() -> (Arc<Catalog>, Arc<EmbeddingIndex>) {
    let mut rng = StdRng::seed_from_u64(11);
    let rows: Vec<Vec<f64>> = (0..ITEMS)
        .map(|i| {
            let noise = random_unit_vector(DIMS, &mut rng);
            let mut row: Vec<f64> = noise.iter().map(|x| 0.35 * x).collect();
            row[i / 10] += 1.0;
            row
        })
        .collect();
    let clusters: Vec<usize> = (0..ITEMS).map(|i| i / 10).collect();
    let artists: Vec<Option<u32>> = (0..ITEMS)
        .map(|i| if i % 5 == 4 { None } else { Some((i / 5) as u32) })
        .collect();
    let catalog = Catalog::new(clusters, artists).unwrap();
    let embeddings = EmbeddingIndex::from_rows(&rows).unwrap();
    (Arc::new(catalog), Arc::new(embeddings))
}

fn users() -> Arc<InteractionLog> {
    let mut histories = BTreeMap::new();
    histories.insert(1, vec![0, 1, 2, 11, 3, 5]);
    histories.insert(2, vec![12, 13, 14, 15]);
    histories.insert(3, vec![20, 21, 31, 22, 30, 23, 24]);
    histories.insert(4, vec![39]);
    histories.insert(5, vec![6, 16, 26, 36, 7]);
    Arc::new(InteractionLog::from_histories(histories).unwrap())
}

fn engine(config: SamplerConfig) -> SamplingEngine {
    let (catalog, embeddings) = fixture();
    SamplingEngine::new(config, catalog, embeddings, users()).unwrap()
}

fn seeded(seed: u64) -> SamplerConfig {
    SamplerConfig {
        seed: Some(seed),
        ..SamplerConfig::default()
    }
}

/// Independent scorer over the same fixture, for checking emitted triples.
fn checker(boost: f64) -> RelevanceScorer {
    let (catalog, embeddings) = fixture();
    let similarity = SimilarityCache::new(embeddings, catalog.clusters()).unwrap();
    RelevanceScorer::new(similarity, catalog.artists(), boost).unwrap()
}

// ---------------------------------------------------------------------------
// Strategy properties
// ---------------------------------------------------------------------------

#[test]
fn every_strategy_emits_distinct_non_duplicate_items() {
    let mut engine = engine(seeded(7));
    let mut registry = InMemoryRegistry::new();
    let mut check = checker(engine.config().artist_boost);

    for kind in StrategyKind::ALL {
        let batch = engine.run(kind, 2, &mut registry).unwrap();
        assert!(!batch.is_empty(), "{} produced nothing", kind);
        for t in &batch.triples {
            assert_ne!(t.positive, t.negative, "{}", kind);
            if kind != StrategyKind::NaiveProfilePositive {
                assert!(!check.similarity_mut().same(t.positive, t.negative));
            }
        }
    }
}

#[test]
fn profile_positive_outscores_its_negative() {
    let mut engine = engine(seeded(3));
    let mut registry = InMemoryRegistry::new();
    let batch = engine.run(StrategyKind::ProfilePositive, 4, &mut registry).unwrap();
    let mut check = checker(engine.config().artist_boost);
    let log = users();

    assert_eq!(batch.stats.accepted + batch.stats.exhausted, 4 * log.len());
    for t in &batch.triples {
        let user = t.user.unwrap();
        let history = log.history(user).unwrap();
        assert!(history.contains(&t.positive));
        assert!(!history.contains(&t.negative));
        assert_eq!(t.profile, history);
        let s_pos = check.profile_score(user, &t.profile, t.positive).unwrap();
        let s_neg = check.profile_score(user, &t.profile, t.negative).unwrap();
        assert!(s_pos > s_neg, "{} <= {}", s_pos, s_neg);
    }
}

#[test]
fn smart_pair_respects_per_user_margin() {
    let config = seeded(5);
    let margin = config.confidence_margin;
    let mut engine = engine(config);
    let mut registry = InMemoryRegistry::new();
    let batch = engine.run(StrategyKind::SmartPair, 3, &mut registry).unwrap();
    let mut check = checker(engine.config().artist_boost);
    let log = users();

    assert!(!batch.is_empty());
    for t in &batch.triples {
        let user = t.user.unwrap();
        let history = log.history(user).unwrap();
        assert_eq!(t.profile, history);
        assert!(!t.profile.contains(&t.positive));
        assert!(!t.profile.contains(&t.negative));
        let s_pos = check.profile_score(user, &t.profile, t.positive).unwrap();
        let s_neg = check.profile_score(user, &t.profile, t.negative).unwrap();
        assert!(s_pos >= s_neg + margin / history.len() as f64);
    }
}

#[test]
fn pivot_strategies_use_single_item_profiles() {
    let config = seeded(9);
    let margin = config.confidence_margin;
    let mut engine = engine(config);
    let mut registry = InMemoryRegistry::new();
    let mut check = checker(engine.config().artist_boost);

    let item_pivot = engine.run(StrategyKind::ItemPivot, 1, &mut registry).unwrap();
    assert_eq!(item_pivot.stats.accepted + item_pivot.stats.exhausted, ITEMS);
    for t in &item_pivot.triples {
        assert_eq!(t.profile, vec![t.positive]);
        assert_eq!(t.user, None);
    }

    let pivot_pair = engine.run(StrategyKind::PivotPair, 1, &mut registry).unwrap();
    assert!(!pivot_pair.is_empty());
    for t in &pivot_pair.triples {
        assert_eq!(t.profile.len(), 1);
        let pivot = t.profile[0];
        assert_ne!(t.positive, pivot);
        assert_ne!(t.negative, pivot);
        assert!(check.pair_score(pivot, t.positive) >= check.pair_score(pivot, t.negative) + margin);
        assert_eq!(t.user, None);
    }
}

#[test]
fn naive_negatives_stay_outside_the_history() {
    let mut engine = engine(seeded(13));
    let mut registry = InMemoryRegistry::new();
    let batch = engine
        .run(StrategyKind::NaiveProfilePositive, 3, &mut registry)
        .unwrap();
    let log = users();
    for t in &batch.triples {
        let history = log.history(t.user.unwrap()).unwrap();
        assert!(!history.contains(&t.negative));
    }
}

#[test]
fn window_scenario_keeps_positive_last() {
    let (catalog, embeddings) = fixture();
    let mut histories = BTreeMap::new();
    histories.insert(1, vec![10, 20, 30]);
    let log = Arc::new(InteractionLog::from_histories(histories).unwrap());
    let config = SamplerConfig {
        max_profile_size: Some(2),
        ..seeded(21)
    };
    let mut engine = SamplingEngine::new(config, catalog, embeddings, log).unwrap();
    let mut registry = InMemoryRegistry::new();
    let batch = engine.run(StrategyKind::ProfilePositive, 6, &mut registry).unwrap();

    assert!(!batch.is_empty());
    let allowed: [&[usize]; 3] = [&[10], &[10, 20], &[20, 30]];
    for t in &batch.triples {
        assert!([10, 20, 30].contains(&t.positive));
        assert!(allowed.contains(&t.profile.as_slice()), "profile {:?}", t.profile);
        assert_eq!(t.profile.last(), Some(&t.positive));
    }
}

// ---------------------------------------------------------------------------
// Dedup and plans
// ---------------------------------------------------------------------------

#[test]
fn keys_are_unique_across_a_plan() {
    let mut engine = engine(seeded(17));
    let mut registry = InMemoryRegistry::new();
    let plan = SamplingPlan::new()
        .with_step(StrategyKind::ProfilePositive, 3)
        .with_step(StrategyKind::ItemPivot, 1)
        .with_step(StrategyKind::SmartPair, 3)
        .with_step(StrategyKind::PivotPair, 1)
        .with_step(StrategyKind::NaiveProfilePositive, 2)
        .with_prewarm(true);
    let result = plan.execute(&mut engine, &mut registry).unwrap();

    assert!(result.prewarmed_pairs > 0);
    assert_eq!(result.steps.len(), 5);
    assert_eq!(result.stats.accepted, result.triples.len());
    assert_eq!(result.registry_size, result.triples.len());

    let keys: HashSet<HashKey> = result
        .triples
        .iter()
        .map(|t| triple_key(TripleAnchor::Profile(&t.profile), t.positive, t.negative))
        .collect();
    assert_eq!(keys.len(), result.triples.len());
}

#[test]
fn user_identity_keys_on_the_user() {
    let config = SamplerConfig {
        identity: IdentityMode::User,
        ..seeded(19)
    };
    let mut engine = engine(config);
    let mut registry = InMemoryRegistry::new();
    let batch = engine.run(StrategyKind::ProfilePositive, 3, &mut registry).unwrap();
    let keys: HashSet<(u64, usize, usize)> = batch
        .triples
        .iter()
        .map(|t| (t.user.unwrap(), t.positive, t.negative))
        .collect();
    assert_eq!(keys.len(), batch.len());
}

#[test]
fn synthetic_strategies_are_refused_in_user_mode() {
    let config = SamplerConfig {
        identity: IdentityMode::User,
        ..seeded(1)
    };
    let mut engine = engine(config);
    let mut registry = InMemoryRegistry::new();

    let err = engine.run(StrategyKind::ItemPivot, 1, &mut registry).unwrap_err();
    assert!(matches!(err, SamplerError::SyntheticInUserMode { count: 1, .. }));
    assert!(engine.run(StrategyKind::PivotPair, 0, &mut registry).unwrap().is_empty());

    // the plan refuses before running the user-grounded step
    let plan = SamplingPlan::new()
        .with_step(StrategyKind::ProfilePositive, 1)
        .with_step(StrategyKind::PivotPair, 1);
    assert!(plan.execute(&mut engine, &mut registry).is_err());
    assert!(registry.is_empty());
}

#[test]
fn same_seed_same_triples() {
    let plan = SamplingPlan::new()
        .with_step(StrategyKind::ProfilePositive, 2)
        .with_step(StrategyKind::PivotPair, 1);
    let run = |seed| {
        let mut engine = engine(seeded(seed));
        let mut registry = InMemoryRegistry::new();
        plan.execute(&mut engine, &mut registry).unwrap().triples
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn exhausted_budget_skips_samples() {
    // the only user has seen the whole catalog, so no negative exists
    let catalog = Arc::new(Catalog::new(vec![0, 0, 1, 1], vec![None; 4]).unwrap());
    let embeddings = Arc::new(
        EmbeddingIndex::from_rows(&[
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
        ])
        .unwrap(),
    );
    let mut histories = BTreeMap::new();
    histories.insert(8, vec![0, 1, 2, 3]);
    let log = Arc::new(InteractionLog::from_histories(histories).unwrap());
    let config = SamplerConfig {
        max_attempts: 50,
        ..seeded(2)
    };
    let mut engine = SamplingEngine::new(config, catalog, embeddings, log).unwrap();
    let mut registry = InMemoryRegistry::new();

    let batch = engine.run(StrategyKind::ProfilePositive, 3, &mut registry).unwrap();
    assert!(batch.is_empty());
    assert_eq!(batch.stats.exhausted, 3);

    let naive = engine
        .run(StrategyKind::NaiveProfilePositive, 2, &mut registry)
        .unwrap();
    assert_eq!(naive.stats.exhausted, 2);
}

#[test]
fn same_cluster_duplicates_are_never_paired() {
    // items 0/1 and 2/3 are identical vectors inside cluster 0
    let catalog = Arc::new(Catalog::new(vec![0, 0, 0, 0, 1, 1], vec![None; 6]).unwrap());
    let embeddings = Arc::new(
        EmbeddingIndex::from_rows(&[
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.6, 0.8, 0.0],
            vec![0.6, 0.8, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.6, 0.8],
        ])
        .unwrap(),
    );
    let mut histories = BTreeMap::new();
    histories.insert(1, vec![0]);
    let log = Arc::new(InteractionLog::from_histories(histories).unwrap());
    let is_duplicate_pair = |t: &Triple| {
        let pair = (t.positive.min(t.negative), t.positive.max(t.negative));
        pair == (0, 1) || pair == (2, 3)
    };

    let duplicating = [
        StrategyKind::ProfilePositive,
        StrategyKind::ItemPivot,
        StrategyKind::SmartPair,
        StrategyKind::PivotPair,
    ];
    for kind in duplicating {
        let config = SamplerConfig {
            threshold: 1.0,
            max_attempts: 2_000,
            ..seeded(23)
        };
        let mut engine =
            SamplingEngine::new(config, catalog.clone(), embeddings.clone(), log.clone()).unwrap();
        let mut registry = InMemoryRegistry::new();
        let batch = engine.run(kind, 3, &mut registry).unwrap();

        assert!(batch.stats.duplicate > 0, "{} never hit a duplicate", kind);
        assert!(!batch.is_empty(), "{} produced nothing", kind);
        for t in &batch.triples {
            assert!(!is_duplicate_pair(t), "{} paired {} with {}", kind, t.positive, t.negative);
        }
    }
}

// ---------------------------------------------------------------------------
// Loading from disk
// ---------------------------------------------------------------------------

#[test]
fn csv_files_feed_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let embeddings_path = dir.path().join("embeddings.csv");
    let items_path = dir.path().join("items.csv");
    let interactions_path = dir.path().join("interactions.csv");

    let mut embeddings_csv = String::new();
    let mut items_csv = String::from("item_id,cluster,artist\n");
    for i in 0..12 {
        let axis = i / 4;
        let mut v = vec![0.1 * (i % 4) as f64; 3];
        v[axis] += 1.0;
        embeddings_csv.push_str(&format!("imgs/{}.jpg,{},{},{}\n", 100 + i, v[0], v[1], v[2]));
        let artist = if i % 2 == 0 { (i / 2).to_string() } else { String::new() };
        items_csv.push_str(&format!("{},{},{}\n", 100 + i, axis, artist));
    }
    let interactions_csv = "\
user_id,item_id,timestamp
1,100,1
1,101,2
1,105,3
1,102,4
2,108,1
2,109,5
2,999,6
2,110,7
";
    std::fs::write(&embeddings_path, embeddings_csv).unwrap();
    std::fs::write(&items_path, items_csv).unwrap();
    std::fs::write(&interactions_path, interactions_csv).unwrap();

    let named = load_embeddings_file(embeddings_path.to_str().unwrap()).unwrap();
    let items = load_items_file(items_path.to_str().unwrap()).unwrap();
    let catalog = Arc::new(build_catalog(&items, &named).unwrap());
    assert_eq!(catalog.cluster_count(), 3);

    let records = load_interactions_file(interactions_path.to_str().unwrap()).unwrap();
    let marked = mark_evaluation_rows(&records, None);
    let (evaluation, training) = holdout(&marked);
    assert_eq!(evaluation.len(), 2);
    assert_eq!(evaluation[0].predict, "102");

    let log = InteractionLog::from_records(&training, &named.id_to_index).unwrap();
    assert_eq!(log.history(1), Some(&[0, 1, 5][..]));
    // item 999 has no embedding and is dropped
    assert_eq!(log.history(2), Some(&[8, 9][..]));

    let mut engine = SamplingEngine::new(
        seeded(4),
        catalog,
        Arc::new(named.embeddings),
        Arc::new(log),
    )
    .unwrap();
    let mut registry = InMemoryRegistry::new();
    let result = SamplingPlan::new()
        .with_step(StrategyKind::ProfilePositive, 2)
        .with_step(StrategyKind::ItemPivot, 1)
        .execute(&mut engine, &mut registry)
        .unwrap();
    assert!(!result.triples.is_empty());
}
