use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use artrank_sampler::catalog_loader::{build_catalog, load_embeddings_file, load_items_file};
use artrank_sampler::interactions::{holdout, load_interactions_file, mark_evaluation_rows};
use artrank_sampler::plan::{PlanResult, StepReport};
use artrank_sampler::{
    IdentityMode, InMemoryRegistry, InteractionLog, SamplerConfig, SamplingEngine, SamplingPlan,
    SamplingStats, StrategyKind,
};
use artrank_sim::CacheStats;

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunJson {
    generated_at: String,
    config: SamplerConfig,
    load_ms: u128,
    sampling_ms: u128,
    catalog: CatalogJson,
    holdout_rows: usize,
    steps: Vec<StepReport>,
    stats: SamplingStats,
    prewarmed_pairs: usize,
    registry_size: usize,
    similarity_cache: CacheStats,
    score_cache: CacheStats,
    duplicate_checks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

#[derive(Serialize)]
struct CatalogJson {
    items: usize,
    clusters: usize,
    artists: usize,
    users: usize,
    interactions: usize,
}

/// One line of the triples file, with external item ids.
#[derive(Serialize)]
struct TripleJson<'a> {
    profile: Vec<&'a str>,
    positive: &'a str,
    negative: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<u64>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Value following flag `args[i]`, parsed as `T`.
fn flag_value<T: FromStr>(args: &[String], i: usize) -> T {
    let flag = &args[i];
    match args.get(i + 1) {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|_| fail(format!("{} got an invalid value '{}'", flag, raw))),
        None => fail(format!("{} requires a value", flag)),
    }
}

fn print_usage() {
    eprintln!("Usage: artrank <embeddings.csv> <items.csv> <interactions.csv> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config PATH        JSON sampler config (flags below override it)");
    eprintln!("  --seed N             RNG seed");
    eprintln!("  --threshold X        Probability of drawing near the anchor (default: 0.7)");
    eprintln!("  --margin X           Confidence margin (default: 0.18)");
    eprintln!("  --max-profile N      Maximum profile length (default: whole history)");
    eprintln!("  --identity MODE      Triple identity: profile or user (default: profile)");
    eprintln!("  --s1 N --s2 N --s3 N --s4 N --naive N");
    eprintln!("                       Samples per user/item for each strategy (default: --s1 1)");
    eprintln!("  --holdout K          Hold out the last K interactions of every user");
    eprintln!("  --prewarm            Fill the similarity cache in parallel before sampling");
    eprintln!("  --out PATH           Write triples as JSON lines");
    eprintln!("  --json               Output the run summary as JSON");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  artrank emb.csv items.csv interactions.csv --seed 7 --s1 10 --s3 10 --json");
    eprintln!("  artrank emb.csv items.csv interactions.csv --s2 1 --s4 1 --out triples.jsonl");
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        print_usage();
        process::exit(1);
    }

    let embeddings_path = &args[1];
    let items_path = &args[2];
    let interactions_path = &args[3];

    // Parse optional flags
    let mut config_path: Option<String> = None;
    let mut seed: Option<u64> = None;
    let mut threshold: Option<f64> = None;
    let mut margin: Option<f64> = None;
    let mut max_profile: Option<usize> = None;
    let mut identity: Option<IdentityMode> = None;
    let mut counts: Vec<(StrategyKind, usize)> = Vec::new();
    let mut holdout_k: Option<usize> = None;
    let mut prewarm = false;
    let mut out_path: Option<String> = None;
    let mut json_output = false;
    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = Some(flag_value(&args, i));
                i += 2;
            }
            "--seed" => {
                seed = Some(flag_value(&args, i));
                i += 2;
            }
            "--threshold" => {
                threshold = Some(flag_value(&args, i));
                i += 2;
            }
            "--margin" => {
                margin = Some(flag_value(&args, i));
                i += 2;
            }
            "--max-profile" => {
                max_profile = Some(flag_value(&args, i));
                i += 2;
            }
            "--identity" => {
                let mode: String = flag_value(&args, i);
                identity = Some(match mode.as_str() {
                    "profile" => IdentityMode::Profile,
                    "user" => IdentityMode::User,
                    other => fail(format!("--identity expects profile or user, got '{}'", other)),
                });
                i += 2;
            }
            "--s1" | "--s2" | "--s3" | "--s4" | "--naive" => {
                let kind: StrategyKind = args[i]
                    .trim_start_matches("--")
                    .parse()
                    .unwrap_or_else(|e: String| fail(e));
                counts.push((kind, flag_value(&args, i)));
                i += 2;
            }
            "--holdout" => {
                holdout_k = Some(flag_value(&args, i));
                i += 2;
            }
            "--prewarm" => {
                prewarm = true;
                i += 1;
            }
            "--out" => {
                out_path = Some(flag_value(&args, i));
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    let mut config = match &config_path {
        Some(path) => SamplerConfig::load_file(path).unwrap_or_else(|e| fail(e)),
        None => SamplerConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(t) = threshold {
        config.threshold = t;
    }
    if let Some(m) = margin {
        config.confidence_margin = m;
    }
    if max_profile.is_some() {
        config.max_profile_size = max_profile;
    }
    if let Some(mode) = identity {
        config.identity = mode;
    }
    if let Err(e) = config.validate() {
        fail(e);
    }
    if counts.is_empty() {
        counts.push((StrategyKind::ProfilePositive, 1));
    }

    // Load embeddings, metadata and interactions
    let load_start = Instant::now();
    let named = load_embeddings_file(embeddings_path).unwrap_or_else(|e| fail(e));
    let items = load_items_file(items_path).unwrap_or_else(|e| fail(e));
    let catalog = build_catalog(&items, &named).unwrap_or_else(|e| fail(e));
    let mut records = load_interactions_file(interactions_path).unwrap_or_else(|e| fail(e));

    let mut holdout_rows = 0;
    if let Some(k) = holdout_k {
        let marked = mark_evaluation_rows(&records, Some(k));
        let (evaluation, training) = holdout(&marked);
        log::info!(
            "held out {} evaluation rows, {} interactions left for training",
            evaluation.len(),
            training.len()
        );
        holdout_rows = evaluation.len();
        records = training;
    }
    let interactions =
        InteractionLog::from_records(&records, &named.id_to_index).unwrap_or_else(|e| fail(e));
    let load_ms = load_start.elapsed().as_millis();

    let catalog_json = CatalogJson {
        items: catalog.len(),
        clusters: catalog.cluster_count(),
        artists: catalog.artist_count(),
        users: interactions.len(),
        interactions: interactions.total_interactions(),
    };

    let index_to_id = named.index_to_id;
    let mut engine = SamplingEngine::new(
        config.clone(),
        Arc::new(catalog),
        Arc::new(named.embeddings),
        Arc::new(interactions),
    )
    .unwrap_or_else(|e| fail(e));

    // Build and run the plan
    let plan = counts
        .iter()
        .fold(SamplingPlan::new().with_prewarm(prewarm), |plan, &(kind, count)| {
            plan.with_step(kind, count)
        });
    let sampling_start = Instant::now();
    let mut registry = InMemoryRegistry::new();
    let result = plan
        .execute(&mut engine, &mut registry)
        .unwrap_or_else(|e| fail(e));
    let sampling_ms = sampling_start.elapsed().as_millis();

    if let Some(path) = &out_path {
        if let Err(e) = write_triples(path, &result, &index_to_id) {
            fail(format!("failed to write '{}': {}", path, e));
        }
    }

    if json_output {
        let run = RunJson {
            generated_at: Utc::now().to_rfc3339(),
            config,
            load_ms,
            sampling_ms,
            catalog: catalog_json,
            holdout_rows,
            steps: result.steps.clone(),
            stats: result.stats,
            prewarmed_pairs: result.prewarmed_pairs,
            registry_size: result.registry_size,
            similarity_cache: engine.scorer().similarity().stats(),
            score_cache: engine.scorer().stats(),
            duplicate_checks: engine.scorer().similarity().duplicate_count(),
            output: out_path,
        };
        match serde_json::to_string_pretty(&run) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        }
    } else {
        print_human(&result, &catalog_json, &engine, holdout_rows, load_ms, sampling_ms);
    }
}

fn write_triples(path: &str, result: &PlanResult, index_to_id: &[String]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for t in &result.triples {
        let line = TripleJson {
            profile: t.profile.iter().map(|&i| index_to_id[i].as_str()).collect(),
            positive: &index_to_id[t.positive],
            negative: &index_to_id[t.negative],
            user: t.user,
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }
    out.flush()
}

fn print_human(
    result: &PlanResult,
    catalog: &CatalogJson,
    engine: &SamplingEngine,
    holdout_rows: usize,
    load_ms: u128,
    sampling_ms: u128,
) {
    let now = Utc::now().format("%Y-%m-%d %H:%M UTC");
    println!("artrank sampling run - {}", now);
    println!(
        "Catalog: {} items, {} clusters, {} artists",
        catalog.items, catalog.clusters, catalog.artists
    );
    println!(
        "Interactions: {} users, {} interactions ({} held out)",
        catalog.users, catalog.interactions, holdout_rows
    );
    println!();

    for step in &result.steps {
        println!(
            "  {:<18} requested {:>5}  accepted {:>7}  rejected {:>7}  skipped {:>5}",
            step.kind.to_string(),
            step.requested,
            step.stats.accepted,
            step.stats.rejected(),
            step.stats.exhausted
        );
    }
    println!();

    let similarity = engine.scorer().similarity();
    println!(
        "Triples: {} (registry {}, prewarmed pairs {})",
        result.triples.len(),
        result.registry_size,
        result.prewarmed_pairs
    );
    println!(
        "Similarity cache: {} entries, {} hits, {} misses, {} duplicates",
        similarity.len(),
        similarity.stats().hits,
        similarity.stats().misses,
        similarity.duplicate_count()
    );
    println!(
        "Score cache: {} entries, {} hits, {} misses",
        engine.scorer().len(),
        engine.scorer().stats().hits,
        engine.scorer().stats().misses
    );
    println!("Loaded in {}ms, sampled in {}ms", load_ms, sampling_ms);
}
