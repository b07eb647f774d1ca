//! Similarity engine benchmarks: per-item rebuild and prediction reads at
//! varying co-occurrence densities.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use covisit::{MemoryStore, PredictionInput, Recommender, RecommenderConfig, Reprocess, SearchOptions};
use std::sync::Arc;
use std::time::Duration;

/// Deterministic spread of items over sets (no RNG dependency)
fn seeded_recommender(sets: u64, items_per_set: u64) -> Recommender<MemoryStore> {
    let config = RecommenderConfig::new("bench")
        .matrix("users", 3.0)
        .matrix("tags", 1.0)
        .similarity_limit(128)
        .reprocess_threads(1);
    let rec = Recommender::new(Arc::new(MemoryStore::new()), config).expect("recommender");

    let mut state = 0x2545_f491_4f6c_dd1du64;
    for set in 0..sets {
        let set_id = format!("s{set}");
        let members: Vec<String> = (0..items_per_set)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                format!("i{}", state % (sets * items_per_set / 2))
            })
            .collect();
        let refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let label = if set % 3 == 0 { "tags" } else { "users" };
        rec.add_to_matrix(label, &set_id, &refs, Reprocess::Deferred)
            .expect("add");
    }
    rec
}

fn bench_process_item(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_item");
    for &sets in &[10u64, 50, 200] {
        let rec = seeded_recommender(sets, 20);
        group.bench_with_input(BenchmarkId::from_parameter(sets), &sets, |b, _| {
            b.iter(|| rec.process_items(&["i1"]).expect("process"));
        });
    }
    group.finish();
}

fn bench_full_reprocess(c: &mut Criterion) {
    let rec = seeded_recommender(50, 20);
    c.bench_function("process_all_50x20", |b| {
        b.iter(|| rec.process_all().expect("process_all"));
    });
}

fn bench_predictions(c: &mut Criterion) {
    let rec = seeded_recommender(50, 20);
    rec.process_all().expect("process_all");
    let input = PredictionInput::items(["i1", "i2", "i3", "i4", "i5"]);
    let options = SearchOptions::new().limit(20);
    c.bench_function("predictions_5_inputs", |b| {
        b.iter(|| rec.predictions_with_scores(&input, &options).expect("predict"));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_process_item, bench_full_reprocess, bench_predictions
}
criterion_main!(benches);
