use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tally_core::{
    AnalysisKey, DatasetName, EventCategory, EventEnergyScale, EventRegion, EventSubCategory,
    Sweep,
};

fn bench_datasets() -> Vec<DatasetName> {
    (0..20)
        .map(|i| DatasetName::new(format!("Sample_{i}")).expect("valid dataset name"))
        .collect()
}

fn bench_full_sweep(c: &mut Criterion) {
    let datasets = bench_datasets();

    c.bench_function("sweep/full_product", |b| {
        b.iter(|| {
            let keys = Sweep::new()
                .over(EventCategory::ALL)
                .and_then(|s| s.over(EventSubCategory::ALL))
                .and_then(|s| s.over(EventRegion::ALL))
                .and_then(|s| s.over(EventEnergyScale::ALL))
                .and_then(|s| s.over(black_box(&datasets)))
                .expect("distinct dimensions")
                .into_keys();
            black_box(keys.len());
        });
    });
}

fn bench_key_render(c: &mut Criterion) {
    let key = AnalysisKey::new()
        .set(EventCategory::TwoJetsTwoBtag)
        .set(EventSubCategory::MassWindow)
        .set(EventRegion::OsIsolated)
        .set(EventEnergyScale::Central)
        .set(DatasetName::new("DYJets").expect("valid dataset name"));

    c.bench_function("key/render", |b| {
        b.iter(|| black_box(black_box(&key).to_string()));
    });

    c.bench_function("key/parse", |b| {
        let rendered = key.to_string();
        b.iter(|| black_box(black_box(rendered.as_str()).parse::<AnalysisKey>()));
    });
}

criterion_group!(benches, bench_full_sweep, bench_key_render);
criterion_main!(benches);
