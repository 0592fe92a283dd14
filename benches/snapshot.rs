use std::fmt::Write as _;

use churn_segments::{
    config::SourceOptions,
    dashboard::Snapshot,
    filter::{Segment, SegmentFilter},
    normalize::normalize_reader,
    segments::{NormalizedTable, RiskCategory},
};
use criterion::{Criterion, criterion_group, criterion_main};

fn generate_export(rows: usize) -> String {
    let mut contents =
        String::from("CustomerID;Country;TotalPrice;UnitPrice;Quantity;Recency;Churn;Predicted_Churn\n");
    for i in 0..rows {
        let country = match i % 4 {
            0 => "United Kingdom",
            1 => "Germany",
            2 => "France",
            _ => "EIRE",
        };
        let total = (i * 37 % 9_000) as f64 + 0.25;
        let quantity = i * 13 % 2_500;
        let recency = i * 7 % 374;
        writeln!(
            contents,
            "{id};{country};{total};1.5;{quantity};{recency};{churn};{predicted}",
            id = 10_000 + i,
            churn = u8::from(i % 3 == 0),
            predicted = u8::from(i % 5 < 2),
        )
        .expect("row");
    }
    contents
}

fn load(rows: usize) -> NormalizedTable {
    normalize_reader(generate_export(rows).as_bytes(), &SourceOptions::default())
        .expect("normalize")
}

fn bench_normalize(c: &mut Criterion) {
    let export = generate_export(20_000);
    c.bench_function("normalize_20k", |b| {
        b.iter(|| {
            normalize_reader(export.as_bytes(), &SourceOptions::default()).expect("normalize")
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let table = load(20_000);
    c.bench_function("snapshot_unfiltered_20k", |b| {
        b.iter(|| Snapshot::compute(&Segment::all(&table)))
    });
    let filter = SegmentFilter::all()
        .with_countries(["Germany", "France"])
        .with_risk_categories([RiskCategory::High]);
    c.bench_function("snapshot_filtered_20k", |b| {
        b.iter(|| Snapshot::compute(&filter.apply(&table)))
    });
}

criterion_group!(benches, bench_normalize, bench_snapshot);
criterion_main!(benches);
