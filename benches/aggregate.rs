use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use sales_report::breakdown::Breakdown;
use sales_report::catalog::SynonymCatalog;
use sales_report::filter::{FilterCriteria, FilterSelection, apply_filters};
use sales_report::ingest::{LoadOptions, load_table};
use sales_report::pipeline::{Analyzer, MappingOptions, resolve_mapping};
use sales_report::schema::standardize;
use sales_report::stats::Kpis;
use tempfile::TempDir;

fn generate_sales(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("sales.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "Date,CA,Marge,Produit,Part,Client").expect("header");
    let products = ["Auto", "Habitation", "Voyage", "Sante", "Vie"];
    for i in 0..rows {
        let day = (i % 28) + 1;
        let month = (i % 12) + 1;
        let revenue = 80.0 + (i % 97) as f64 * 3.25;
        writeln!(
            file,
            "{day:02}/{month:02}/2023,{revenue},{},{},0.35,Agence {}",
            revenue * 0.18,
            products[i % products.len()],
            i % 40
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_aggregate(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_sales(50_000);
    let raw = load_table(&csv_path, &LoadOptions::default()).expect("load");
    let mapping = resolve_mapping(&raw, &SynonymCatalog::builtin(), &MappingOptions::default())
        .expect("mapping");
    let table = standardize(&raw, &mapping).expect("standardize");
    let criteria = FilterCriteria::full_range(&table);
    let narrowed = FilterSelection {
        search: Some("agence 1".to_string()),
        ..Default::default()
    };

    let mut group = c.benchmark_group("aggregate");

    group.bench_function("standardize", |b| {
        b.iter(|| standardize(&raw, &mapping).expect("standardize"));
    });

    group.bench_function("filter_full_range", |b| {
        b.iter(|| apply_filters(&table, &criteria));
    });

    let filtered = apply_filters(&table, &criteria);
    group.bench_function("kpis_and_breakdown", |b| {
        b.iter(|| (Kpis::compute(&filtered), Breakdown::compute(&filtered)));
    });

    group.bench_function("full_analysis_search", |b| {
        b.iter_batched(
            Analyzer::default,
            |analyzer| analyzer.run(&table, &narrowed),
            BatchSize::SmallInput,
        );
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
