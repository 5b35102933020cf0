use assayfit::prelude::models::grid_search_initialize;
use assayfit::prelude::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::hint::black_box;

/// Twelve-point threefold dilution series around an ED50 of 30
fn noisy_curve(id: &str, seed: u64) -> Curve {
    let params = FourParameters::new(4.0, 1.2, 30.0, 96.0);
    let doses = data::simulate::dilution_series(0.1, 3.0, 12).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    data::simulate::logistic_curve(id, &params, &doses, 1.5, &mut rng).unwrap()
}

fn bench_grid_search(c: &mut Criterion) {
    let curve = noisy_curve("bench", 1);
    let mut group = c.benchmark_group("grid_search");
    for size in [5usize, 10, 15] {
        let config = SearchConfig::DEFAULT.with_grid(size, size, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            b.iter(|| {
                let fit = grid_search_initialize(
                    black_box(&curve),
                    Some(30.0),
                    None,
                    None,
                    config,
                    &FitMonitor::new(),
                );
                black_box(fit)
            });
        });
    }
    group.finish();
}

fn bench_full_fit(c: &mut Criterion) {
    let curve = noisy_curve("bench", 2);
    let orchestrator = FitOrchestrator::new();
    let seed = FourParameterFit::new().with_ed50_seed(30.0).unwrap();

    c.bench_function("fit_grid_and_refine", |b| {
        b.iter(|| {
            let fit = orchestrator.fit(black_box(&curve), &seed, &FitMonitor::new());
            black_box(fit)
        });
    });
}

fn bench_assay(c: &mut Criterion) {
    let curves = (0..16)
        .map(|i| noisy_curve(&format!("mol_{}", i), i))
        .collect();
    let assay = Assay::from_curves("bench", curves).unwrap();
    let seeds: HashMap<String, FourParameterFit> = assay
        .ids()
        .into_iter()
        .map(|id| {
            (
                id.to_string(),
                FourParameterFit::new().with_ed50_seed(30.0).unwrap(),
            )
        })
        .collect();
    let orchestrator = FitOrchestrator::new();

    c.bench_function("fit_assay_16_curves", |b| {
        b.iter(|| black_box(orchestrator.fit_assay(&assay, &seeds, &CancellationToken::new())));
    });
}

criterion_group!(benches, bench_grid_search, bench_full_fit, bench_assay);
criterion_main!(benches);
