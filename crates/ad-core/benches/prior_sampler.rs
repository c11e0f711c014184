//! Criterion benchmarks for `ad-core`.
//!
//! Covers the two hot paths of a `params` run: prior-predictive sampling
//! and band computation over the resulting draws.

use ad_config::{ClinicalState, PriorSpec};
use ad_core::bands::PercentileBandComputer;
use ad_core::sampler::PriorPredictiveSampler;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn prior(upper: f64) -> PriorSpec {
    let mut doc = serde_json::Map::new();
    for state in ClinicalState::ALL {
        doc.insert(state.health_prior_key(), serde_json::json!([30.0, 60.0, 10.0]));
        if !state.is_ventilated() {
            doc.insert(state.death_prior_key(), serde_json::json!([90.0, 5.0, 5.0]));
        }
        for health in ["Recovering", "Declining"] {
            doc.insert(
                format!("prior_duration_{}_{}", health, state),
                serde_json::json!({
                    "lam": {"lower": 1.0, "upper": upper, "mean": upper / 3.0, "stddev": 2.0},
                    "tau": {"mean": 0.0, "stddev": 0.5}
                }),
            );
        }
    }
    PriorSpec::from_str(&serde_json::Value::Object(doc).to_string()).expect("valid prior")
}

fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("prior_sampler");
    group.sample_size(20);

    for (name, upper, draws) in [("short_stays", 22.0, 1000), ("long_stays", 60.0, 1000)] {
        let spec = prior(upper);
        group.bench_with_input(BenchmarkId::new("sample_all_states", name), &draws, |b, &n| {
            let sampler = PriorPredictiveSampler::new(&spec);
            let mut rng = StdRng::seed_from_u64(11);
            b.iter(|| {
                black_box(
                    sampler
                        .sample(&ClinicalState::ALL, n, &mut rng)
                        .expect("sampling succeeds"),
                )
            });
        });
    }

    group.finish();
}

fn bench_bands(c: &mut Criterion) {
    let spec = prior(22.0);
    let mut rng = StdRng::seed_from_u64(5);
    let set = PriorPredictiveSampler::new(&spec)
        .sample(&ClinicalState::ALL, 1000, &mut rng)
        .expect("sampling succeeds");
    let computer = PercentileBandComputer::default();

    c.bench_function("prior_bands_all_parameters", |b| {
        b.iter(|| {
            for (_, draws) in set.iter() {
                black_box(computer.prior(draws));
            }
        });
    });
}

criterion_group!(benches, bench_sampler, bench_bands);
criterion_main!(benches);
