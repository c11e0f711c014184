//! End-to-end library tests: prior document → prior draws → posterior
//! aggregation → band comparison, plus properties of the core transforms.

use ad_config::{ClinicalState, HealthOutcome, PriorSpec};
use ad_core::aggregate::{MissingParameterPolicy, PosteriorAggregator};
use ad_core::bands::{compare_parameters, ParameterBands, PercentileBandComputer};
use ad_core::census::DerivedCountProjector;
use ad_core::params::ParamKind;
use ad_core::sampler::{PriorDraws, PriorPredictiveSampler};
use ad_core::samples::{NestedValue, ParamValue, ParameterSample, SampleCollection};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

fn prior_document(upper: f64, tau_sd: f64) -> PriorSpec {
    let mut doc = serde_json::Map::new();
    for state in ClinicalState::ALL {
        doc.insert(state.health_prior_key(), serde_json::json!([3.0, 5.0, 2.0]));
        if !state.is_ventilated() {
            doc.insert(state.death_prior_key(), serde_json::json!([95.0, 4.0, 1.0]));
        }
        for health in HealthOutcome::ALL {
            doc.insert(
                state.duration_prior_key(health),
                serde_json::json!({
                    "lam": {"lower": 1.0, "upper": upper, "mean": 4.0, "stddev": 2.0},
                    "tau": {"mean": 0.0, "stddev": tau_sd},
                }),
            );
        }
    }
    serde_json::from_value(serde_json::Value::Object(doc)).unwrap()
}

/// A posterior run as a calibration tool writes it: scalar probabilities and
/// nested duration pmfs with their rate and temperature.
fn posterior_run(seed: u64, support: usize) -> ParameterSample {
    let mut sample = ParameterSample::new();
    let shift = (seed % 7) as f64 / 100.0;
    for kind in ParamKind::sampled_for(&ClinicalState::ALL) {
        let value = if kind.is_duration() {
            let pmf = ad_math::tempered_poisson_pmf(3.0 + shift * 10.0, 0.0, support);
            let mut nested: BTreeMap<String, NestedValue> = pmf
                .iter()
                .enumerate()
                .map(|(k, p)| (k.to_string(), NestedValue::Number(*p)))
                .collect();
            nested.insert("lam".into(), NestedValue::Number(3.0 + shift * 10.0));
            nested.insert("tau".into(), NestedValue::Number(0.0));
            ParamValue::Nested(nested)
        } else {
            ParamValue::Number(0.5 + shift)
        };
        sample.insert(kind.name(), value);
    }
    sample.insert(
        "proba_Die_after_Declining_OnVentInICU".into(),
        ParamValue::Number(0.0),
    );
    sample
}

#[test]
fn prior_and_posterior_line_up_per_support_position() {
    let spec = prior_document(12.0, 0.2);
    let mut rng = StdRng::seed_from_u64(17);
    let prior = PriorPredictiveSampler::new(&spec)
        .sample(&ClinicalState::ALL, 400, &mut rng)
        .unwrap();

    let runs: SampleCollection = (0..25).map(|s| posterior_run(s, 12)).collect();
    let posterior = PosteriorAggregator::default().aggregate(&runs).unwrap();
    assert_eq!(posterior.num_runs(), 25);

    let comparisons =
        compare_parameters(Some(&prior), &posterior, &PercentileBandComputer::default());
    // the ventilated death placeholder is dropped
    assert_eq!(comparisons.len(), 11);

    for c in &comparisons {
        let prior = c.prior.as_ref().expect("every modelled parameter has prior draws");
        match (prior, &c.posterior) {
            (ParameterBands::Vector { band: p, .. }, ParameterBands::Vector { band: q, scalars }) => {
                assert_eq!(p.len(), 12, "{}", c.name);
                assert_eq!(q.len(), 12, "{}", c.name);
                assert_eq!(p.support, q.support);
                assert!(scalars.contains_key("lam") && scalars.contains_key("tau"));
                let total: f64 = q.mean.iter().sum();
                assert!((total - 1.0).abs() < 1e-9);
            }
            (ParameterBands::Scalar { count: n_prior, .. }, ParameterBands::Scalar { count, .. }) => {
                assert_eq!(*n_prior, 400);
                assert_eq!(*count, 25);
            }
            other => panic!("{}: prior and posterior shapes differ: {:?}", c.name, other),
        }
    }
}

#[test]
fn lenient_policy_survives_a_truncated_run() {
    let mut runs: Vec<ParameterSample> = (0..4).map(|s| posterior_run(s, 8)).collect();
    runs[2].remove("proba_Recovering_given_InGeneralWard");
    let runs = SampleCollection::new(runs);

    assert!(PosteriorAggregator::new(MissingParameterPolicy::Strict)
        .aggregate(&runs)
        .is_err());

    let agg = PosteriorAggregator::new(MissingParameterPolicy::Lenient)
        .aggregate(&runs)
        .unwrap();
    let values = agg
        .get("proba_Recovering_given_InGeneralWard")
        .and_then(|v| v.as_scalar())
        .unwrap();
    assert_eq!(values.len(), 3);
}

#[test]
fn invalid_duration_group_reports_key() {
    let mut doc = serde_json::to_value(prior_document(10.0, 0.1)).unwrap();
    doc["prior_duration_Recovering_OnVentInICU"]["lam"]["stddev"] = serde_json::json!(0.0);
    let spec: PriorSpec = serde_json::from_value(doc).unwrap();

    let err = PriorPredictiveSampler::new(&spec)
        .sample(&ClinicalState::ALL, 10, &mut StdRng::seed_from_u64(1))
        .unwrap_err();
    assert!(
        err.to_string().contains("prior_duration_Recovering_OnVentInICU"),
        "{}",
        err
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every sampled pmf row sums to one, for any valid hyperparameters.
    #[test]
    fn sampled_pmfs_are_normalized(
        upper in 2.0..40.0f64,
        tau_sd in 0.01..1.0f64,
        draws in 1usize..30,
        seed in any::<u64>(),
    ) {
        let spec = prior_document(upper, tau_sd);
        let mut rng = StdRng::seed_from_u64(seed);
        let set = PriorPredictiveSampler::new(&spec)
            .sample(&[ClinicalState::InGeneralWard], draws, &mut rng)
            .unwrap();
        for (_, d) in set.iter() {
            prop_assert_eq!(d.num_draws(), draws);
            if let PriorDraws::Matrix(m) = d {
                prop_assert_eq!(m.cols(), upper.floor() as usize);
                for row in m.iter_rows() {
                    let total: f64 = row.iter().sum();
                    prop_assert!((total - 1.0).abs() < 1e-9);
                }
            }
        }
    }

    /// Aggregated length equals the sum of per-run element counts.
    #[test]
    fn aggregation_length_law(lengths in prop::collection::vec(0usize..6, 1..20)) {
        let runs: SampleCollection = lengths
            .iter()
            .map(|&n| {
                let mut s = ParameterSample::new();
                s.insert("p".into(), ParamValue::Vector(vec![0.5; n]));
                s
            })
            .collect();
        let agg = PosteriorAggregator::default().aggregate(&runs).unwrap();
        let total: usize = lengths.iter().sum();
        prop_assert_eq!(agg.get("p").unwrap().as_scalar().unwrap().len(), total);
    }

    /// Occupied beds is the exact sum of the three ward columns.
    #[test]
    fn occupied_beds_is_exact_sum(
        ward in 0u32..100_000,
        off_vent in 0u32..10_000,
        on_vent in 0u32..10_000,
    ) {
        let row: BTreeMap<String, f64> = [
            ("n_InGeneralWard", ward as f64),
            ("n_OffVentInICU", off_vent as f64),
            ("n_OnVentInICU", on_vent as f64),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let out = DerivedCountProjector::new(["n_occupied_beds", "n_InICU"], true)
            .project(&row)
            .unwrap();
        prop_assert_eq!(out.get("n_occupied_beds"), Some((ward + off_vent + on_vent) as f64));
        prop_assert_eq!(out.get("n_InICU"), Some((off_vent + on_vent) as f64));
    }
}
