//! Fuzz target for prior document parsing and sampling.
//!
//! Any document that validates must sample without panicking.

#![no_main]

use ad_config::{validate_prior_spec, ClinicalState, PriorSpec};
use ad_core::sampler::PriorPredictiveSampler;
use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::SeedableRng;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(spec) = PriorSpec::from_str(text) else {
        return;
    };
    if validate_prior_spec(&spec, &ClinicalState::ALL).is_err() {
        return;
    }

    let mut rng = StdRng::seed_from_u64(0);
    let _ = PriorPredictiveSampler::new(&spec).sample(&ClinicalState::ALL, 2, &mut rng);
});
