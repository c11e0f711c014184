//! Fuzz target for posterior sample loading, aggregation and banding.

#![no_main]

use ad_core::aggregate::{MissingParameterPolicy, PosteriorAggregator};
use ad_core::bands::{compare_parameters, PercentileBandComputer};
use ad_core::samples::SampleCollection;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(collection) = SampleCollection::from_json(text) else {
        return;
    };

    let computer = PercentileBandComputer::default();
    for policy in [MissingParameterPolicy::Strict, MissingParameterPolicy::Lenient] {
        if let Ok(posterior) = PosteriorAggregator::new(policy).aggregate(&collection) {
            let _ = compare_parameters(None, &posterior, &computer);
        }
    }
});
