//! Posterior sample aggregation.
//!
//! Merges a collection of per-run parameter samples into one flat empirical
//! array per parameter (or per parameter and inner key for nested values).
//! Values are concatenated across runs; per-run provenance is dropped.
//!
//! The first run fixes the parameter names and their shapes. Later runs are
//! checked against it under a [`MissingParameterPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::samples::{ParamValue, ParameterSample, SampleCollection};

/// Errors raised while aggregating samples.
#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("sample collection is empty")]
    EmptyCollection,

    #[error("run {run} is missing parameter {name}")]
    MissingParameter { run: usize, name: String },

    #[error("run {run} has parameter {name} not present in run 0")]
    UnexpectedParameter { run: usize, name: String },

    #[error("run {run}: parameter {name} is {found} but run 0 has it {expected}")]
    ShapeMismatch {
        run: usize,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("run {run} is missing key {key} of parameter {name}")]
    MissingInnerKey {
        run: usize,
        name: String,
        key: String,
    },

    #[error("run {run} has key {key} of parameter {name} not present in run 0")]
    UnexpectedInnerKey {
        run: usize,
        name: String,
        key: String,
    },
}

pub type AggregationResult<T> = std::result::Result<T, AggregationError>;

/// How runs that disagree with run 0 are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParameterPolicy {
    /// Any missing or extra name, inner key or shape change is an error.
    #[default]
    Strict,
    /// Skip missing values and shape changes with a warning; ignore extras.
    Lenient,
}

/// Concatenated values of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregatedValue {
    Scalar(Vec<f64>),
    Nested(BTreeMap<String, Vec<f64>>),
}

impl AggregatedValue {
    fn empty_like(value: &ParamValue) -> Self {
        match value {
            ParamValue::Nested(inner) => AggregatedValue::Nested(
                inner.keys().map(|k| (k.clone(), Vec::new())).collect(),
            ),
            _ => AggregatedValue::Scalar(Vec::new()),
        }
    }

    fn shape_name(&self) -> &'static str {
        match self {
            AggregatedValue::Scalar(_) => "flat",
            AggregatedValue::Nested(_) => "nested",
        }
    }

    /// Flat array; None for nested values.
    pub fn as_scalar(&self) -> Option<&[f64]> {
        match self {
            AggregatedValue::Scalar(v) => Some(v),
            AggregatedValue::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&BTreeMap<String, Vec<f64>>> {
        match self {
            AggregatedValue::Scalar(_) => None,
            AggregatedValue::Nested(m) => Some(m),
        }
    }
}

/// Empirical distributions keyed by parameter name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedDistribution {
    num_runs: usize,
    params: BTreeMap<String, AggregatedValue>,
}

impl AggregatedDistribution {
    pub fn get(&self, name: &str) -> Option<&AggregatedValue> {
        self.params.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregatedValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of runs that were merged.
    pub fn num_runs(&self) -> usize {
        self.num_runs
    }
}

/// Flattens sample collections into [`AggregatedDistribution`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosteriorAggregator {
    policy: MissingParameterPolicy,
}

impl PosteriorAggregator {
    pub fn new(policy: MissingParameterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingParameterPolicy {
        self.policy
    }

    pub fn aggregate(&self, collection: &SampleCollection) -> AggregationResult<AggregatedDistribution> {
        self.aggregate_samples(collection.samples())
    }

    pub fn aggregate_samples(
        &self,
        samples: &[ParameterSample],
    ) -> AggregationResult<AggregatedDistribution> {
        let first = samples.first().ok_or(AggregationError::EmptyCollection)?;

        let mut params: BTreeMap<String, AggregatedValue> = first
            .iter()
            .map(|(name, value)| (name.clone(), AggregatedValue::empty_like(value)))
            .collect();

        for (run, sample) in samples.iter().enumerate() {
            for name in sample.keys() {
                if !params.contains_key(name) {
                    self.tolerate(AggregationError::UnexpectedParameter {
                        run,
                        name: name.clone(),
                    })?;
                }
            }

            for (name, acc) in params.iter_mut() {
                match sample.get(name) {
                    None => self.tolerate(AggregationError::MissingParameter {
                        run,
                        name: name.clone(),
                    })?,
                    Some(value) => self.merge(run, name, acc, value)?,
                }
            }
        }

        tracing::info!(
            runs = samples.len(),
            parameters = params.len(),
            policy = ?self.policy,
            "aggregated posterior samples"
        );

        Ok(AggregatedDistribution {
            num_runs: samples.len(),
            params,
        })
    }

    fn merge(
        &self,
        run: usize,
        name: &str,
        acc: &mut AggregatedValue,
        value: &ParamValue,
    ) -> AggregationResult<()> {
        match (acc, value) {
            (AggregatedValue::Scalar(values), value) if !value.is_nested() => {
                values.extend_from_slice(value.flat_values().unwrap_or_default());
            }
            (AggregatedValue::Nested(keys), ParamValue::Nested(inner)) => {
                for key in inner.keys() {
                    if !keys.contains_key(key) {
                        self.tolerate(AggregationError::UnexpectedInnerKey {
                            run,
                            name: name.to_string(),
                            key: key.clone(),
                        })?;
                    }
                }
                for (key, values) in keys.iter_mut() {
                    match inner.get(key) {
                        Some(v) => values.extend_from_slice(v.values()),
                        None => self.tolerate(AggregationError::MissingInnerKey {
                            run,
                            name: name.to_string(),
                            key: key.clone(),
                        })?,
                    }
                }
            }
            (acc, value) => {
                self.tolerate(AggregationError::ShapeMismatch {
                    run,
                    name: name.to_string(),
                    expected: acc.shape_name(),
                    found: value.shape_name(),
                })?;
            }
        }
        Ok(())
    }

    /// Strict: surface the error. Lenient: log and carry on.
    fn tolerate(&self, err: AggregationError) -> AggregationResult<()> {
        match self.policy {
            MissingParameterPolicy::Strict => Err(err),
            MissingParameterPolicy::Lenient => {
                match err {
                    AggregationError::UnexpectedParameter { .. }
                    | AggregationError::UnexpectedInnerKey { .. } => {
                        tracing::debug!(error = %err, "ignoring value absent from run 0");
                    }
                    _ => tracing::warn!(error = %err, "skipping sample value"),
                }
                Ok(())
            }
        }
    }
}
