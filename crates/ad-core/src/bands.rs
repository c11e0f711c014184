//! Percentile bands for prior/posterior comparison.
//!
//! A band is `{mean, lower, upper}` over a 1-D sample, with percentiles from
//! linear interpolation between order statistics. Matrix-shaped draws are
//! banded column-wise so prior and posterior line up per support position.

use ad_math::{mean, percentile_sorted};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::aggregate::{AggregatedDistribution, AggregatedValue};
use crate::params::{ParamKind, DURATION_SCALAR_KEYS};
use crate::samples::ParamValue;
use crate::sampler::{DrawMatrix, PriorDraws, PriorPredictiveSet};

/// Default lower percentile of the central interval.
pub const DEFAULT_LOW_PERCENTILE: f64 = 2.5;
/// Default upper percentile of the central interval.
pub const DEFAULT_HIGH_PERCENTILE: f64 = 97.5;

#[derive(Debug, Error, PartialEq)]
pub enum BandError {
    #[error("invalid percentile interval [{low}, {high}]: need 0 <= low <= high <= 100")]
    InvalidPercentile { low: f64, high: f64 },
}

/// Mean and percentile interval of a 1-D sample. NaN fields for empty input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarBand {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Per-position bands over an ordered support.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorBand {
    /// Support labels (day index as written in the source).
    pub support: Vec<String>,
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl VectorBand {
    fn with_capacity(n: usize) -> Self {
        Self {
            support: Vec::with_capacity(n),
            mean: Vec::with_capacity(n),
            lower: Vec::with_capacity(n),
            upper: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, label: String, band: ScalarBand) {
        self.support.push(label);
        self.mean.push(band.mean);
        self.lower.push(band.lower);
        self.upper.push(band.upper);
    }

    pub fn len(&self) -> usize {
        self.support.len()
    }

    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }
}

/// Bands of one parameter from one source (prior or posterior).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterBands {
    Scalar {
        #[serde(flatten)]
        band: ScalarBand,
        /// Number of values the band was computed from.
        count: usize,
    },
    Vector {
        #[serde(flatten)]
        band: VectorBand,
        /// Scalar sub-keys of a nested value (`lam`, `tau`).
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        scalars: BTreeMap<String, ScalarBand>,
    },
}

/// Computes bands for a fixed percentile interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileBandComputer {
    low: f64,
    high: f64,
}

impl Default for PercentileBandComputer {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_PERCENTILE,
            high: DEFAULT_HIGH_PERCENTILE,
        }
    }
}

impl PercentileBandComputer {
    pub fn new(low: f64, high: f64) -> Result<Self, BandError> {
        let valid = low.is_finite() && high.is_finite() && 0.0 <= low && low <= high && high <= 100.0;
        if !valid {
            return Err(BandError::InvalidPercentile { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Band over a 1-D sample.
    pub fn scalar(&self, values: &[f64]) -> ScalarBand {
        if values.iter().any(|v| v.is_nan()) {
            return ScalarBand {
                mean: f64::NAN,
                lower: f64::NAN,
                upper: f64::NAN,
            };
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        ScalarBand {
            mean: mean(values),
            lower: percentile_sorted(&sorted, self.low),
            upper: percentile_sorted(&sorted, self.high),
        }
    }

    /// Column-wise bands of an N × L draw matrix, labelled `0..L`.
    pub fn columns(&self, matrix: &DrawMatrix) -> VectorBand {
        let mut out = VectorBand::with_capacity(matrix.cols());
        for j in 0..matrix.cols() {
            out.push(j.to_string(), self.scalar(&matrix.column(j)));
        }
        out
    }

    /// Per-key bands of a nested distribution.
    ///
    /// Keys are ordered numerically when they parse as numbers, with any
    /// other keys after them in lexical order. `lam`/`tau` are split out as
    /// scalar bands.
    pub fn nested(&self, map: &BTreeMap<String, Vec<f64>>) -> (VectorBand, BTreeMap<String, ScalarBand>) {
        let mut scalars = BTreeMap::new();
        let mut keys: Vec<&String> = Vec::with_capacity(map.len());
        for key in map.keys() {
            if DURATION_SCALAR_KEYS.contains(&key.as_str()) {
                scalars.insert(key.clone(), self.scalar(&map[key]));
            } else {
                keys.push(key);
            }
        }
        keys.sort_by(|a, b| support_order(a, b));

        let mut band = VectorBand::with_capacity(keys.len());
        for key in keys {
            band.push(key.clone(), self.scalar(&map[key]));
        }
        (band, scalars)
    }

    pub fn prior(&self, draws: &PriorDraws) -> ParameterBands {
        match draws {
            PriorDraws::Scalar(values) => ParameterBands::Scalar {
                band: self.scalar(values),
                count: values.len(),
            },
            PriorDraws::Matrix(m) => ParameterBands::Vector {
                band: self.columns(m),
                scalars: BTreeMap::new(),
            },
        }
    }

    pub fn posterior(&self, value: &AggregatedValue) -> ParameterBands {
        match value {
            AggregatedValue::Scalar(values) => ParameterBands::Scalar {
                band: self.scalar(values),
                count: values.len(),
            },
            AggregatedValue::Nested(map) => {
                let (band, scalars) = self.nested(map);
                ParameterBands::Vector { band, scalars }
            }
        }
    }
}

fn support_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Prior and posterior bands of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterComparison {
    pub name: String,
    /// Short plot label when the name is a known model parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Absent when the prior set has no draws for this parameter.
    pub prior: Option<ParameterBands>,
    pub posterior: ParameterBands,
    /// Reference value from a known-parameters document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth: Option<ParamValue>,
}

/// Compare every modelled posterior parameter against its prior draws.
///
/// Parameters the model does not have (the ventilated state's
/// death-after-decline placeholder) are left out.
pub fn compare_parameters(
    prior: Option<&PriorPredictiveSet>,
    posterior: &AggregatedDistribution,
    computer: &PercentileBandComputer,
) -> Vec<ParameterComparison> {
    let mut out = Vec::with_capacity(posterior.len());
    for (name, value) in posterior.iter() {
        let kind = name.parse::<ParamKind>().ok();
        if matches!(kind, Some(k) if !k.is_modelled()) {
            tracing::debug!(param = name, "skipping parameter with no model counterpart");
            continue;
        }
        let posterior = computer.posterior(value);
        let mut prior_bands = prior
            .and_then(|set| set.get(name))
            .map(|draws| computer.prior(draws));
        if let Some(bands) = prior_bands.as_mut() {
            align_support(bands, &posterior);
        }
        out.push(ParameterComparison {
            name: name.to_string(),
            label: kind.map(|k| k.label()),
            prior: prior_bands,
            posterior,
            truth: None,
        });
    }
    out
}

/// Give prior support positions the posterior's day labels.
///
/// Prior columns are positional; when both sides have the same length the
/// i-th prior column is the i-th posterior day.
fn align_support(prior: &mut ParameterBands, posterior: &ParameterBands) {
    if let (
        ParameterBands::Vector { band: p, .. },
        ParameterBands::Vector { band: q, .. },
    ) = (prior, posterior)
    {
        if p.len() == q.len() {
            p.support.clone_from(&q.support);
        }
    }
}

/// Attach reference values by parameter name.
pub fn attach_truth(
    comparisons: &mut [ParameterComparison],
    truth: &BTreeMap<String, ParamValue>,
) {
    for comparison in comparisons.iter_mut() {
        comparison.truth = truth.get(&comparison.name).cloned();
    }
}
