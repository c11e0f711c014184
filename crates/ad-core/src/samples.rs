//! Posterior sample documents.
//!
//! A document is either one parameter-sample object or a list of them, one
//! per accepted calibration run:
//!
//! ```json
//! [
//!   {"proba_Recovering_given_InGeneralWard": 0.71,
//!    "pmf_duration_Declining_OnVentInICU": {"lam": 4.2, "tau": 0.1, "0": 0.02, "1": 0.08}},
//!   ...
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a sample document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sample document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Numeric payload inside a nested parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NestedValue {
    Number(f64),
    Vector(Vec<f64>),
}

impl NestedValue {
    pub fn values(&self) -> &[f64] {
        match self {
            NestedValue::Number(x) => std::slice::from_ref(x),
            NestedValue::Vector(v) => v,
        }
    }
}

/// One parameter's value in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Vector(Vec<f64>),
    /// Sub-key (duration index, `lam`, `tau`) to value.
    Nested(BTreeMap<String, NestedValue>),
}

impl ParamValue {
    pub fn is_nested(&self) -> bool {
        matches!(self, ParamValue::Nested(_))
    }

    /// Flat numeric view; None for nested values.
    pub fn flat_values(&self) -> Option<&[f64]> {
        match self {
            ParamValue::Number(x) => Some(std::slice::from_ref(x)),
            ParamValue::Vector(v) => Some(v),
            ParamValue::Nested(_) => None,
        }
    }

    pub(crate) fn shape_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) | ParamValue::Vector(_) => "flat",
            ParamValue::Nested(_) => "nested",
        }
    }
}

/// Parameter dictionary of one accepted run.
pub type ParameterSample = BTreeMap<String, ParamValue>;

/// Ordered per-run parameter samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SampleCollection {
    samples: Vec<ParameterSample>,
}

impl SampleCollection {
    pub fn new(samples: Vec<ParameterSample>) -> Self {
        Self { samples }
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let collection = Self::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            runs = collection.len(),
            "loaded posterior samples"
        );
        Ok(collection)
    }

    /// Parse a single sample object or a list of them.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let samples = if json.trim_start().starts_with('[') {
            serde_json::from_str::<Vec<ParameterSample>>(json)?
        } else {
            vec![serde_json::from_str::<ParameterSample>(json)?]
        };
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[ParameterSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: ParameterSample) {
        self.samples.push(sample);
    }
}

impl FromIterator<ParameterSample> for SampleCollection {
    fn from_iter<I: IntoIterator<Item = ParameterSample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_object_becomes_one_run() {
        let c = SampleCollection::from_json(r#"{"proba_Recovering_given_InGeneralWard": 0.4}"#)
            .unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(
            c.samples()[0]["proba_Recovering_given_InGeneralWard"],
            ParamValue::Number(0.4)
        );
    }

    #[test]
    fn list_keeps_run_order() {
        let c = SampleCollection::from_json(r#"[{"p": [0.3]}, {"p": [0.7]}]"#).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.samples()[0]["p"].flat_values().unwrap(), &[0.3]);
        assert_eq!(c.samples()[1]["p"].flat_values().unwrap(), &[0.7]);
    }

    #[test]
    fn nested_values_mix_numbers_and_vectors() {
        let c = SampleCollection::from_json(
            r#"{"pmf_duration_Recovering_InGeneralWard": {"lam": 3.5, "tau": -0.2, "0": 0.1, "1": [0.2, 0.3]}}"#,
        )
        .unwrap();
        let value = &c.samples()[0]["pmf_duration_Recovering_InGeneralWard"];
        assert!(value.is_nested());
        assert!(value.flat_values().is_none());
        match value {
            ParamValue::Nested(map) => {
                assert_eq!(map["lam"].values(), &[3.5]);
                assert_eq!(map["1"].values(), &[0.2, 0.3]);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        assert!(matches!(
            SampleCollection::from_json(r#"{"p": "high"}"#),
            Err(LoadError::Parse(_))
        ));
        assert!(SampleCollection::from_json("[1, 2]").is_err());
    }

    #[test]
    fn empty_list_loads_as_empty_collection() {
        let c = SampleCollection::from_json("[]").unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SampleCollection::from_file(Path::new("/nonexistent/samples.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
