//! Hierarchical prior document types.
//!
//! The document is a flat JSON object written by the calibration tool:
//!
//! ```json
//! {
//!   "prior_Health_given_InGeneralWard": [30.0, 60.0, 10.0],
//!   "prior_Die_after_Declining_InGeneralWard": [90.0, 5.0, 5.0],
//!   "prior_duration_Recovering_InGeneralWard": {
//!     "lam": {"lower": 1, "upper": 22, "mean": 6.0, "stddev": 2.0},
//!     "tau": {"mean": 0.0, "stddev": 0.5}
//!   }
//! }
//! ```
//!
//! Keys that are not hyperparameter groups are preserved as-is and ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::states::{ClinicalState, HealthOutcome};
use crate::validate::{
    validate_concentration, validate_duration, ValidationError, ValidationResult,
};

/// Complete prior document keyed by hyperparameter group name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorSpec {
    entries: BTreeMap<String, PriorEntry>,
}

/// One top-level entry of the prior document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriorEntry {
    /// Dirichlet concentration vector.
    Concentration(Vec<f64>),
    /// Duration hyperparameters.
    Duration(DurationPrior),
    /// Anything else (comments, calibration bookkeeping, malformed groups).
    Other(serde_json::Value),
}

impl PriorEntry {
    fn kind(&self) -> &'static str {
        match self {
            PriorEntry::Concentration(_) => "concentration vector",
            PriorEntry::Duration(_) => "duration group",
            PriorEntry::Other(_) => "unrecognized value",
        }
    }
}

/// Hyperparameters of the discrete stay-duration law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationPrior {
    pub lam: LamPrior,
    pub tau: TauPrior,
}

impl DurationPrior {
    /// Length of the duration support, `floor(upper)`.
    pub fn support_len(&self) -> usize {
        self.lam.upper.floor().max(0.0) as usize
    }
}

/// Truncated-normal prior on the Poisson rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LamPrior {
    pub lower: f64,
    pub upper: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// Normal prior on the log10 temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TauPrior {
    pub mean: f64,
    pub stddev: f64,
}

impl PriorSpec {
    /// Load a prior document from a JSON file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str(&content)
    }

    /// Parse a prior document from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, entry: PriorEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&PriorEntry> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validated concentration vector over `{Decline, Recover, other}` for `state`.
    pub fn health_transition(&self, state: ClinicalState) -> ValidationResult<&[f64]> {
        self.concentration(&state.health_prior_key())
    }

    /// Validated death-after-decline concentration vector for `state`.
    ///
    /// The ventilated state has no such group; asking for it is a missing field.
    pub fn death_after_decline(&self, state: ClinicalState) -> ValidationResult<&[f64]> {
        self.concentration(&state.death_prior_key())
    }

    /// Validated duration hyperparameters for `health` in `state`.
    pub fn duration(
        &self,
        health: HealthOutcome,
        state: ClinicalState,
    ) -> ValidationResult<DurationPrior> {
        let key = state.duration_prior_key(health);
        match self.entries.get(&key) {
            None => Err(ValidationError::MissingField(key)),
            Some(PriorEntry::Duration(group)) => {
                validate_duration(&key, group)?;
                Ok(*group)
            }
            Some(PriorEntry::Other(value)) => {
                // Re-run the typed parse to surface which hyperparameter is absent.
                let message = match serde_json::from_value::<DurationPrior>(value.clone()) {
                    Err(e) => e.to_string(),
                    Ok(_) => "unrecognized duration group".to_string(),
                };
                Err(ValidationError::InvalidValue {
                    field: key,
                    message,
                })
            }
            Some(other) => Err(ValidationError::InvalidValue {
                field: key,
                message: format!("expected duration group, got {}", other.kind()),
            }),
        }
    }

    fn concentration(&self, key: &str) -> ValidationResult<&[f64]> {
        match self.entries.get(key) {
            None => Err(ValidationError::MissingField(key.to_string())),
            Some(PriorEntry::Concentration(alpha)) => {
                validate_concentration(key, alpha)?;
                Ok(alpha)
            }
            Some(other) => Err(ValidationError::InvalidValue {
                field: key.to_string(),
                message: format!("expected concentration vector, got {}", other.kind()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "prior_Health_given_InGeneralWard": [30.0, 60.0, 10.0],
        "prior_Die_after_Declining_InGeneralWard": [90.0, 5.0, 5.0],
        "prior_duration_Recovering_InGeneralWard": {
            "lam": {"lower": 1, "upper": 22, "mean": 6.0, "stddev": 2.0},
            "tau": {"mean": 0.0, "stddev": 0.5}
        },
        "prior_duration_Declining_InGeneralWard": {
            "lam": {"lower": 1, "upper": 22, "mean": 3.0},
            "tau": {"mean": 0.0, "stddev": 0.5}
        },
        "_comment": "calibrated against CDC tables"
    }"#;

    #[test]
    fn test_parse_minimal_priors() {
        let spec = PriorSpec::from_str(MINIMAL).unwrap();
        assert_eq!(spec.len(), 5);
        let ward = ClinicalState::InGeneralWard;
        assert_eq!(spec.health_transition(ward).unwrap(), &[30.0, 60.0, 10.0]);
        assert_eq!(spec.death_after_decline(ward).unwrap()[1], 5.0);

        let dur = spec.duration(HealthOutcome::Recovering, ward).unwrap();
        assert_eq!(dur.support_len(), 22);
        assert_eq!(dur.tau.stddev, 0.5);
        assert!(matches!(spec.get("_comment"), Some(PriorEntry::Other(_))));
    }

    #[test]
    fn test_missing_group_is_reported_by_key() {
        let spec = PriorSpec::from_str(MINIMAL).unwrap();
        let err = spec
            .health_transition(ClinicalState::OffVentInICU)
            .unwrap_err();
        assert!(
            matches!(err, ValidationError::MissingField(ref k) if k == "prior_Health_given_OffVentInICU")
        );
    }

    #[test]
    fn test_missing_hyperparameter_names_the_field() {
        let spec = PriorSpec::from_str(MINIMAL).unwrap();
        let err = spec
            .duration(HealthOutcome::Declining, ClinicalState::InGeneralWard)
            .unwrap_err();
        match err {
            ValidationError::InvalidValue { field, message } => {
                assert_eq!(field, "prior_duration_Declining_InGeneralWard");
                assert!(message.contains("stddev"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let mut spec = PriorSpec::default();
        spec.insert(
            "prior_Health_given_InGeneralWard",
            PriorEntry::Other(serde_json::json!(3.0)),
        );
        assert!(matches!(
            spec.health_transition(ClinicalState::InGeneralWard),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            PriorSpec::from_str("{ not json"),
            Err(ValidationError::ParseError(_))
        ));
    }
}
