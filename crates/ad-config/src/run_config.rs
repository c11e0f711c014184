//! Post-calibration run configuration.
//!
//! Only the training window length is consumed; the calibration tool writes
//! many other keys which are kept for round-tripping but otherwise ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// Run configuration written after ABC calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of leading timesteps used for training; later steps are forecast.
    pub num_training_timesteps: usize,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RunConfig {
    /// Load run config from a JSON file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str(&content)
    }

    /// Parse run config from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            if e.to_string().contains("missing field") {
                ValidationError::MissingField(format!("num_training_timesteps ({})", e))
            } else {
                ValidationError::ParseError(format!("Invalid JSON: {}", e))
            }
        })
    }
}
