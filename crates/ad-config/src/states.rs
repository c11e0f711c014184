//! Clinical state and health outcome vocabulary.
//!
//! Names match the keys written by the calibration tool, so `Display`
//! output is used verbatim when building document keys.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Hospital compartments a patient can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClinicalState {
    InGeneralWard,
    OffVentInICU,
    /// Ventilated ICU. Has no death-after-decline prior.
    OnVentInICU,
}

impl ClinicalState {
    /// All states in model order.
    pub const ALL: [ClinicalState; 3] = [
        ClinicalState::InGeneralWard,
        ClinicalState::OffVentInICU,
        ClinicalState::OnVentInICU,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalState::InGeneralWard => "InGeneralWard",
            ClinicalState::OffVentInICU => "OffVentInICU",
            ClinicalState::OnVentInICU => "OnVentInICU",
        }
    }

    /// Whether this is the ventilated-ICU state.
    pub fn is_ventilated(&self) -> bool {
        matches!(self, ClinicalState::OnVentInICU)
    }

    /// Key of the Dirichlet prior over `{Decline, Recover, other}`.
    pub fn health_prior_key(&self) -> String {
        format!("prior_Health_given_{}", self)
    }

    /// Key of the Dirichlet prior over death after declining.
    pub fn death_prior_key(&self) -> String {
        format!("prior_Die_after_Declining_{}", self)
    }

    /// Key of the duration hyperparameter group for `health` in this state.
    pub fn duration_prior_key(&self, health: HealthOutcome) -> String {
        format!("prior_duration_{}_{}", health, self)
    }
}

impl std::fmt::Display for ClinicalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClinicalState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InGeneralWard" => Ok(ClinicalState::InGeneralWard),
            "OffVentInICU" => Ok(ClinicalState::OffVentInICU),
            "OnVentInICU" => Ok(ClinicalState::OnVentInICU),
            _ => Err(format!("unknown clinical state: {}", s)),
        }
    }
}

/// Direction of a patient's next transition out of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthOutcome {
    Recovering,
    Declining,
}

impl HealthOutcome {
    pub const ALL: [HealthOutcome; 2] = [HealthOutcome::Recovering, HealthOutcome::Declining];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthOutcome::Recovering => "Recovering",
            HealthOutcome::Declining => "Declining",
        }
    }
}

impl std::fmt::Display for HealthOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Recovering" => Ok(HealthOutcome::Recovering),
            "Declining" => Ok(HealthOutcome::Declining),
            _ => Err(format!("unknown health outcome: {}", s)),
        }
    }
}
