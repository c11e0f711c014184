//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::priors::{DurationPrior, PriorSpec};
use crate::states::{ClinicalState, HealthOutcome};

/// Number of outcomes in a transition concentration vector: `{Decline, Recover, other}`.
pub const TRANSITION_OUTCOMES: usize = 3;

/// Longest duration support (in days) a prior may declare.
pub const MAX_DURATION_SUPPORT: usize = 10_000;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Config not found: {0}")]
    NotFound(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::NotFound(_) => 62,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

/// Validate every hyperparameter group needed to sample `states`.
///
/// Stops at the first invalid group.
pub fn validate_prior_spec(spec: &PriorSpec, states: &[ClinicalState]) -> ValidationResult<()> {
    for &state in states {
        spec.health_transition(state)?;
        if !state.is_ventilated() {
            spec.death_after_decline(state)?;
        }
        for health in HealthOutcome::ALL {
            spec.duration(health, state)?;
        }
    }
    Ok(())
}

/// Validate a Dirichlet concentration vector.
pub(crate) fn validate_concentration(field: &str, alpha: &[f64]) -> ValidationResult<()> {
    if alpha.len() != TRANSITION_OUTCOMES {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!(
                "Must have {} components, got {}",
                TRANSITION_OUTCOMES,
                alpha.len()
            ),
        });
    }

    for (i, &a) in alpha.iter().enumerate() {
        if !a.is_finite() || a <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("{}[{}]", field, i),
                message: format!("Must be positive, got {}", a),
            });
        }
    }

    Ok(())
}

/// Validate duration hyperparameters.
pub(crate) fn validate_duration(field: &str, group: &DurationPrior) -> ValidationResult<()> {
    let lam = &group.lam;
    let tau = &group.tau;

    for (name, value) in [
        ("lam.lower", lam.lower),
        ("lam.upper", lam.upper),
        ("lam.mean", lam.mean),
        ("lam.stddev", lam.stddev),
        ("tau.mean", tau.mean),
        ("tau.stddev", tau.stddev),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.{}", field, name),
                message: format!("Must be finite, got {}", value),
            });
        }
    }

    if lam.lower >= lam.upper {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.lam", field),
            message: format!("lower ({}) must be < upper ({})", lam.lower, lam.upper),
        });
    }

    if lam.lower < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.lam.lower", field),
            message: format!("Poisson rate bound must be non-negative, got {}", lam.lower),
        });
    }

    if group.support_len() == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.lam.upper", field),
            message: format!("Duration support is empty for upper = {}", lam.upper),
        });
    }

    if group.support_len() > MAX_DURATION_SUPPORT {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.lam.upper", field),
            message: format!(
                "Duration support of {} days exceeds {}",
                lam.upper, MAX_DURATION_SUPPORT
            ),
        });
    }

    if lam.stddev <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.lam.stddev", field),
            message: format!("Must be positive, got {}", lam.stddev),
        });
    }

    if tau.stddev <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.tau.stddev", field),
            message: format!("Must be positive, got {}", tau.stddev),
        });
    }

    Ok(())
}
