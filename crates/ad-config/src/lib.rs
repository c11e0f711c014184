//! ABC diagnostics configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the prior document and the post-calibration run config
//! - Clinical state / health outcome vocabulary and prior key naming
//! - Prior path resolution (CLI → env → XDG)
//! - Semantic validation of hyperparameter groups
//! - Content fingerprints so outputs can be traced to their inputs

pub mod fingerprint;
pub mod priors;
pub mod resolve;
pub mod run_config;
pub mod states;
pub mod validate;

pub use fingerprint::content_hash;
pub use priors::{DurationPrior, LamPrior, PriorEntry, PriorSpec, TauPrior};
pub use resolve::{load_prior, resolve_prior_path, ConfigSource, LoadedPrior};
pub use run_config::RunConfig;
pub use states::{ClinicalState, HealthOutcome};
pub use validate::{validate_prior_spec, ValidationError, ValidationResult, MAX_DURATION_SUPPORT};
