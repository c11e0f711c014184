//! Error types for abc-diag.
//!
//! Each module owns its error enum; [`Error`] wraps them so the CLI can
//! classify any failure into a category and a stable exit code.
//!
//! Errors serialize to structured JSON on the CLI's error path:
//! ```json
//! {
//!   "code": 11,
//!   "category": "config",
//!   "message": "prior configuration error: Missing required field: prior_Health_given_InGeneralWard"
//! }
//! ```

use ad_config::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::AggregationError;
use crate::bands::BandError;
use crate::census::ProjectionError;
use crate::exit_codes::ExitCode;
use crate::forecast::ForecastError;
use crate::sampler::SamplerError;
use crate::samples::LoadError;
use crate::table::TableError;

pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid command-line values.
    Args,
    /// Prior or run configuration errors.
    Config,
    /// Malformed or inconsistent samples and tables.
    Data,
    /// File system errors.
    Io,
    /// Bugs.
    Internal,
}

impl ErrorCategory {
    pub fn exit_code(self) -> ExitCode {
        match self {
            ErrorCategory::Args => ExitCode::ArgsError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Data => ExitCode::DataError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Internal => ExitCode::InternalError,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Args => write!(f, "args"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Unified error type for abc-diag.
#[derive(Error, Debug)]
pub enum Error {
    #[error("prior configuration error: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Band(#[from] BandError),

    #[error("projection failed: {0}")]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(e) => validation_category(e),
            Error::Sampler(SamplerError::Config(e)) => validation_category(e),
            Error::Sampler(SamplerError::NoDraws) => ErrorCategory::Args,
            Error::Sampler(SamplerError::Distribution { .. }) => ErrorCategory::Config,
            Error::Load(LoadError::Io { .. }) => ErrorCategory::Io,
            Error::Load(LoadError::Parse(_)) => ErrorCategory::Data,
            Error::Aggregation(_) | Error::Projection(_) => ErrorCategory::Data,
            Error::Band(_) | Error::InvalidArgument(_) => ErrorCategory::Args,
            Error::Table(e) => table_category(e),
            Error::Forecast(ForecastError::Table(e)) => table_category(e),
            Error::Forecast(_) => ErrorCategory::Data,
            Error::Io(_) => ErrorCategory::Io,
            Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.category().exit_code()
    }

    /// Structured form for machine consumers.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.exit_code().as_i32(),
            "code_name": self.exit_code().code_name(),
            "category": self.category(),
            "message": self.to_string(),
        })
    }
}

fn validation_category(e: &ValidationError) -> ErrorCategory {
    match e {
        ValidationError::IoError(_) => ErrorCategory::Io,
        _ => ErrorCategory::Config,
    }
}

fn table_category(e: &TableError) -> ErrorCategory {
    match e {
        TableError::Io { .. } => ErrorCategory::Io,
        TableError::Csv(_) | TableError::MissingColumn(_) => ErrorCategory::Data,
    }
}
