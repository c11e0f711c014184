//! Forecast versus observed census comparison.
//!
//! Forecast summaries come as three tables sharing a path template:
//! `<template>_mean.csv`, `<template>_percentile=002.50.csv` and
//! `<template>_percentile=097.50.csv`. Each is projected to the requested
//! census columns and lined up against the observed daily counts.

use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::census::{DerivedCountProjector, DerivedCountTable, TERMINAL, TERMINAL_SMOOTHED};
use crate::table::{Table, TableError};

pub const MEAN_SUFFIX: &str = "_mean.csv";
pub const LOWER_SUFFIX: &str = "_percentile=002.50.csv";
pub const UPPER_SUFFIX: &str = "_percentile=097.50.csv";

/// Column holding the day index in observed tables.
pub const TIMESTEP_COLUMN: &str = "timestep";

/// Columns compared when none are requested.
pub const DEFAULT_COLUMNS: [&str; 7] = [
    "n_discharged_InGeneralWard",
    "n_InGeneralWard",
    "n_OffVentInICU",
    "n_OnVentInICU",
    "n_InICU",
    "n_occupied_beds",
    "n_TERMINAL",
];

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Projection(#[from] crate::census::ProjectionError),

    #[error("{table} has {found} rows but the observed table has {expected}")]
    LengthMismatch {
        table: String,
        expected: usize,
        found: usize,
    },
}

/// Plot title for a census column.
pub fn column_title(column: &str) -> Option<&'static str> {
    Some(match column {
        "n_discharged_InGeneralWard" => "Number of Discharged Patients",
        "n_occupied_beds" => "Number of Occupied Beds",
        "n_InGeneralWard" => "Number of Patients in General Ward",
        "n_OffVentInICU" => "Number of Patients in ICU, not on the Ventilator",
        "n_OnVentInICU" => "Number of Patients on the Ventilator in the ICU",
        "n_InICU" => "Number of Patients in ICU",
        "n_TERMINAL" => "Number of Terminal Patients",
        _ => return None,
    })
}

fn with_suffix(template: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(template.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Mean and percentile forecast tables.
#[derive(Debug, Clone)]
pub struct ForecastSummaries {
    pub mean: Table,
    pub lower: Table,
    pub upper: Table,
}

impl ForecastSummaries {
    /// Load the three summary tables for a path template.
    pub fn load(template: &Path) -> Result<Self, TableError> {
        Ok(Self {
            mean: Table::from_path(&with_suffix(template, MEAN_SUFFIX))?,
            lower: Table::from_path(&with_suffix(template, LOWER_SUFFIX))?,
            upper: Table::from_path(&with_suffix(template, UPPER_SUFFIX))?,
        })
    }
}

/// Observed and forecast series of one census column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastComparison {
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static str>,
    pub timesteps: Vec<f64>,
    /// Observed series (smoothed for terminal counts when available).
    pub observed: Vec<f64>,
    /// Raw terminal counts after the training cutoff, when the smoothed
    /// series is shown as `observed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_raw: Option<Vec<f64>>,
    pub forecast_mean: Vec<f64>,
    pub forecast_lower: Vec<f64>,
    pub forecast_upper: Vec<f64>,
    pub num_training_timesteps: usize,
    /// Fraction of finite post-cutoff observations inside the forecast band.
    pub coverage: Option<f64>,
}

/// Compare forecasts against observed counts, one entry per column.
pub fn compare_forecasts(
    observed: &Table,
    summaries: &ForecastSummaries,
    num_training_timesteps: usize,
    columns: &[String],
    smooth_terminal: bool,
) -> Result<Vec<ForecastComparison>, ForecastError> {
    let timesteps = observed.require(TIMESTEP_COLUMN)?.to_vec();
    let n = timesteps.len();

    let projector = DerivedCountProjector::new(columns.iter().cloned(), smooth_terminal);
    let truth = projector.project_table(observed)?;
    if truth.raw_terminal_fallback {
        // Forecast tables never carry the smoothed series.
        tracing::warn!(
            column = TERMINAL_SMOOTHED,
            "smoothed terminal counts not present; using raw {}",
            TERMINAL
        );
    }
    let mean = project_aligned(&projector, &summaries.mean, MEAN_SUFFIX, n)?;
    let lower = project_aligned(&projector, &summaries.lower, LOWER_SUFFIX, n)?;
    let upper = project_aligned(&projector, &summaries.upper, UPPER_SUFFIX, n)?;

    let cutoff = num_training_timesteps.min(n);
    let mut out = Vec::new();
    for column in projector.expected_columns() {
        let (Some(obs), Some(m), Some(lo), Some(hi)) = (
            truth.columns.get(column),
            mean.columns.get(column),
            lower.columns.get(column),
            upper.columns.get(column),
        ) else {
            continue;
        };

        let observed_raw = if column == TERMINAL && truth.smoothed_terminal {
            observed.column(TERMINAL).map(|raw| raw[cutoff..].to_vec())
        } else {
            None
        };

        let coverage = band_coverage(&obs[cutoff..], &lo[cutoff..], &hi[cutoff..]);
        tracing::debug!(column = %column, coverage = ?coverage, "compared forecast column");

        out.push(ForecastComparison {
            column: column.clone(),
            title: column_title(column),
            timesteps: timesteps.clone(),
            observed: obs.clone(),
            observed_raw,
            forecast_mean: m.clone(),
            forecast_lower: lo.clone(),
            forecast_upper: hi.clone(),
            num_training_timesteps,
            coverage,
        });
    }

    tracing::info!(columns = out.len(), timesteps = n, "forecast comparison complete");
    Ok(out)
}

fn project_aligned(
    projector: &DerivedCountProjector,
    table: &Table,
    name: &str,
    expected: usize,
) -> Result<DerivedCountTable, ForecastError> {
    if table.len() != expected {
        return Err(ForecastError::LengthMismatch {
            table: name.trim_start_matches('_').to_string(),
            expected,
            found: table.len(),
        });
    }
    Ok(projector.project_table(table)?)
}

/// Fraction of finite observations within `[lower, upper]`; None if there are none.
pub fn band_coverage(observed: &[f64], lower: &[f64], upper: &[f64]) -> Option<f64> {
    let mut inside = 0usize;
    let mut total = 0usize;
    for ((&y, &lo), &hi) in observed.iter().zip(lower).zip(upper) {
        if !y.is_finite() {
            continue;
        }
        total += 1;
        if lo <= y && y <= hi {
            inside += 1;
        }
    }
    (total > 0).then(|| inside as f64 / total as f64)
}
