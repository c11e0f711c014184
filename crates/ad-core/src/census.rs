//! Derived census columns.
//!
//! Composite counts are pure functions of the raw per-compartment columns:
//!
//! - `n_occupied_beds = n_InGeneralWard + n_OffVentInICU + n_OnVentInICU`
//! - `n_InICU = n_OffVentInICU + n_OnVentInICU`
//! - `n_TERMINAL` reads the 5-day smoothed series when asked to and present,
//!   the raw series otherwise

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::table::Table;

pub const OCCUPIED_BEDS: &str = "n_occupied_beds";
pub const IN_ICU: &str = "n_InICU";
pub const TERMINAL: &str = "n_TERMINAL";
pub const TERMINAL_SMOOTHED: &str = "n_TERMINAL_5daysSmoothed";

const GENERAL_WARD: &str = "n_InGeneralWard";
const OFF_VENT: &str = "n_OffVentInICU";
const ON_VENT: &str = "n_OnVentInICU";

/// Index columns that are never projected.
const INDEX_COLUMNS: [&str; 2] = ["timestep", "date"];

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("missing column {column} required for {requested}")]
    MissingColumn { column: String, requested: String },
}

/// Requested columns of one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedCountRow {
    pub values: BTreeMap<String, f64>,
    /// Whether `n_TERMINAL` came from the smoothed series.
    pub smoothed_terminal: bool,
}

impl DerivedCountRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Requested columns of a whole table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedCountTable {
    pub columns: BTreeMap<String, Vec<f64>>,
    pub smoothed_terminal: bool,
    /// Smoothed terminal counts were requested but raw counts were used.
    pub raw_terminal_fallback: bool,
}

/// Computes requested census columns from raw rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedCountProjector {
    expected_columns: Vec<String>,
    smooth_terminal: bool,
}

impl DerivedCountProjector {
    pub fn new<I, S>(expected_columns: I, smooth_terminal: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected_columns: expected_columns.into_iter().map(Into::into).collect(),
            smooth_terminal,
        }
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.expected_columns
    }

    /// Project one row given as column name → value.
    pub fn project(&self, row: &BTreeMap<String, f64>) -> Result<DerivedCountRow, ProjectionError> {
        let mut values = BTreeMap::new();
        let mut smoothed_terminal = false;

        for column in &self.expected_columns {
            if INDEX_COLUMNS.contains(&column.as_str()) {
                continue;
            }
            let get = |raw: &str| {
                row.get(raw).copied().ok_or_else(|| ProjectionError::MissingColumn {
                    column: raw.to_string(),
                    requested: column.clone(),
                })
            };
            let value = match column.as_str() {
                OCCUPIED_BEDS => get(GENERAL_WARD)? + get(OFF_VENT)? + get(ON_VENT)?,
                IN_ICU => get(OFF_VENT)? + get(ON_VENT)?,
                TERMINAL if self.smooth_terminal => match row.get(TERMINAL_SMOOTHED) {
                    Some(v) => {
                        smoothed_terminal = true;
                        *v
                    }
                    None => get(TERMINAL)?,
                },
                other => get(other)?,
            };
            values.insert(column.clone(), value);
        }

        Ok(DerivedCountRow {
            values,
            smoothed_terminal,
        })
    }

    /// Project every row of `table`.
    pub fn project_table(&self, table: &Table) -> Result<DerivedCountTable, ProjectionError> {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut smoothed_terminal = false;

        if table.is_empty() {
            // Still validate the header so a missing column is caught.
            let header: BTreeMap<String, f64> = table
                .headers()
                .iter()
                .map(|h| (h.clone(), f64::NAN))
                .collect();
            let row = self.project(&header)?;
            for column in row.values.into_keys() {
                columns.insert(column, Vec::new());
            }
            smoothed_terminal = row.smoothed_terminal;
        }

        for i in 0..table.len() {
            let Some(raw) = table.row(i) else { break };
            let row = self.project(&raw)?;
            smoothed_terminal |= row.smoothed_terminal;
            for (column, value) in row.values {
                columns.entry(column).or_default().push(value);
            }
        }

        let wants_terminal = self.expected_columns.iter().any(|c| c == TERMINAL);
        Ok(DerivedCountTable {
            columns,
            smoothed_terminal,
            raw_terminal_fallback: self.smooth_terminal && wants_terminal && !smoothed_terminal,
        })
    }
}
