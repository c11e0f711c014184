//! Named numeric columns read from CSV.
//!
//! Census tables, forecast summaries and calibration statistics all share
//! this shape. Cells that do not parse as numbers (dates, blanks) read as NaN.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column {0}")]
    MissingColumn(String),
}

pub type TableResult<T> = std::result::Result<T, TableError>;

/// Column-major numeric table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    columns: BTreeMap<String, Vec<f64>>,
    rows: usize,
}

impl Table {
    pub fn from_path(path: &Path) -> TableResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "loaded table"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> TableResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut cells: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        let mut rows = 0;
        for record in rdr.records() {
            let record = record?;
            for (col, field) in cells.iter_mut().zip(record.iter()) {
                col.push(parse_cell(field));
            }
            rows += 1;
        }

        let mut columns = BTreeMap::new();
        for (name, values) in headers.iter().zip(cells) {
            // First occurrence wins on duplicate headers.
            columns.entry(name.clone()).or_insert(values);
        }
        Ok(Self {
            headers,
            columns,
            rows,
        })
    }

    /// Build from named columns; all columns must have equal length.
    pub fn from_columns<I, S>(columns: I) -> Option<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = Table::default();
        for (name, values) in columns {
            let name = name.into();
            if table.headers.is_empty() {
                table.rows = values.len();
            } else if values.len() != table.rows {
                return None;
            }
            table.headers.push(name.clone());
            table.columns.insert(name, values);
        }
        Some(table)
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> TableResult<&[f64]> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row `i` as a column-name map.
    pub fn row(&self, i: usize) -> Option<BTreeMap<String, f64>> {
        if i >= self.rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(name, values)| (name.clone(), values[i]))
                .collect(),
        )
    }
}

fn parse_cell(field: &str) -> f64 {
    field.parse::<f64>().unwrap_or(f64::NAN)
}
