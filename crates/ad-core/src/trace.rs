//! Calibration statistic traces.

use serde::Serialize;

use crate::table::{Table, TableResult};

/// One statistic over calibration iterations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatTrace {
    pub stat: String,
    /// Row index of each kept value in the statistics table.
    pub iterations: Vec<usize>,
    pub values: Vec<f64>,
}

/// Extract column `stat` from a calibration statistics table.
///
/// With `last_n_not_nan = Some(n)` for `n > 0`, NaN rows are dropped and only
/// the last `n` remaining values are kept. `Some(0)` behaves like `None`.
pub fn stat_trace(table: &Table, stat: &str, last_n_not_nan: Option<usize>) -> TableResult<StatTrace> {
    let column = table.require(stat)?;
    let mut points: Vec<(usize, f64)> = column.iter().copied().enumerate().collect();

    if let Some(n) = last_n_not_nan.filter(|&n| n > 0) {
        points.retain(|(_, v)| !v.is_nan());
        let skip = points.len().saturating_sub(n);
        points.drain(..skip);
    }

    let (iterations, values) = points.into_iter().unzip();
    Ok(StatTrace {
        stat: stat.to_string(),
        iterations,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableError;

    fn stats() -> Table {
        Table::from_reader(
            "\
,epsilon,accept_rate
0,,0.9
1,5.0,0.5
2,4.0,
3,3.5,0.2
4,,0.1
"
            .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn full_trace_keeps_nan() {
        let t = stat_trace(&stats(), "epsilon", None).unwrap();
        assert_eq!(t.values.len(), 5);
        assert!(t.values[0].is_nan());
        assert_eq!(t.iterations, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn last_n_drops_nan_then_truncates() {
        let t = stat_trace(&stats(), "epsilon", Some(2)).unwrap();
        assert_eq!(t.values, vec![4.0, 3.5]);
        assert_eq!(t.iterations, vec![2, 3]);

        let t = stat_trace(&stats(), "epsilon", Some(10)).unwrap();
        assert_eq!(t.values, vec![5.0, 4.0, 3.5]);
    }

    #[test]
    fn zero_means_no_filtering() {
        let t = stat_trace(&stats(), "accept_rate", Some(0)).unwrap();
        assert_eq!(t.values.len(), 5);
    }

    #[test]
    fn unknown_stat_is_named() {
        assert!(matches!(
            stat_trace(&stats(), "loss", None),
            Err(TableError::MissingColumn(ref c)) if c == "loss"
        ));
    }
}
